//! Loading engine configuration files for the runner and CLI.
//!
//! The file format is the TOML layout of [`EngineConfig`]. Missing keys take
//! their defaults; unknown keys are logged and ignored so that a file written
//! for a newer build still loads.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use wavescan_core::{EngineConfig, EngineError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config '{path}': {source}")]
    Engine { path: PathBuf, source: EngineError },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read and validate a configuration file. `None` yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let Some(path) = path else {
        debug!("no config file given, using defaults");
        return Ok(EngineConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (config, unknown) =
        EngineConfig::from_toml_lenient(&content).map_err(|source| ConfigError::Engine {
            path: path.to_path_buf(),
            source,
        })?;
    for key in &unknown {
        warn!(path = %path.display(), key = %key, "ignoring unknown config key");
    }
    Ok(config)
}

/// Short identifier for a configuration: the first 16 hex chars of the
/// BLAKE3 hash of its canonical JSON form.
pub fn config_fingerprint(config: &EngineConfig) -> Result<String, ConfigError> {
    let json = serde_json::to_string(config)?;
    let hash = blake3::hash(json.as_bytes());
    Ok(hash.to_hex()[..16].to_string())
}
