//! WaveScan Runner: everything around the signal engine that touches data.
//!
//! This crate builds on `wavescan-core` to provide:
//! - CSV bar loading with a synthetic fallback for development
//! - Configuration file loading with unknown-key warnings
//! - Backtest replay, live scan and a replay/live parity check
//! - Per-timeframe reports on daily-derived series
//! - Parallel multi-ticker scanning with per-symbol error isolation

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod scan;
pub mod timeframes;

pub use backtest::{
    check_parity, ensure_fresh, live_scan, live_scan_as_of, live_scan_cached, replay,
    MarketSource, ParityReport, ReplayReport, RunError,
};
pub use config::{config_fingerprint, load_config, ConfigError};
pub use data_loader::{
    generate_synthetic_bars, load_csv, load_value_csv, read_bars, BarSource, CsvDirectory,
    DataSource, LoadError, LoadedSeries, SyntheticRange,
};
pub use scan::{
    scan_symbol, scan_symbol_cached, scan_universe, ScanOptions, ScanOutcome, Staleness,
};
pub use timeframes::{daily_derived_reports, timeframe_report, TimeframeReport};
