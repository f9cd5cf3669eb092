//! Oscillator cache.
//!
//! Owned by the caller and passed explicitly. Entries are keyed by the bar
//! data's content hash, its length and the oscillator periods, so a cached
//! set is only reused for byte-identical input under the same configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::domain::{BarSeries, DatasetHash};
use crate::error::EngineError;
use crate::oscillators::{compute_oscillators, OscillatorConfig, Oscillators};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dataset: DatasetHash,
    len: usize,
    config: OscillatorConfig,
}

#[derive(Debug, Default)]
pub struct OscillatorCache {
    entries: HashMap<CacheKey, Arc<Oscillators>>,
    hits: u64,
    misses: u64,
}

impl OscillatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached oscillators for `bars`, computing and storing them on a miss.
    /// Errors are not cached.
    pub fn get_or_compute(
        &mut self,
        bars: &BarSeries,
        config: &OscillatorConfig,
    ) -> Result<Arc<Oscillators>, EngineError> {
        let key = CacheKey {
            dataset: bars.dataset_hash(),
            len: bars.len(),
            config: *config,
        };
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            trace!(symbol = %bars.symbol(), dataset = %key.dataset, "oscillator cache hit");
            return Ok(Arc::clone(hit));
        }

        self.misses += 1;
        let computed = Arc::new(compute_oscillators(bars, config)?);
        self.entries.insert(key, Arc::clone(&computed));
        Ok(computed)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
