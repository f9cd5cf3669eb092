//! Simple moving average.
//!
//! Each output is the plain sum of its `period` inputs divided by `period`,
//! summed oldest first. There is no running sum, so a value never depends on
//! how much history precedes its window.

use super::{Indicator, PriceSource};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: PriceSource,
    name: String,
}

impl Sma {
    /// SMA of closes.
    pub fn new(period: usize) -> Self {
        Self::of(PriceSource::Close, period)
    }

    pub fn of(source: PriceSource, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source,
            name: format!("sma_{}{period}", source.label()),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        sma_of_series(&self.source.values(bars), self.period)
    }
}

/// Trailing mean over `period` values; NaN wherever the window is incomplete
/// or contains a NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for (window, slot) in values.windows(period).zip(&mut out[period - 1..]) {
        *slot = window.iter().sum::<f64>() / period as f64;
    }
    out
}
