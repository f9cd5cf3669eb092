//! Awesome Oscillator (AO).
//!
//! AO[t] = SMA(median, fast)[t] - SMA(median, slow)[t], median = (high + low) / 2.
//! Zero-centered: positive is a bullish momentum regime, negative bearish.
//! Lookback: slow - 1.

use super::sma::sma_of_series;
use super::{Indicator, PriceSource};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct AwesomeOscillator {
    fast: usize,
    slow: usize,
    name: String,
}

impl AwesomeOscillator {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1, "AO fast period must be >= 1");
        assert!(slow > fast, "AO slow period must be > fast period");
        Self {
            fast,
            slow,
            name: format!("ao_{fast}_{slow}"),
        }
    }
}

impl Default for AwesomeOscillator {
    fn default() -> Self {
        Self::new(5, 34)
    }
}

impl Indicator for AwesomeOscillator {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let median = PriceSource::Median.values(bars);
        let fast = sma_of_series(&median, self.fast);
        let slow = sma_of_series(&median, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}
