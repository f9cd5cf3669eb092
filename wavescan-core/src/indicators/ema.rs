//! Exponential moving average, `alpha = 2 / (period + 1)`.
//!
//! The first value is the mean of the first `period` valid inputs; every
//! later value is `alpha * x + (1 - alpha) * previous`.

use super::{Indicator, PriceSource};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    source: PriceSource,
    name: String,
}

impl Ema {
    /// EMA of closes.
    pub fn new(period: usize) -> Self {
        Self::of(PriceSource::Close, period)
    }

    pub fn of(source: PriceSource, period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            source,
            name: format!("ema_{}{period}", source.label()),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        ema_of_series(&self.source.values(bars), self.period)
    }
}

/// EMA of any series.
///
/// Leading NaNs (an upstream warm-up, e.g. the MACD line feeding its signal
/// line) are skipped before seeding. A NaN inside the seed window leaves the
/// whole output NaN; a NaN after the seed ends the series there.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    if period == 0 || values.len() < first + period {
        return out;
    }

    let seed_at = first + period - 1;
    let seed = values[first..=seed_at].iter().sum::<f64>() / period as f64;
    if seed.is_nan() {
        return out;
    }
    out[seed_at] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for (x, slot) in values[seed_at + 1..].iter().zip(&mut out[seed_at + 1..]) {
        if x.is_nan() {
            break;
        }
        prev = alpha * x + (1.0 - alpha) * prev;
        *slot = prev;
    }
    out
}
