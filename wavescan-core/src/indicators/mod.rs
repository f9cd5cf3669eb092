//! Indicator implementations.
//!
//! Indicators are pure functions: bar history in, numeric series out. Output
//! has the same length as the input and the first `lookback()` values are
//! `f64::NAN` (warm-up). `OscillatorSeries::from_raw` turns those NaN slots
//! into absent values at the series boundary.
//!
//! # Look-ahead contamination guard
//! No indicator value at bar t may depend on price data from bar t+1 or later.
//! Every indicator must pass the truncated-vs-full series test.

pub mod awesome;
pub mod ema;
pub mod macd;
pub mod sma;

pub use awesome::AwesomeOscillator;
pub use ema::{ema_of_series, Ema};
pub use macd::{MacdHistogram, MacdLine, MacdSignal};
pub use sma::{sma_of_series, Sma};

use crate::domain::Bar;

/// Which price of a bar an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSource {
    #[default]
    Close,
    /// `(high + low) / 2`
    Median,
}

impl PriceSource {
    pub fn values(self, bars: &[Bar]) -> Vec<f64> {
        match self {
            PriceSource::Close => bars.iter().map(|b| b.close).collect(),
            PriceSource::Median => bars.iter().map(Bar::median_price).collect(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            PriceSource::Close => "",
            PriceSource::Median => "median_",
        }
    }
}

/// A causal series computed from bar history.
pub trait Indicator: Send + Sync {
    /// Stable identifier such as `ao_5_34`.
    fn name(&self) -> &str;

    /// Leading outputs that are NaN because the window is still filling.
    fn lookback(&self) -> usize;

    /// One output per bar, NaN during warm-up.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Daily test bars from a close sequence. Each bar opens at the previous
/// close and its range extends one point beyond the body on both sides.
#[cfg(test)]
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let first = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut prev = closes.first().copied().unwrap_or_default();
    first
        .iter_days()
        .zip(closes)
        .map(|(date, &close)| {
            let open = std::mem::replace(&mut prev, close);
            Bar {
                date,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

#[cfg(test)]
pub const EPS: f64 = 1e-10;

#[cfg(test)]
pub fn assert_close(actual: f64, expected: f64, eps: f64) {
    let diff = (actual - expected).abs();
    assert!(diff < eps, "{actual} != {expected} (diff {diff})");
}
