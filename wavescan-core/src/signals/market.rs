//! Market filter: gates entries on the benchmark's trend regime and the
//! volatility index level.
//!
//! Passes when the benchmark closes strictly above its trend average and the
//! volatility reading is strictly below the ceiling. NaN inputs fail both
//! comparisons.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::BarSeries;
use crate::error::EngineError;
use crate::indicators::sma_of_series;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketFilterConfig {
    pub volatility_ceiling: f64,
    /// SMA period of the benchmark trend level.
    pub trend_period: usize,
}

impl Default for MarketFilterConfig {
    fn default() -> Self {
        Self {
            volatility_ceiling: 30.0,
            trend_period: 200,
        }
    }
}

impl MarketFilterConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.volatility_ceiling.is_finite() && self.volatility_ceiling > 0.0) {
            return Err(EngineError::InvalidConfiguration(format!(
                "market_filter.volatility_ceiling must be positive, got {}",
                self.volatility_ceiling
            )));
        }
        if self.trend_period == 0 {
            return Err(EngineError::InvalidConfiguration(
                "market_filter.trend_period must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Market inputs for one evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub benchmark_close: f64,
    pub benchmark_trend: f64,
    pub volatility: f64,
}

impl MarketSnapshot {
    pub fn new(benchmark_close: f64, benchmark_trend: f64, volatility: f64) -> Self {
        Self {
            benchmark_close,
            benchmark_trend,
            volatility,
        }
    }

    /// Snapshot on bar `index` of a benchmark series, with the trend level
    /// taken as the SMA of the `trend_period` closes ending at `index`.
    pub fn from_benchmark(
        benchmark: &BarSeries,
        index: usize,
        volatility: f64,
        trend_period: usize,
    ) -> Result<Self, EngineError> {
        if trend_period == 0 {
            return Err(EngineError::InvalidConfiguration(
                "market_filter.trend_period must be positive".into(),
            ));
        }
        let Some(bar) = benchmark.get(index) else {
            return Err(EngineError::insufficient(index + 1, benchmark.len()));
        };
        if index + 1 < trend_period {
            return Err(EngineError::insufficient(trend_period, index + 1));
        }
        let benchmark_trend = benchmark.bars()[index + 1 - trend_period..=index]
            .iter()
            .map(|b| b.close)
            .sum::<f64>()
            / trend_period as f64;
        Ok(Self::new(bar.close, benchmark_trend, volatility))
    }
}

/// Snapshots for every benchmark date that has both a trend value and a
/// volatility reading.
pub fn snapshots_from_benchmark(
    benchmark: &BarSeries,
    volatility: &BTreeMap<NaiveDate, f64>,
    trend_period: usize,
) -> Result<BTreeMap<NaiveDate, MarketSnapshot>, EngineError> {
    if trend_period == 0 {
        return Err(EngineError::InvalidConfiguration(
            "market_filter.trend_period must be positive".into(),
        ));
    }
    let trend = sma_of_series(&benchmark.closes(), trend_period);
    let snapshots = benchmark
        .bars()
        .iter()
        .zip(trend)
        .filter(|(_, t)| !t.is_nan())
        .filter_map(|(bar, t)| {
            volatility
                .get(&bar.date)
                .map(|v| (bar.date, MarketSnapshot::new(bar.close, t, *v)))
        })
        .collect();
    Ok(snapshots)
}

/// Outcome of the market filter with both sub-conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketGate {
    pub passed: bool,
    pub above_trend: bool,
    pub below_ceiling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketFilter {
    config: MarketFilterConfig,
}

impl MarketFilter {
    pub fn new(config: MarketFilterConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MarketFilterConfig {
        &self.config
    }

    pub fn evaluate(&self, snapshot: &MarketSnapshot) -> MarketGate {
        let above_trend = snapshot.benchmark_close > snapshot.benchmark_trend;
        let below_ceiling = snapshot.volatility < self.config.volatility_ceiling;
        MarketGate {
            passed: above_trend && below_ceiling,
            above_trend,
            below_ceiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_close, bars_from_closes, EPS};

    #[test]
    fn passes_above_trend_and_below_ceiling() {
        let gate = MarketFilter::default().evaluate(&MarketSnapshot::new(450.0, 420.0, 18.0));
        assert!(gate.passed);
        assert!(gate.above_trend);
        assert!(gate.below_ceiling);
    }

    #[test]
    fn boundaries_are_strict() {
        let filter = MarketFilter::default();
        let at_trend = filter.evaluate(&MarketSnapshot::new(420.0, 420.0, 18.0));
        assert!(!at_trend.above_trend);
        assert!(!at_trend.passed);

        let at_ceiling = filter.evaluate(&MarketSnapshot::new(450.0, 420.0, 30.0));
        assert!(!at_ceiling.below_ceiling);
        assert!(!at_ceiling.passed);
    }

    #[test]
    fn nan_inputs_fail() {
        let gate = MarketFilter::default().evaluate(&MarketSnapshot::new(f64::NAN, 420.0, f64::NAN));
        assert!(!gate.above_trend);
        assert!(!gate.below_ceiling);
    }

    #[test]
    fn custom_ceiling() {
        let filter = MarketFilter::new(MarketFilterConfig {
            volatility_ceiling: 20.0,
            ..MarketFilterConfig::default()
        })
        .unwrap();
        assert!(!filter.evaluate(&MarketSnapshot::new(450.0, 420.0, 25.0)).passed);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = MarketFilterConfig {
            volatility_ceiling: 0.0,
            ..MarketFilterConfig::default()
        };
        assert!(MarketFilter::new(bad).is_err());
        let bad = MarketFilterConfig {
            trend_period: 0,
            ..MarketFilterConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn snapshot_from_benchmark_uses_trailing_sma() {
        let bars = BarSeries::new("SPY", bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0])).unwrap();
        let snap = MarketSnapshot::from_benchmark(&bars, 4, 15.0, 3).unwrap();
        assert_close(snap.benchmark_close, 14.0, EPS);
        assert_close(snap.benchmark_trend, 13.0, EPS);
        assert_close(snap.volatility, 15.0, EPS);

        assert!(matches!(
            MarketSnapshot::from_benchmark(&bars, 1, 15.0, 3),
            Err(EngineError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn snapshot_series_matches_pointwise() {
        let bars = BarSeries::new("SPY", bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0])).unwrap();
        let volatility: BTreeMap<NaiveDate, f64> = bars
            .dates()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != 3)
            .map(|(i, d)| (d, 15.0 + i as f64))
            .collect();
        let series = snapshots_from_benchmark(&bars, &volatility, 3).unwrap();
        // index 0-1 lack trend, index 3 lacks volatility
        assert_eq!(series.len(), 2);
        let expected = MarketSnapshot::from_benchmark(&bars, 4, 19.0, 3).unwrap();
        let got = series[&bars.date_at(4).unwrap()];
        assert_close(got.benchmark_trend, expected.benchmark_trend, EPS);
        assert_close(got.volatility, 19.0, EPS);
    }
}
