//! AO and MACD (+ signal line) over a whole bar series.
//!
//! All oscillator series share the input's date index and are computed in one
//! pass. Warm-up slots are absent. The same `OscillatorConfig` must drive the
//! backtest replay and the live scan; nothing here depends on which one calls.

use serde::{Deserialize, Serialize};

use crate::domain::{BarSeries, OscillatorSeries, SignalLineSeries};
use crate::error::EngineError;
use crate::indicators::macd::macd_of_series;
use crate::indicators::{AwesomeOscillator, Indicator};

/// Oscillator periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorConfig {
    pub ao_fast: usize,
    pub ao_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            ao_fast: 5,
            ao_slow: 34,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl OscillatorConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("ao_fast", self.ao_fast),
            ("ao_slow", self.ao_slow),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "oscillators.{name} must be positive"
                )));
            }
        }
        if self.ao_fast >= self.ao_slow {
            return Err(EngineError::InvalidConfiguration(format!(
                "oscillators.ao_fast ({}) must be < ao_slow ({})",
                self.ao_fast, self.ao_slow
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(EngineError::InvalidConfiguration(format!(
                "oscillators.macd_fast ({}) must be < macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }

    /// Index of the first AO value.
    pub fn ao_lookback(&self) -> usize {
        self.ao_slow - 1
    }

    /// Index of the first MACD signal value.
    pub fn signal_lookback(&self) -> usize {
        self.macd_slow + self.macd_signal - 2
    }

    /// Bars needed before AO, MACD and signal all have a value on the last bar.
    pub fn warmup_bars(&self) -> usize {
        self.ao_lookback().max(self.signal_lookback()) + 1
    }
}

/// AO, MACD line, MACD signal line and histogram for one bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillators {
    pub ao: OscillatorSeries,
    pub macd: OscillatorSeries,
    pub macd_signal: SignalLineSeries,
    pub macd_histogram: OscillatorSeries,
}

impl Oscillators {
    pub fn len(&self) -> usize {
        self.ao.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ao.is_empty()
    }

    /// Validate that every series shares `bars`' date index.
    pub fn ensure_aligned_with(&self, bars: &BarSeries) -> Result<(), EngineError> {
        self.ao.ensure_aligned_with(bars)?;
        self.macd.ensure_aligned(&self.ao)?;
        self.macd_signal.ensure_aligned(&self.ao)?;
        self.macd_histogram.ensure_aligned(&self.ao)
    }
}

/// Compute all oscillators for `bars`.
///
/// Fails with `InsufficientHistory` when the series cannot produce a single
/// bar where every oscillator has a value.
pub fn compute_oscillators(
    bars: &BarSeries,
    config: &OscillatorConfig,
) -> Result<Oscillators, EngineError> {
    config.validate()?;
    let needed = config.warmup_bars();
    if bars.len() < needed {
        return Err(EngineError::insufficient(needed, bars.len()));
    }

    let dates = bars.dates();
    let ao_indicator = AwesomeOscillator::new(config.ao_fast, config.ao_slow);
    let ao = ao_indicator.compute(bars.bars());
    let macd = macd_of_series(
        &bars.closes(),
        config.macd_fast,
        config.macd_slow,
        config.macd_signal,
    );

    Ok(Oscillators {
        ao: OscillatorSeries::from_raw(ao_indicator.name(), dates.clone(), ao),
        macd: OscillatorSeries::from_raw("macd", dates.clone(), macd.line),
        macd_signal: OscillatorSeries::from_raw("macd_signal", dates.clone(), macd.signal),
        macd_histogram: OscillatorSeries::from_raw("macd_histogram", dates, macd.histogram),
    })
}
