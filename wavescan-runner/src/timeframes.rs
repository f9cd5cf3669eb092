//! Per-timeframe light, wave state and verdict for the latest bar.
//!
//! Monthly and weekly series are resampled from daily bars. H4 has no daily
//! derivation; its reading is supplied by the caller when available.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wavescan_core::domain::{resample, BarSeries, Timeframe, TimeframeState};
use wavescan_core::signals::{
    classify_bar_at, classify_wave, TimeframeReading, TrafficLight, WaveAssessment,
};
use wavescan_core::{EngineConfig, EngineError, OscillatorCache, Oscillators};

/// Classification of the last bar of one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeReport {
    pub timeframe: Timeframe,
    pub date: NaiveDate,
    pub light: TrafficLight,
    pub wave: WaveAssessment,
    pub state: TimeframeState,
    /// False when the (wave, light) cell fell back to WAIT.
    pub configured: bool,
}

impl TimeframeReport {
    pub fn reading(&self) -> TimeframeReading {
        TimeframeReading::new(self.light, self.state)
    }
}

/// Classify the last bar of `bars` given its oscillators.
pub fn timeframe_report(
    bars: &BarSeries,
    oscillators: &Oscillators,
    timeframe: Timeframe,
    config: &EngineConfig,
) -> Result<TimeframeReport, EngineError> {
    let Some(date) = bars.last().map(|b| b.date) else {
        return Err(EngineError::InsufficientHistory {
            needed: config.oscillators.warmup_bars() + 1,
            available: 0,
        });
    };
    let today = bars.len() - 1;
    oscillators.ensure_aligned_with(bars)?;
    let light = classify_bar_at(oscillators, today)?;
    let wave = classify_wave(bars, oscillators, today, &config.wave)?;
    let table = config.state_table();
    let state = table.resolve(wave.state, light);
    let configured = table.is_configured(wave.state, light);
    if !configured {
        debug!(%timeframe, wave = %wave.state, %light, "unconfigured verdict cell, using WAIT");
    }
    Ok(TimeframeReport {
        timeframe,
        date,
        light,
        wave,
        state,
        configured,
    })
}

/// Reports for the daily series and the weekly and monthly series resampled
/// from it. A timeframe that cannot be classified (typically too little
/// monthly history) maps to its error instead.
pub fn daily_derived_reports(
    daily: &BarSeries,
    config: &EngineConfig,
    cache: &mut OscillatorCache,
) -> BTreeMap<Timeframe, Result<TimeframeReport, EngineError>> {
    [Timeframe::Monthly, Timeframe::Weekly, Timeframe::Daily]
        .into_iter()
        .map(|timeframe| {
            let report = resample(daily, timeframe).and_then(|bars| {
                let oscillators = cache.get_or_compute(&bars, &config.oscillators)?;
                timeframe_report(&bars, &oscillators, timeframe, config)
            });
            (timeframe, report)
        })
        .collect()
}
