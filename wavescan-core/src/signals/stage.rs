//! Weinstein stage of a weekly series against its 30-week SMA.
//!
//! The SMA is rising when its value today is strictly above its value
//! `rising_lookback` bars earlier. A close below a flat or falling SMA is
//! stage 4 (declining); any close above the SMA is stage 2 (advancing); what
//! remains, a close at or below a rising SMA, is stage 1 (basing).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::BarSeries;
use crate::error::EngineError;
use crate::indicators::sma_of_series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// SMA period in weekly bars.
    pub sma_period: usize,
    /// Bars back the SMA is compared with to decide whether it is rising.
    pub rising_lookback: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            sma_period: 30,
            rising_lookback: 4,
        }
    }
}

impl StageConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sma_period == 0 || self.rising_lookback == 0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "stage.sma_period and stage.rising_lookback must be positive, got {} and {}",
                self.sma_period, self.rising_lookback
            )));
        }
        Ok(())
    }

    /// Bars needed before the last bar can be staged.
    pub fn min_bars(&self) -> usize {
        self.sma_period + self.rising_lookback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeinsteinStage {
    Basing,
    Advancing,
    Declining,
}

impl WeinsteinStage {
    pub fn classify(close: f64, sma: f64, sma_rising: bool) -> Self {
        if close < sma && !sma_rising {
            WeinsteinStage::Declining
        } else if close > sma {
            WeinsteinStage::Advancing
        } else {
            WeinsteinStage::Basing
        }
    }

    /// Conventional stage number. Stage 3 (topping) is never assigned.
    pub fn number(self) -> u8 {
        match self {
            WeinsteinStage::Basing => 1,
            WeinsteinStage::Advancing => 2,
            WeinsteinStage::Declining => 4,
        }
    }
}

impl fmt::Display for WeinsteinStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.number())
    }
}

/// Stage of the last bar with the values it was decided on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageReading {
    pub date: NaiveDate,
    pub stage: WeinsteinStage,
    pub close: f64,
    pub sma: f64,
    pub sma_rising: bool,
    /// `(close / sma - 1) * 100`
    pub price_vs_sma_pct: f64,
}

/// Stage the last bar of `bars`, normally a weekly resample.
pub fn classify_stage(bars: &BarSeries, config: &StageConfig) -> Result<StageReading, EngineError> {
    config.validate()?;
    let needed = config.min_bars();
    let Some(last) = bars.last().filter(|_| bars.len() >= needed) else {
        return Err(EngineError::InsufficientHistory {
            needed,
            available: bars.len(),
        });
    };

    let sma = sma_of_series(&bars.closes(), config.sma_period);
    let today = bars.len() - 1;
    let (current, prior) = (sma[today], sma[today - config.rising_lookback]);
    let sma_rising = current > prior;

    Ok(StageReading {
        date: last.date,
        stage: WeinsteinStage::classify(last.close, current, sma_rising),
        close: last.close,
        sma: current,
        sma_rising,
        price_vs_sma_pct: (last.close / current - 1.0) * 100.0,
    })
}
