//! Per-bar traffic light.
//!
//! Rules are evaluated in a fixed order so that exactly one label applies:
//!
//! 1. RED:    `ao_today < 0`
//! 2. GREEN:  `ao_today >= ao_yesterday` OR no bearish MACD cross today
//! 3. YELLOW: falling non-negative AO with a bearish MACD cross
//!
//! `ao_today == 0` is not RED; it falls through to the GREEN/YELLOW rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::scanner::{line_cross_at, line_values_at, CrossDirection};
use crate::error::EngineError;
use crate::oscillators::Oscillators;

/// Per-bar momentum light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
}

impl TrafficLight {
    pub const ALL: [TrafficLight; 3] = [TrafficLight::Green, TrafficLight::Yellow, TrafficLight::Red];
}

impl fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrafficLight::Green => "GREEN",
            TrafficLight::Yellow => "YELLOW",
            TrafficLight::Red => "RED",
        };
        f.write_str(s)
    }
}

/// Classify one bar from its AO values and today's MACD cross state.
pub fn classify_bar(ao_today: f64, ao_yesterday: f64, macd_crossed_down_today: bool) -> TrafficLight {
    if ao_today < 0.0 {
        TrafficLight::Red
    } else if ao_today >= ao_yesterday || !macd_crossed_down_today {
        TrafficLight::Green
    } else {
        TrafficLight::Yellow
    }
}

/// Classify bar `index` of a computed oscillator set.
///
/// Fails with `InsufficientHistory` when AO or the MACD/signal pair is absent
/// on `index` or `index - 1`.
pub fn classify_bar_at(oscillators: &Oscillators, index: usize) -> Result<TrafficLight, EngineError> {
    let needed = index + 1;
    let prev = index
        .checked_sub(1)
        .ok_or_else(|| EngineError::insufficient(2, needed))?;
    let (Some(ao_today), Some(ao_yesterday)) = (oscillators.ao.get(index), oscillators.ao.get(prev))
    else {
        return Err(missing_history(oscillators, index));
    };
    if line_values_at(&oscillators.macd, &oscillators.macd_signal, index).is_none() {
        return Err(missing_history(oscillators, index));
    }
    let crossed_down = line_cross_at(&oscillators.macd, &oscillators.macd_signal, index)
        == Some(CrossDirection::Down);
    Ok(classify_bar(ao_today, ao_yesterday, crossed_down))
}

fn missing_history(oscillators: &Oscillators, index: usize) -> EngineError {
    let first_full = oscillators
        .ao
        .first_valid()
        .max(oscillators.macd_signal.first_valid())
        .unwrap_or(oscillators.len());
    // Bars needed so that both index-1 and index carry every value.
    EngineError::insufficient(first_full + 2, index + 1)
}
