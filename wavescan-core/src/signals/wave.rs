//! Wave state from AO swing structure.
//!
//! The trailing AO window is cut into swings (maximal runs of one sign). The
//! last swing and the negative lows around it pick a base state; a bearish
//! divergence across the last two positive swings then downgrades it through
//! [`DivergenceTable`]. [`StateTable`] turns a wave state and the bar's
//! traffic light into the timeframe's action label.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::TrafficLight;
use crate::domain::{Bar, BarSeries, OscillatorSeries, TimeframeState};
use crate::error::EngineError;
use crate::oscillators::Oscillators;

/// Coarse market phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveState {
    EarlyImpulse,
    LateImpulse,
    Pullback,
    Corrective,
}

impl WaveState {
    pub const ALL: [WaveState; 4] = [
        WaveState::EarlyImpulse,
        WaveState::LateImpulse,
        WaveState::Pullback,
        WaveState::Corrective,
    ];
}

impl fmt::Display for WaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaveState::EarlyImpulse => "EARLY_IMPULSE",
            WaveState::LateImpulse => "LATE_IMPULSE",
            WaveState::Pullback => "PULLBACK",
            WaveState::Corrective => "CORRECTIVE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    /// AO strictly above zero.
    Positive,
    /// AO at or below zero.
    NonPositive,
}

/// One run of same-sign AO values.
///
/// For positive swings the extremes are the highest AO and the highest high;
/// for non-positive swings the lowest AO and the lowest low. Indices are
/// positions in the full bar series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    pub kind: SwingKind,
    pub start: usize,
    pub end: usize,
    pub ao_extreme: f64,
    pub ao_extreme_index: usize,
    pub price_extreme: f64,
    pub price_extreme_index: usize,
}

impl Swing {
    fn open(index: usize, ao: f64, bar: &Bar) -> Self {
        let kind = if ao > 0.0 {
            SwingKind::Positive
        } else {
            SwingKind::NonPositive
        };
        let price = match kind {
            SwingKind::Positive => bar.high,
            SwingKind::NonPositive => bar.low,
        };
        Self {
            kind,
            start: index,
            end: index,
            ao_extreme: ao,
            ao_extreme_index: index,
            price_extreme: price,
            price_extreme_index: index,
        }
    }

    fn accepts(&self, ao: f64) -> bool {
        (ao > 0.0) == self.is_positive()
    }

    fn extend(&mut self, index: usize, ao: f64, bar: &Bar) {
        self.end = index;
        match self.kind {
            SwingKind::Positive => {
                if ao > self.ao_extreme {
                    self.ao_extreme = ao;
                    self.ao_extreme_index = index;
                }
                if bar.high > self.price_extreme {
                    self.price_extreme = bar.high;
                    self.price_extreme_index = index;
                }
            }
            SwingKind::NonPositive => {
                if ao < self.ao_extreme {
                    self.ao_extreme = ao;
                    self.ao_extreme_index = index;
                }
                if bar.low < self.price_extreme {
                    self.price_extreme = bar.low;
                    self.price_extreme_index = index;
                }
            }
        }
    }

    pub fn is_positive(&self) -> bool {
        self.kind == SwingKind::Positive
    }

    pub fn bar_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Downgrade applied to the base state when a bearish divergence is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceTable {
    pub early_impulse: WaveState,
    pub late_impulse: WaveState,
    pub pullback: WaveState,
    pub corrective: WaveState,
}

impl Default for DivergenceTable {
    fn default() -> Self {
        Self {
            early_impulse: WaveState::LateImpulse,
            late_impulse: WaveState::Corrective,
            pullback: WaveState::Pullback,
            corrective: WaveState::Corrective,
        }
    }
}

impl DivergenceTable {
    pub fn apply(&self, state: WaveState) -> WaveState {
        match state {
            WaveState::EarlyImpulse => self.early_impulse,
            WaveState::LateImpulse => self.late_impulse,
            WaveState::Pullback => self.pullback,
            WaveState::Corrective => self.corrective,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Trailing bars (today included) the swing analysis may look at.
    pub lookback: usize,
    pub divergence: DivergenceTable,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            lookback: 120,
            divergence: DivergenceTable::default(),
        }
    }
}

impl WaveConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback == 0 {
            return Err(EngineError::InvalidConfiguration(
                "wave.lookback must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// One configured cell of the verdict table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCell {
    pub wave: WaveState,
    pub light: TrafficLight,
    pub state: TimeframeState,
}

/// `(WaveState, TrafficLight) -> TimeframeState`.
///
/// Only EARLY_IMPULSE and CORRECTIVE rows are filled by default. Any cell not
/// filled by default or by configuration resolves to `Wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTable {
    cells: BTreeMap<(WaveState, TrafficLight), TimeframeState>,
}

impl Default for StateTable {
    fn default() -> Self {
        let mut cells = BTreeMap::new();
        cells.insert(
            (WaveState::EarlyImpulse, TrafficLight::Green),
            TimeframeState::Strong,
        );
        cells.insert(
            (WaveState::EarlyImpulse, TrafficLight::Yellow),
            TimeframeState::Weak,
        );
        cells.insert(
            (WaveState::EarlyImpulse, TrafficLight::Red),
            TimeframeState::Weak,
        );
        for light in TrafficLight::ALL {
            cells.insert((WaveState::Corrective, light), TimeframeState::Avoid);
        }
        Self { cells }
    }
}

impl StateTable {
    /// Defaults with `overrides` applied in order (later cells win).
    pub fn with_overrides(overrides: &[VerdictCell]) -> Self {
        let mut table = Self::default();
        for cell in overrides {
            table.cells.insert((cell.wave, cell.light), cell.state);
        }
        table
    }

    pub fn resolve(&self, wave: WaveState, light: TrafficLight) -> TimeframeState {
        self.cells
            .get(&(wave, light))
            .copied()
            .unwrap_or(TimeframeState::Wait)
    }

    pub fn is_configured(&self, wave: WaveState, light: TrafficLight) -> bool {
        self.cells.contains_key(&(wave, light))
    }
}

/// Result of [`classify_wave`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveAssessment {
    /// Base state after any divergence downgrade.
    pub state: WaveState,
    pub base_state: WaveState,
    pub bearish_divergence: bool,
    /// Reported only; never changes `state`.
    pub bullish_divergence: bool,
    /// Oldest first; the last swing contains today.
    pub swings: Vec<Swing>,
}

/// Classify the wave state on bar `today_index`.
///
/// Only the trailing `config.lookback` bars ending at `today_index` are read,
/// and within them only the contiguous run of present AO values ending today.
pub fn classify_wave(
    bars: &BarSeries,
    oscillators: &Oscillators,
    today_index: usize,
    config: &WaveConfig,
) -> Result<WaveAssessment, EngineError> {
    config.validate()?;
    oscillators.ao.ensure_aligned_with(bars)?;
    if today_index >= bars.len() {
        return Err(EngineError::insufficient(today_index + 1, bars.len()));
    }

    let window_start = (today_index + 1).saturating_sub(config.lookback);
    let mut start = today_index + 1;
    while start > window_start && oscillators.ao.get(start - 1).is_some() {
        start -= 1;
    }
    if start > today_index {
        let needed = oscillators
            .ao
            .first_valid()
            .map_or(bars.len() + 1, |first| first + 1);
        return Err(EngineError::insufficient(needed, today_index + 1));
    }

    let swings = identify_swings(bars, &oscillators.ao, start, today_index);
    let base_state = base_state(&swings);
    let bearish_divergence = bearish_divergence(&swings);
    let bullish_divergence = bullish_divergence(&swings);
    let state = if bearish_divergence {
        config.divergence.apply(base_state)
    } else {
        base_state
    };

    debug!(
        symbol = %bars.symbol(),
        today = today_index,
        swings = swings.len(),
        %base_state,
        %state,
        bearish_divergence,
        "wave classified"
    );

    Ok(WaveAssessment {
        state,
        base_state,
        bearish_divergence,
        bullish_divergence,
        swings,
    })
}

/// Split `ao[start..=end]` into sign runs.
pub fn identify_swings(
    bars: &BarSeries,
    ao: &OscillatorSeries,
    start: usize,
    end: usize,
) -> Vec<Swing> {
    let mut swings: Vec<Swing> = Vec::new();
    for index in start..=end {
        let (Some(value), Some(bar)) = (ao.get(index), bars.get(index)) else {
            break;
        };
        match swings.last_mut() {
            Some(current) if current.accepts(value) => current.extend(index, value, bar),
            _ => swings.push(Swing::open(index, value, bar)),
        }
    }
    swings
}

fn base_state(swings: &[Swing]) -> WaveState {
    let Some((current, earlier)) = swings.split_last() else {
        return WaveState::Corrective;
    };
    if current.is_positive() {
        return if impulse_leg_depth(swings) > 0 {
            WaveState::LateImpulse
        } else {
            WaveState::EarlyImpulse
        };
    }
    match earlier {
        [.., preceding, previous] if previous.is_positive() => {
            if current.price_extreme > preceding.price_extreme {
                WaveState::Pullback
            } else {
                WaveState::Corrective
            }
        }
        _ => WaveState::Corrective,
    }
}

/// Number of earlier positive swings in the impulse leg ending with the last
/// (positive) swing.
///
/// Walking back in (negative, positive) pairs, an earlier positive swing
/// joins the leg when the negative swing after it bottoms strictly above the
/// negative swing before it. An earlier positive swing with no negative swing
/// before it inside the window cannot be confirmed and ends the leg.
fn impulse_leg_depth(swings: &[Swing]) -> usize {
    let mut depth = 0;
    let mut i = swings.len().saturating_sub(1);
    while i >= 3 {
        if swings[i - 1].price_extreme <= swings[i - 3].price_extreme {
            break;
        }
        depth += 1;
        i -= 2;
    }
    depth
}

fn last_two(swings: &[Swing], kind: SwingKind) -> Option<(&Swing, &Swing)> {
    let mut matching = swings.iter().rev().filter(|s| s.kind == kind);
    let later = matching.next()?;
    let earlier = matching.next()?;
    Some((earlier, later))
}

/// Higher price high with a lower AO high across the last two positive swings.
fn bearish_divergence(swings: &[Swing]) -> bool {
    last_two(swings, SwingKind::Positive).is_some_and(|(earlier, later)| {
        later.price_extreme > earlier.price_extreme && later.ao_extreme < earlier.ao_extreme
    })
}

/// Lower price low with a higher AO low across the last two non-positive swings.
fn bullish_divergence(swings: &[Swing]) -> bool {
    last_two(swings, SwingKind::NonPositive).is_some_and(|(earlier, later)| {
        later.price_extreme < earlier.price_extreme && later.ao_extreme > earlier.ao_extreme
    })
}
