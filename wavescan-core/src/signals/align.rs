//! Multi-timeframe alignment.
//!
//! Mandatory timeframes gate the aggregate: one RED light or AVOID state
//! forces AVOID, otherwise the aggregate is the weakest mandatory state.
//! Advisory timeframes only produce warnings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::classifier::TrafficLight;
use crate::domain::{Timeframe, TimeframeState};
use crate::error::EngineError;

/// Light and action label observed on one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeReading {
    pub light: TrafficLight,
    pub state: TimeframeState,
}

impl TimeframeReading {
    pub fn new(light: TrafficLight, state: TimeframeState) -> Self {
        Self { light, state }
    }

    fn is_avoid(&self) -> bool {
        self.light == TrafficLight::Red || self.state == TimeframeState::Avoid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentPolicy {
    pub mandatory: BTreeSet<Timeframe>,
    /// Aggregate states that count as aligned for entry.
    pub entry_states: Vec<TimeframeState>,
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        Self {
            mandatory: Timeframe::ALL.into_iter().collect(),
            entry_states: vec![TimeframeState::Strong, TimeframeState::Weak],
        }
    }
}

impl AlignmentPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.mandatory.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "alignment.mandatory must name at least one timeframe".into(),
            ));
        }
        if self.entry_states.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "alignment.entry_states must not be empty".into(),
            ));
        }
        if self.entry_states.contains(&TimeframeState::Avoid) {
            return Err(EngineError::InvalidConfiguration(
                "alignment.entry_states must not contain AVOID".into(),
            ));
        }
        Ok(())
    }

    pub fn is_mandatory(&self, timeframe: Timeframe) -> bool {
        self.mandatory.contains(&timeframe)
    }
}

/// Combined verdict across timeframes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateVerdict {
    pub state: TimeframeState,
    pub aligned: bool,
    /// Mandatory timeframes with a RED light or AVOID state.
    pub avoid_timeframes: Vec<Timeframe>,
    /// Mandatory timeframes sitting at the aggregate state.
    pub limiting_timeframes: Vec<Timeframe>,
    pub warnings: Vec<String>,
    pub reason: String,
    pub readings: BTreeMap<Timeframe, TimeframeReading>,
}

/// Combine per-timeframe readings under `policy`.
pub fn align(
    readings: &BTreeMap<Timeframe, TimeframeReading>,
    policy: &AlignmentPolicy,
) -> Result<AggregateVerdict, EngineError> {
    policy.validate()?;

    let mut mandatory = Vec::with_capacity(policy.mandatory.len());
    for &timeframe in &policy.mandatory {
        let reading = readings
            .get(&timeframe)
            .ok_or(EngineError::MissingTimeframe(timeframe))?;
        mandatory.push((timeframe, *reading));
    }

    let avoid_timeframes: Vec<Timeframe> = mandatory
        .iter()
        .filter(|(_, reading)| reading.is_avoid())
        .map(|(timeframe, _)| *timeframe)
        .collect();

    let (state, limiting_timeframes, reason) = if avoid_timeframes.is_empty() {
        let state = mandatory
            .iter()
            .map(|(_, reading)| reading.state)
            .fold(TimeframeState::Strong, TimeframeState::weakest);
        let limiting: Vec<Timeframe> = mandatory
            .iter()
            .filter(|(_, reading)| reading.state == state)
            .map(|(timeframe, _)| *timeframe)
            .collect();
        let reason = format!(
            "Weakest mandatory timeframe at {state}: {}",
            labels(&limiting)
        );
        (state, limiting, reason)
    } else {
        let reason = format!("Timeframes in AVOID: {}", labels(&avoid_timeframes));
        (TimeframeState::Avoid, avoid_timeframes.clone(), reason)
    };

    let warnings = readings
        .iter()
        .filter(|(timeframe, _)| !policy.is_mandatory(**timeframe))
        .filter(|(_, reading)| reading.state.strength() < state.strength() || reading.is_avoid())
        .map(|(timeframe, reading)| {
            format!(
                "advisory {} at {} ({})",
                timeframe.short_label(),
                reading.state,
                reading.light
            )
        })
        .collect();

    Ok(AggregateVerdict {
        aligned: policy.entry_states.contains(&state),
        state,
        avoid_timeframes,
        limiting_timeframes,
        warnings,
        reason,
        readings: readings.clone(),
    })
}

fn labels(timeframes: &[Timeframe]) -> String {
    timeframes
        .iter()
        .map(Timeframe::short_label)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(light: TrafficLight, state: TimeframeState) -> TimeframeReading {
        TimeframeReading::new(light, state)
    }

    fn all_strong() -> BTreeMap<Timeframe, TimeframeReading> {
        Timeframe::ALL
            .into_iter()
            .map(|tf| (tf, reading(TrafficLight::Green, TimeframeState::Strong)))
            .collect()
    }

    #[test]
    fn all_strong_is_aligned() {
        let verdict = align(&all_strong(), &AlignmentPolicy::default()).unwrap();
        assert_eq!(verdict.state, TimeframeState::Strong);
        assert!(verdict.aligned);
        assert!(verdict.avoid_timeframes.is_empty());
        assert_eq!(verdict.limiting_timeframes.len(), 4);
    }

    #[test]
    fn weakest_mandatory_state_wins() {
        let mut readings = all_strong();
        readings.insert(Timeframe::Daily, reading(TrafficLight::Yellow, TimeframeState::Weak));
        let verdict = align(&readings, &AlignmentPolicy::default()).unwrap();
        assert_eq!(verdict.state, TimeframeState::Weak);
        assert!(verdict.aligned);
        assert_eq!(verdict.limiting_timeframes, vec![Timeframe::Daily]);

        readings.insert(Timeframe::H4, reading(TrafficLight::Green, TimeframeState::Wait));
        let verdict = align(&readings, &AlignmentPolicy::default()).unwrap();
        assert_eq!(verdict.state, TimeframeState::Wait);
        assert!(!verdict.aligned);
        assert!(verdict.reason.contains("4H"));
    }

    #[test]
    fn red_or_avoid_forces_avoid_and_names_timeframes() {
        let mut readings = all_strong();
        readings.insert(Timeframe::Monthly, reading(TrafficLight::Red, TimeframeState::Weak));
        readings.insert(Timeframe::Weekly, reading(TrafficLight::Green, TimeframeState::Avoid));
        let verdict = align(&readings, &AlignmentPolicy::default()).unwrap();
        assert_eq!(verdict.state, TimeframeState::Avoid);
        assert!(!verdict.aligned);
        assert_eq!(verdict.reason, "Timeframes in AVOID: M, W");
        assert_eq!(
            verdict.avoid_timeframes,
            vec![Timeframe::Monthly, Timeframe::Weekly]
        );
    }

    #[test]
    fn missing_mandatory_timeframe_is_an_error() {
        let mut readings = all_strong();
        readings.remove(&Timeframe::Weekly);
        assert_eq!(
            align(&readings, &AlignmentPolicy::default()).unwrap_err(),
            EngineError::MissingTimeframe(Timeframe::Weekly)
        );
    }

    #[test]
    fn advisory_timeframe_warns_but_does_not_gate() {
        let policy = AlignmentPolicy {
            mandatory: [Timeframe::Monthly, Timeframe::Weekly, Timeframe::Daily]
                .into_iter()
                .collect(),
            ..AlignmentPolicy::default()
        };
        let mut readings = all_strong();
        readings.insert(Timeframe::H4, reading(TrafficLight::Red, TimeframeState::Avoid));
        let verdict = align(&readings, &policy).unwrap();
        assert_eq!(verdict.state, TimeframeState::Strong);
        assert!(verdict.aligned);
        assert_eq!(verdict.warnings, vec!["advisory 4H at AVOID (RED)".to_string()]);

        // Advisory timeframe may be absent altogether.
        readings.remove(&Timeframe::H4);
        assert!(align(&readings, &policy).unwrap().warnings.is_empty());
    }

    #[test]
    fn custom_entry_states() {
        let policy = AlignmentPolicy {
            entry_states: vec![TimeframeState::Strong],
            ..AlignmentPolicy::default()
        };
        let mut readings = all_strong();
        readings.insert(Timeframe::Daily, reading(TrafficLight::Green, TimeframeState::Weak));
        assert!(!align(&readings, &policy).unwrap().aligned);
    }

    #[test]
    fn invalid_policies_are_rejected() {
        let empty = AlignmentPolicy {
            mandatory: BTreeSet::new(),
            ..AlignmentPolicy::default()
        };
        assert!(matches!(
            align(&all_strong(), &empty),
            Err(EngineError::InvalidConfiguration(_))
        ));
        let avoid = AlignmentPolicy {
            entry_states: vec![TimeframeState::Avoid],
            ..AlignmentPolicy::default()
        };
        assert!(avoid.validate().is_err());
    }

    #[test]
    fn verdict_serializes_to_json() {
        let verdict = align(&all_strong(), &AlignmentPolicy::default()).unwrap();
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"MONTHLY\""));
        let back: AggregateVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }
}
