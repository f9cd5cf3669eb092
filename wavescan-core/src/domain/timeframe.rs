//! Timeframes and per-timeframe states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart timeframe a bar series is sampled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Timeframe {
    Monthly,
    Weekly,
    Daily,
    H4,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Monthly,
        Timeframe::Weekly,
        Timeframe::Daily,
        Timeframe::H4,
    ];

    /// Short label used in human-readable reasons ("M", "W", "D", "4H").
    pub fn short_label(&self) -> &'static str {
        match self {
            Timeframe::Monthly => "M",
            Timeframe::Weekly => "W",
            Timeframe::Daily => "D",
            Timeframe::H4 => "4H",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::Monthly => "MONTHLY",
            Timeframe::Weekly => "WEEKLY",
            Timeframe::Daily => "DAILY",
            Timeframe::H4 => "H4",
        };
        f.write_str(s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MONTHLY" | "M" | "1MO" => Ok(Timeframe::Monthly),
            "WEEKLY" | "W" | "1WK" => Ok(Timeframe::Weekly),
            "DAILY" | "D" | "1D" => Ok(Timeframe::Daily),
            "H4" | "4H" => Ok(Timeframe::H4),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

/// Action label for one timeframe, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeframeState {
    Strong,
    Weak,
    Hold,
    Fading,
    Pull,
    Wait,
    Avoid,
}

impl TimeframeState {
    /// Strength rank: higher is stronger. `Avoid` is 0.
    pub fn strength(&self) -> u8 {
        match self {
            TimeframeState::Strong => 6,
            TimeframeState::Weak => 5,
            TimeframeState::Hold => 4,
            TimeframeState::Fading => 3,
            TimeframeState::Pull => 2,
            TimeframeState::Wait => 1,
            TimeframeState::Avoid => 0,
        }
    }

    /// The weaker of two states.
    pub fn weakest(self, other: TimeframeState) -> TimeframeState {
        if other.strength() < self.strength() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for TimeframeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeframeState::Strong => "STRONG",
            TimeframeState::Weak => "WEAK",
            TimeframeState::Hold => "HOLD",
            TimeframeState::Fading => "FADING",
            TimeframeState::Pull => "PULL",
            TimeframeState::Wait => "WAIT",
            TimeframeState::Avoid => "AVOID",
        };
        f.write_str(s)
    }
}
