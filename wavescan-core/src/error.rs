//! Engine error taxonomy.
//!
//! Every failure is a local validation failure: it is returned to the caller
//! before any `Verdict` is built, so a verdict is either fully evaluated or
//! never produced.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Timeframe;

/// Errors raised by the signal engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The series is too short for the requested operation.
    #[error("insufficient history: need {needed} bars, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    /// Two series compared positionally do not share the same date index.
    #[error("index misalignment at position {position}: {left} vs {right}")]
    IndexAlignment {
        position: usize,
        left: NaiveDate,
        right: NaiveDate,
    },

    /// Two series compared positionally have different lengths.
    #[error("index length mismatch: {left} vs {right} bars")]
    LengthMismatch { left: usize, right: usize },

    /// A numeric configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Bar input violates the ordering contract.
    #[error("invalid series: {0}")]
    InvalidSeries(String),

    /// A mandatory timeframe has no reading.
    #[error("missing reading for mandatory timeframe {0}")]
    MissingTimeframe(Timeframe),
}

impl EngineError {
    pub(crate) fn insufficient(needed: usize, available: usize) -> Self {
        Self::InsufficientHistory { needed, available }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_readable() {
        let err = EngineError::insufficient(35, 10);
        assert_eq!(err.to_string(), "insufficient history: need 35 bars, have 10");

        let err = EngineError::MissingTimeframe(Timeframe::Weekly);
        assert_eq!(
            err.to_string(),
            "missing reading for mandatory timeframe WEEKLY"
        );
    }
}
