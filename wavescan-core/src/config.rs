//! Engine configuration.
//!
//! One `EngineConfig` drives every path (backtest replay, live scan,
//! multi-ticker scan). Every field has a default, so an empty TOML document
//! is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::oscillators::OscillatorConfig;
use crate::signals::align::AlignmentPolicy;
use crate::signals::market::{MarketFilter, MarketFilterConfig};
use crate::signals::stage::StageConfig;
use crate::signals::wave::{StateTable, VerdictCell, WaveConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bars before today searched for the AO zero-cross.
    pub window_length: usize,
    pub oscillators: OscillatorConfig,
    pub market_filter: MarketFilterConfig,
    pub wave: WaveConfig,
    /// Cells added to (or replacing) the default verdict table.
    pub verdict_table: Vec<VerdictCell>,
    pub alignment: AlignmentPolicy,
    /// Weekly stage reading reported by the scan.
    pub stage: StageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_length: 20,
            oscillators: OscillatorConfig::default(),
            market_filter: MarketFilterConfig::default(),
            wave: WaveConfig::default(),
            verdict_table: Vec::new(),
            alignment: AlignmentPolicy::default(),
            stage: StageConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_length == 0 {
            return Err(EngineError::InvalidConfiguration(
                "window_length must be positive".into(),
            ));
        }
        self.oscillators.validate()?;
        self.market_filter.validate()?;
        self.wave.validate()?;
        self.stage.validate()?;
        self.alignment.validate()
    }

    /// Parse and validate a TOML document. Unknown keys are ignored.
    pub fn from_toml(content: &str) -> Result<Self, EngineError> {
        Self::from_toml_lenient(content).map(|(config, _)| config)
    }

    /// Like [`EngineConfig::from_toml`], also returning the dotted paths of
    /// keys the configuration does not recognise.
    pub fn from_toml_lenient(content: &str) -> Result<(Self, Vec<String>), EngineError> {
        let table: toml::Table = toml::from_str(content)
            .map_err(|e| EngineError::InvalidConfiguration(format!("parse config TOML: {e}")))?;
        let raw = toml::Value::Table(table);
        let config: EngineConfig = raw
            .clone()
            .try_into()
            .map_err(|e| EngineError::InvalidConfiguration(format!("parse config TOML: {e}")))?;
        config.validate()?;

        let known = toml::Value::try_from(&config).map_err(|e| {
            EngineError::InvalidConfiguration(format!("serialize config TOML: {e}"))
        })?;
        let mut unknown = Vec::new();
        collect_unknown_keys(&raw, &known, "", &mut unknown);
        Ok((config, unknown))
    }

    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::InvalidConfiguration(format!("serialize config TOML: {e}")))
    }

    pub fn state_table(&self) -> StateTable {
        StateTable::with_overrides(&self.verdict_table)
    }

    pub fn market(&self) -> Result<MarketFilter, EngineError> {
        MarketFilter::new(self.market_filter)
    }
}

fn collect_unknown_keys(raw: &toml::Value, known: &toml::Value, path: &str, out: &mut Vec<String>) {
    match (raw, known) {
        (toml::Value::Table(raw), toml::Value::Table(known)) => {
            for (key, value) in raw {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match known.get(key) {
                    Some(known_value) => collect_unknown_keys(value, known_value, &child, out),
                    None => out.push(child),
                }
            }
        }
        (toml::Value::Array(raw), toml::Value::Array(known)) => {
            for (i, (value, known_value)) in raw.iter().zip(known).enumerate() {
                collect_unknown_keys(value, known_value, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timeframe, TimeframeState};
    use crate::signals::classifier::TrafficLight;
    use crate::signals::wave::WaveState;

    const FULL: &str = r#"
window_length = 15

[oscillators]
ao_fast = 5
ao_slow = 34
macd_fast = 8
macd_slow = 21
macd_signal = 5

[market_filter]
volatility_ceiling = 25.0
trend_period = 100

[wave]
lookback = 90

[wave.divergence]
early_impulse = "PULLBACK"

[[verdict_table]]
wave = "LATE_IMPULSE"
light = "GREEN"
state = "HOLD"

[alignment]
mandatory = ["MONTHLY", "WEEKLY", "DAILY"]
entry_states = ["STRONG"]

[stage]
sma_period = 26
"#;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn full_document_parses() {
        let config = EngineConfig::from_toml(FULL).unwrap();
        assert_eq!(config.window_length, 15);
        assert_eq!(config.oscillators.macd_fast, 8);
        assert_eq!(config.market_filter.trend_period, 100);
        assert_eq!(config.wave.lookback, 90);
        assert_eq!(config.wave.divergence.early_impulse, WaveState::Pullback);
        // untouched divergence rows keep their defaults
        assert_eq!(config.wave.divergence.late_impulse, WaveState::Corrective);
        assert!(!config.alignment.is_mandatory(Timeframe::H4));
        assert_eq!(config.stage.sma_period, 26);
        assert_eq!(config.stage.rising_lookback, 4);
        assert_eq!(
            config
                .state_table()
                .resolve(WaveState::LateImpulse, TrafficLight::Green),
            TimeframeState::Hold
        );
    }

    #[test]
    fn unknown_keys_are_collected() {
        let doc = r#"
window_length = 20
colour = "blue"

[oscillators]
ao_fast = 5
ao_sloww = 34

[[verdict_table]]
wave = "PULLBACK"
light = "GREEN"
state = "PULL"
note = "typo"
"#;
        let (config, unknown) = EngineConfig::from_toml_lenient(doc).unwrap();
        assert_eq!(config.oscillators.ao_slow, 34);
        assert_eq!(
            unknown,
            vec![
                "colour".to_string(),
                "oscillators.ao_sloww".to_string(),
                "verdict_table[0].note".to_string(),
            ]
        );
        assert!(EngineConfig::from_toml_lenient(FULL).unwrap().1.is_empty());
    }

    #[test]
    fn invalid_values_are_rejected() {
        for doc in [
            "window_length = 0",
            "[oscillators]\nmacd_fast = 30",
            "[market_filter]\nvolatility_ceiling = -1.0",
            "[wave]\nlookback = 0",
            "[alignment]\nmandatory = []",
        ] {
            assert!(
                matches!(
                    EngineConfig::from_toml(doc),
                    Err(EngineError::InvalidConfiguration(_))
                ),
                "{doc} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(EngineConfig::from_toml("window_length = ").is_err());
        assert!(EngineConfig::from_toml("window_length = \"twenty\"").is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = EngineConfig::from_toml(FULL).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }
}
