//! Multi-ticker scan.
//!
//! Each symbol is loaded, live-scanned for an entry on its last daily bar and
//! classified on the monthly, weekly and daily timeframes; the readings are
//! then combined by the alignment policy. The weekly Weinstein stage is
//! reported alongside as an advisory reading. The market snapshot is the one
//! dated like the symbol's last bar, as in a single-symbol evaluation.
//! Symbols run in parallel on the rayon pool. A failure on one symbol is
//! recorded in its outcome and never aborts the scan.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wavescan_core::domain::{resample, BarSeries, Timeframe};
use wavescan_core::signals::{
    align, classify_stage, AggregateVerdict, StageReading, TimeframeReading, Verdict,
};
use wavescan_core::{EngineConfig, OscillatorCache};

use crate::backtest::{ensure_fresh, live_scan_cached, MarketSource};
use crate::data_loader::{BarSource, DataSource};
use crate::timeframes::{daily_derived_reports, TimeframeReport};

/// Refuse symbols whose last bar is older than `max_days` before `as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub as_of: NaiveDate,
    pub max_days: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Looked up at each symbol's last bar date.
    pub market: Option<MarketSource>,
    /// Externally computed H4 readings by upper-case symbol.
    pub h4_readings: BTreeMap<String, TimeframeReading>,
    pub staleness: Option<Staleness>,
}

/// Everything learned about one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub symbol: String,
    pub source: Option<DataSource>,
    pub entry: Option<Verdict>,
    pub timeframes: BTreeMap<Timeframe, TimeframeReport>,
    pub alignment: Option<AggregateVerdict>,
    /// Weekly stage; advisory, never part of the candidate decision.
    pub stage: Option<StageReading>,
    pub errors: Vec<String>,
}

impl ScanOutcome {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            source: None,
            entry: None,
            timeframes: BTreeMap::new(),
            alignment: None,
            stage: None,
            errors: Vec::new(),
        }
    }

    /// Entry fired and the timeframes are aligned.
    pub fn is_candidate(&self) -> bool {
        self.entry.as_ref().is_some_and(|v| v.signal)
            && self.alignment.as_ref().is_some_and(|a| a.aligned)
    }
}

/// Scan `symbols` in parallel. Outcomes are returned in input order.
pub fn scan_universe(
    symbols: &[String],
    source: &dyn BarSource,
    options: &ScanOptions,
    config: &EngineConfig,
) -> Vec<ScanOutcome> {
    let outcomes: Vec<ScanOutcome> = symbols
        .par_iter()
        .map(|symbol| scan_symbol(symbol, source, options, config))
        .collect();

    let candidates = outcomes.iter().filter(|o| o.is_candidate()).count();
    let failed = outcomes.iter().filter(|o| o.source.is_none()).count();
    info!(symbols = symbols.len(), candidates, failed, "scan complete");
    outcomes
}

/// Scan one symbol.
pub fn scan_symbol(
    symbol: &str,
    source: &dyn BarSource,
    options: &ScanOptions,
    config: &EngineConfig,
) -> ScanOutcome {
    scan_symbol_cached(symbol, source, options, config, &mut OscillatorCache::new())
}

/// Scan one symbol, reusing `cache`. The daily oscillators computed for the
/// entry check serve the daily timeframe report as well.
pub fn scan_symbol_cached(
    symbol: &str,
    source: &dyn BarSource,
    options: &ScanOptions,
    config: &EngineConfig,
    cache: &mut OscillatorCache,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::new(symbol);
    let loaded = match source.load(symbol) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(symbol, error = %e, "load failed");
            outcome.errors.push(format!("load: {e}"));
            return outcome;
        }
    };
    outcome.source = Some(loaded.source);
    let daily = &loaded.series;

    match entry_verdict(daily, options, config, cache) {
        Ok(verdict) => outcome.entry = Some(verdict),
        Err(e) => outcome.errors.push(format!("entry: {e}")),
    }

    for (timeframe, report) in daily_derived_reports(daily, config, cache) {
        match report {
            Ok(report) => {
                outcome.timeframes.insert(timeframe, report);
            }
            Err(e) => outcome.errors.push(format!("{timeframe}: {e}")),
        }
    }

    let stage = resample(daily, Timeframe::Weekly)
        .and_then(|weekly| classify_stage(&weekly, &config.stage));
    match stage {
        Ok(stage) => outcome.stage = Some(stage),
        Err(e) => outcome.errors.push(format!("stage: {e}")),
    }

    let mut readings: BTreeMap<Timeframe, TimeframeReading> = outcome
        .timeframes
        .iter()
        .map(|(tf, report)| (*tf, report.reading()))
        .collect();
    if let Some(h4) = options.h4_readings.get(&symbol.to_ascii_uppercase()) {
        readings.insert(Timeframe::H4, *h4);
    }
    match align(&readings, &config.alignment) {
        Ok(verdict) => outcome.alignment = Some(verdict),
        Err(e) => outcome.errors.push(format!("alignment: {e}")),
    }

    info!(
        symbol,
        entry = outcome.entry.as_ref().map(|v| v.signal),
        aligned = outcome.alignment.as_ref().map(|a| a.aligned),
        errors = outcome.errors.len(),
        "scanned"
    );
    outcome
}

fn entry_verdict(
    daily: &BarSeries,
    options: &ScanOptions,
    config: &EngineConfig,
    cache: &mut OscillatorCache,
) -> Result<Verdict, String> {
    let Some(market) = &options.market else {
        return Err("no market snapshot supplied".to_string());
    };
    let Some(last) = daily.last() else {
        return Err("no bars".to_string());
    };
    let Some(snapshot) = market.at(last.date) else {
        return Err(format!("no market snapshot for {}", last.date));
    };
    if let Some(s) = options.staleness {
        ensure_fresh(daily, s.as_of, s.max_days).map_err(|e| e.to_string())?;
    }
    live_scan_cached(daily, &snapshot, config, cache).map_err(|e| e.to_string())
}
