//! Backtest replay and live scan over the same evaluation path.
//!
//! Replay computes the oscillators once over the whole history and evaluates
//! every bar from the end of the warmup on. A live scan evaluates only the
//! last bar of whatever it is given. Because every oscillator is causal, the
//! replayed verdict for bar t equals a live scan of the history truncated
//! after t; [`check_parity`] verifies that bar by bar.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use wavescan_core::domain::BarSeries;
use wavescan_core::signals::{evaluate_entry, evaluate_with_oscillators, MarketSnapshot, Verdict};
use wavescan_core::{compute_oscillators, EngineConfig, EngineError, OscillatorCache};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("parity mismatch on bar {index} ({date}): replay said '{replayed}', live scan said '{live}'")]
    ParityMismatch {
        index: usize,
        date: NaiveDate,
        replayed: String,
        live: String,
    },

    #[error("data for '{symbol}' is stale: last bar {last_date}, {days_old} days before {as_of} (limit {max_days})")]
    StaleData {
        symbol: String,
        last_date: NaiveDate,
        as_of: NaiveDate,
        days_old: i64,
        max_days: i64,
    },
}

/// Market inputs for a run: one snapshot for every bar, or one per date.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketSource {
    Fixed(MarketSnapshot),
    ByDate(BTreeMap<NaiveDate, MarketSnapshot>),
}

impl MarketSource {
    pub fn at(&self, date: NaiveDate) -> Option<MarketSnapshot> {
        match self {
            MarketSource::Fixed(snapshot) => Some(*snapshot),
            MarketSource::ByDate(by_date) => by_date.get(&date).copied(),
        }
    }
}

/// Every evaluated bar of one backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub symbol: String,
    pub bar_count: usize,
    /// First bar index with enough history to evaluate.
    pub first_index: usize,
    /// Bars skipped because the market source had no snapshot for their date.
    pub skipped_no_market: usize,
    pub verdicts: Vec<Verdict>,
}

impl ReplayReport {
    pub fn signals(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.signal)
    }

    pub fn signal_count(&self) -> usize {
        self.signals().count()
    }
}

/// Evaluate every bar of `bars` that has enough history and a market snapshot.
pub fn replay(
    bars: &BarSeries,
    market: &MarketSource,
    config: &EngineConfig,
) -> Result<ReplayReport, RunError> {
    config.validate()?;
    let first_index = config.oscillators.warmup_bars();
    if bars.len() <= first_index {
        return Err(EngineError::InsufficientHistory {
            needed: first_index + 1,
            available: bars.len(),
        }
        .into());
    }

    let oscillators = compute_oscillators(bars, &config.oscillators)?;
    let mut verdicts = Vec::with_capacity(bars.len() - first_index);
    let mut skipped_no_market = 0usize;

    for (today, bar) in bars.bars().iter().enumerate().skip(first_index) {
        let Some(snapshot) = market.at(bar.date) else {
            skipped_no_market += 1;
            continue;
        };
        verdicts.push(evaluate_with_oscillators(
            bars,
            &oscillators,
            today,
            &snapshot,
            config,
        )?);
    }

    if skipped_no_market > 0 {
        debug!(
            symbol = %bars.symbol(),
            skipped = skipped_no_market,
            "bars without market snapshot were not evaluated"
        );
    }
    let report = ReplayReport {
        symbol: bars.symbol().to_string(),
        bar_count: bars.len(),
        first_index,
        skipped_no_market,
        verdicts,
    };
    info!(
        symbol = %report.symbol,
        evaluated = report.verdicts.len(),
        signals = report.signal_count(),
        "replay complete"
    );
    Ok(report)
}

/// Evaluate the last bar of `bars`.
pub fn live_scan(
    bars: &BarSeries,
    market: &MarketSnapshot,
    config: &EngineConfig,
) -> Result<Verdict, RunError> {
    Ok(evaluate_entry(bars, market, config)?)
}

/// Like [`live_scan`], refusing data whose last bar is more than `max_days`
/// calendar days before `as_of`.
pub fn live_scan_as_of(
    bars: &BarSeries,
    market: &MarketSnapshot,
    config: &EngineConfig,
    as_of: NaiveDate,
    max_days: i64,
) -> Result<Verdict, RunError> {
    ensure_fresh(bars, as_of, max_days)?;
    live_scan(bars, market, config)
}

/// [`live_scan`] with the daily oscillators taken from (and left in) `cache`.
/// The verdict is identical to an uncached live scan.
pub fn live_scan_cached(
    bars: &BarSeries,
    market: &MarketSnapshot,
    config: &EngineConfig,
    cache: &mut OscillatorCache,
) -> Result<Verdict, RunError> {
    config.validate()?;
    let Some(today) = bars.len().checked_sub(1) else {
        return Err(EngineError::InsufficientHistory {
            needed: config.oscillators.warmup_bars() + 1,
            available: 0,
        }
        .into());
    };
    let oscillators = cache.get_or_compute(bars, &config.oscillators)?;
    Ok(evaluate_with_oscillators(
        bars,
        &oscillators,
        today,
        market,
        config,
    )?)
}

/// `Err(StaleData)` when the last bar is more than `max_days` before `as_of`.
pub fn ensure_fresh(bars: &BarSeries, as_of: NaiveDate, max_days: i64) -> Result<(), RunError> {
    let Some(last) = bars.last() else {
        return Ok(());
    };
    let days_old = (as_of - last.date).num_days();
    if days_old > max_days {
        return Err(RunError::StaleData {
            symbol: bars.symbol().to_string(),
            last_date: last.date,
            as_of,
            days_old,
            max_days,
        });
    }
    Ok(())
}

/// Outcome of a successful parity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParityReport {
    pub bars_checked: usize,
    pub signals: usize,
}

/// Replay `bars`, then live-scan each evaluated bar's truncated history and
/// require identical verdicts. Reports the earliest mismatch.
pub fn check_parity(
    bars: &BarSeries,
    market: &MarketSource,
    config: &EngineConfig,
) -> Result<ParityReport, RunError> {
    let report = replay(bars, market, config)?;

    let failure = report
        .verdicts
        .par_iter()
        .find_map_first(|replayed| verify_bar(bars, replayed, market, config).err());
    if let Some(err) = failure {
        return Err(err);
    }

    let parity = ParityReport {
        bars_checked: report.verdicts.len(),
        signals: report.signal_count(),
    };
    info!(symbol = %bars.symbol(), bars = parity.bars_checked, "replay and live scan agree");
    Ok(parity)
}

fn verify_bar(
    bars: &BarSeries,
    replayed: &Verdict,
    market: &MarketSource,
    config: &EngineConfig,
) -> Result<(), RunError> {
    let index = replayed.today_index;
    // replay only emits verdicts for dates the source covers
    let snapshot = market
        .at(replayed.date)
        .unwrap_or(replayed.checks.market);
    let live = live_scan(&bars.truncated(index + 1), &snapshot, config)?;
    if live.same_as(replayed) {
        Ok(())
    } else {
        Err(RunError::ParityMismatch {
            index,
            date: replayed.date,
            replayed: replayed.reason.clone(),
            live: live.reason,
        })
    }
}
