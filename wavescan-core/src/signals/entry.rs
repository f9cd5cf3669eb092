//! Entry signal evaluator.
//!
//! Four conditions, all computed and reported even when an earlier one fails:
//!
//! 1. MACD crossed above its signal line on today's bar.
//! 2. AO is above zero today.
//! 3. AO crossed above zero within the window before today.
//! 4. The market filter passes.
//!
//! The signal is their conjunction. Evaluation on bar `t` reads nothing after
//! `t`, so a backtest that evaluates every bar of one precomputed oscillator
//! set agrees with a live scan run on each truncated prefix.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::market::{MarketGate, MarketSnapshot};
use super::scanner::{crossed_above, find_prior_cross, line_values_at, PriorCross};
use crate::config::EngineConfig;
use crate::domain::BarSeries;
use crate::error::EngineError;
use crate::oscillators::{compute_oscillators, Oscillators};

/// The entry conditions in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCondition {
    MacdCrossToday,
    AoPositive,
    AoPriorCross,
    MarketFilter,
}

impl EntryCondition {
    pub const ORDER: [EntryCondition; 4] = [
        EntryCondition::MacdCrossToday,
        EntryCondition::AoPositive,
        EntryCondition::AoPriorCross,
        EntryCondition::MarketFilter,
    ];
}

impl fmt::Display for EntryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryCondition::MacdCrossToday => "macd_cross_today",
            EntryCondition::AoPositive => "ao_positive",
            EntryCondition::AoPriorCross => "ao_prior_cross",
            EntryCondition::MarketFilter => "market_filter",
        };
        f.write_str(s)
    }
}

/// Per-condition audit trail with the values each condition was decided on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryChecks {
    pub macd_cross_today: bool,
    pub ao_positive: bool,
    pub ao_prior_cross: bool,
    pub market_filter: bool,

    pub ao_today: f64,
    pub ao_yesterday: f64,
    pub macd_today: f64,
    pub signal_today: f64,
    pub macd_yesterday: f64,
    pub signal_yesterday: f64,
    pub window_length: usize,
    pub ao_cross: PriorCross,
    pub market: MarketSnapshot,
    pub market_gate: MarketGate,
}

impl EntryChecks {
    pub fn passed(&self, condition: EntryCondition) -> bool {
        match condition {
            EntryCondition::MacdCrossToday => self.macd_cross_today,
            EntryCondition::AoPositive => self.ao_positive,
            EntryCondition::AoPriorCross => self.ao_prior_cross,
            EntryCondition::MarketFilter => self.market_filter,
        }
    }

    pub fn all_passed(&self) -> bool {
        EntryCondition::ORDER.iter().all(|c| self.passed(*c))
    }

    /// First failing condition in reporting order.
    pub fn first_failure(&self) -> Option<EntryCondition> {
        EntryCondition::ORDER.into_iter().find(|c| !self.passed(*c))
    }

    pub fn failures(&self) -> Vec<EntryCondition> {
        EntryCondition::ORDER
            .into_iter()
            .filter(|c| !self.passed(*c))
            .collect()
    }

    fn explain(&self, condition: EntryCondition) -> String {
        match condition {
            EntryCondition::MacdCrossToday => format!(
                "MACD did not cross above signal today (MACD {:.4} vs signal {:.4}, yesterday {:.4} vs {:.4})",
                self.macd_today, self.signal_today, self.macd_yesterday, self.signal_yesterday
            ),
            EntryCondition::AoPositive => format!("AO not above zero (AO {:.4})", self.ao_today),
            EntryCondition::AoPriorCross => format!(
                "no AO zero-cross in the prior {} bars",
                self.window_length
            ),
            EntryCondition::MarketFilter => format!(
                "market filter failed (benchmark {:.2} vs trend {:.2}, volatility {:.2})",
                self.market.benchmark_close, self.market.benchmark_trend, self.market.volatility
            ),
        }
    }
}

/// Entry decision for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub signal: bool,
    pub symbol: String,
    pub date: NaiveDate,
    pub today_index: usize,
    pub checks: EntryChecks,
    pub reason: String,
}

impl Verdict {
    /// Exact equality with floats compared bit for bit, so NaN market inputs
    /// still compare equal to themselves.
    pub fn same_as(&self, other: &Verdict) -> bool {
        fn eq(a: f64, b: f64) -> bool {
            a.to_bits() == b.to_bits()
        }
        let (a, b) = (&self.checks, &other.checks);
        self.signal == other.signal
            && self.symbol == other.symbol
            && self.date == other.date
            && self.today_index == other.today_index
            && self.reason == other.reason
            && a.macd_cross_today == b.macd_cross_today
            && a.ao_positive == b.ao_positive
            && a.ao_prior_cross == b.ao_prior_cross
            && a.market_filter == b.market_filter
            && eq(a.ao_today, b.ao_today)
            && eq(a.ao_yesterday, b.ao_yesterday)
            && eq(a.macd_today, b.macd_today)
            && eq(a.signal_today, b.signal_today)
            && eq(a.macd_yesterday, b.macd_yesterday)
            && eq(a.signal_yesterday, b.signal_yesterday)
            && a.window_length == b.window_length
            && a.ao_cross == b.ao_cross
            && eq(a.market.benchmark_close, b.market.benchmark_close)
            && eq(a.market.benchmark_trend, b.market.benchmark_trend)
            && eq(a.market.volatility, b.market.volatility)
            && a.market_gate == b.market_gate
    }
}

/// Evaluate the last bar of `bars`.
pub fn evaluate_entry(
    bars: &BarSeries,
    market: &MarketSnapshot,
    config: &EngineConfig,
) -> Result<Verdict, EngineError> {
    let Some(today_index) = bars.len().checked_sub(1) else {
        return Err(EngineError::insufficient(
            config.oscillators.warmup_bars() + 1,
            0,
        ));
    };
    evaluate_entry_at(bars, today_index, market, config)
}

/// Evaluate bar `today_index` using only the bars up to and including it.
pub fn evaluate_entry_at(
    bars: &BarSeries,
    today_index: usize,
    market: &MarketSnapshot,
    config: &EngineConfig,
) -> Result<Verdict, EngineError> {
    config.validate()?;
    if today_index >= bars.len() {
        return Err(EngineError::insufficient(today_index + 1, bars.len()));
    }
    let visible = bars.truncated(today_index + 1);
    let oscillators = compute_oscillators(&visible, &config.oscillators)?;
    evaluate_with_oscillators(&visible, &oscillators, today_index, market, config)
}

/// Evaluate bar `today_index` against oscillators computed elsewhere (for
/// example once for a whole backtest, or from a cache).
///
/// The oscillators must share `bars`' date index.
pub fn evaluate_with_oscillators(
    bars: &BarSeries,
    oscillators: &Oscillators,
    today_index: usize,
    market: &MarketSnapshot,
    config: &EngineConfig,
) -> Result<Verdict, EngineError> {
    config.validate()?;
    oscillators.ensure_aligned_with(bars)?;
    let Some(date) = bars.date_at(today_index) else {
        return Err(EngineError::insufficient(today_index + 1, bars.len()));
    };

    let needed = config.oscillators.warmup_bars() + 1;
    let available = today_index + 1;
    let (macd_yesterday, signal_yesterday, macd_today, signal_today) =
        line_values_at(&oscillators.macd, &oscillators.macd_signal, today_index)
            .ok_or_else(|| EngineError::insufficient(needed, available))?;
    let (Some(ao_today), Some(ao_yesterday)) = (
        oscillators.ao.get(today_index),
        today_index
            .checked_sub(1)
            .and_then(|prev| oscillators.ao.get(prev)),
    ) else {
        return Err(EngineError::insufficient(needed, available));
    };

    let ao_cross = find_prior_cross(&oscillators.ao, today_index, config.window_length)?;
    let market_gate = config.market()?.evaluate(market);

    let checks = EntryChecks {
        macd_cross_today: crossed_above(macd_yesterday, signal_yesterday, macd_today, signal_today),
        ao_positive: ao_today > 0.0,
        ao_prior_cross: ao_cross.found,
        market_filter: market_gate.passed,
        ao_today,
        ao_yesterday,
        macd_today,
        signal_today,
        macd_yesterday,
        signal_yesterday,
        window_length: config.window_length,
        ao_cross,
        market: *market,
        market_gate,
    };

    let signal = checks.all_passed();
    let reason = match checks.first_failure() {
        Some(condition) => checks.explain(condition),
        None => match (ao_cross.date, ao_cross.bars_ago) {
            (Some(cross_date), Some(bars_ago)) => format!(
                "entry: MACD crossed above signal today; AO crossed above zero on {cross_date} ({bars_ago} bars ago)"
            ),
            _ => "entry: all conditions met".to_string(),
        },
    };

    debug!(
        symbol = %bars.symbol(),
        today = %date,
        signal,
        reason = %reason,
        "entry evaluated"
    );

    Ok(Verdict {
        signal,
        symbol: bars.symbol().to_string(),
        date,
        today_index,
        checks,
        reason,
    })
}
