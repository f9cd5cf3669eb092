//! End-to-end entry scenarios on hand-built oscillator series.
//!
//! Thirty bars, today = bar 29, window of 20 bars:
//! - AO crosses above zero between bars 14 and 15 (after bar 15, 14 bars ago)
//! - AO stays positive through bar 29
//! - MACD crosses above its signal line exactly on bar 29
//!
//! Each negative scenario breaks exactly one condition.

use chrono::NaiveDate;
use wavescan_core::domain::{Bar, BarSeries, OscillatorSeries};
use wavescan_core::signals::{
    evaluate_with_oscillators, find_prior_cross, EntryCondition, MarketSnapshot,
};
use wavescan_core::{EngineConfig, EngineError, Oscillators};

const TODAY: usize = 29;

fn bars() -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let bars = (0..30)
        .map(|i| {
            let close = 50.0 + i as f64 * 0.5;
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close - 0.2,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 10_000,
            }
        })
        .collect();
    BarSeries::new("ACME", bars).unwrap()
}

fn series(name: &str, bars: &BarSeries, values: Vec<f64>) -> OscillatorSeries {
    OscillatorSeries::new(name, bars.dates(), values.into_iter().map(Some).collect()).unwrap()
}

/// AO negative before `cross_after`, positive from it on, 1.1 today.
fn oscillators(bars: &BarSeries, cross_after: usize) -> Oscillators {
    let (ao, macd, signal) = lines(cross_after);
    if cross_after == 15 {
        assert_eq!((ao[14], ao[15]), (-0.3, 0.2));
    }
    assemble(bars, ao, macd, signal)
}

/// Raw AO, MACD and signal values; MACD crosses its signal on bar 29.
fn lines(cross_after: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut ao: Vec<f64> = (0..30)
        .map(|i| if i < cross_after { -0.3 } else { 0.2 })
        .collect();
    ao[TODAY] = 1.1;

    let mut macd = vec![0.1; 30];
    let mut signal = vec![0.2; 30];
    macd[28] = 0.3;
    signal[28] = 0.35;
    macd[29] = 0.5;
    signal[29] = 0.4;
    (ao, macd, signal)
}

fn assemble(bars: &BarSeries, ao: Vec<f64>, macd: Vec<f64>, signal: Vec<f64>) -> Oscillators {
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
    Oscillators {
        ao: series("ao", bars, ao),
        macd: series("macd", bars, macd),
        macd_signal: series("macd_signal", bars, signal),
        macd_histogram: series("macd_histogram", bars, histogram),
    }
}

fn passing_market() -> MarketSnapshot {
    MarketSnapshot::new(510.0, 470.0, 14.5)
}

#[test]
fn positive_scenario_fires_and_names_cross_date() {
    let bars = bars();
    let osc = oscillators(&bars, 15);
    let verdict =
        evaluate_with_oscillators(&bars, &osc, TODAY, &passing_market(), &EngineConfig::default())
            .unwrap();

    assert!(verdict.signal);
    assert!(verdict.checks.macd_cross_today);
    assert!(verdict.checks.ao_positive);
    assert!(verdict.checks.ao_prior_cross);
    assert!(verdict.checks.market_filter);
    assert_eq!(verdict.checks.ao_cross.bars_ago, Some(14));
    assert_eq!(verdict.checks.ao_cross.cross_index, Some(15));

    let cross_date = bars.date_at(15).unwrap();
    assert_eq!(verdict.checks.ao_cross.date, Some(cross_date));
    assert!(
        verdict.reason.contains(&cross_date.to_string()),
        "reason should name {cross_date}: {}",
        verdict.reason
    );
    assert_eq!(verdict.date, bars.date_at(TODAY).unwrap());
    assert_eq!(verdict.symbol, "ACME");
}

#[test]
fn cross_moved_to_today_does_not_fire() {
    let bars = bars();
    let osc = oscillators(&bars, TODAY);
    let verdict =
        evaluate_with_oscillators(&bars, &osc, TODAY, &passing_market(), &EngineConfig::default())
            .unwrap();

    assert!(!verdict.signal);
    // Today's own AO transition must not satisfy the prior-window check.
    assert!(!verdict.checks.ao_prior_cross);
    assert!(verdict.checks.macd_cross_today);
    assert!(verdict.checks.ao_positive);
    assert_eq!(
        verdict.checks.first_failure(),
        Some(EntryCondition::AoPriorCross)
    );
}

#[test]
fn failing_market_keeps_other_checks_reported() {
    let bars = bars();
    let osc = oscillators(&bars, 15);
    let market = MarketSnapshot::new(450.0, 470.0, 14.5);
    let verdict =
        evaluate_with_oscillators(&bars, &osc, TODAY, &market, &EngineConfig::default()).unwrap();

    assert!(!verdict.signal);
    assert!(verdict.checks.macd_cross_today);
    assert!(verdict.checks.ao_positive);
    assert!(verdict.checks.ao_prior_cross);
    assert!(!verdict.checks.market_filter);
    assert_eq!(verdict.checks.failures(), vec![EntryCondition::MarketFilter]);
}

#[test]
fn shorter_window_misses_the_cross() {
    let bars = bars();
    let osc = oscillators(&bars, 15);
    let config = EngineConfig {
        window_length: 13,
        ..EngineConfig::default()
    };
    let verdict =
        evaluate_with_oscillators(&bars, &osc, TODAY, &passing_market(), &config).unwrap();
    assert!(!verdict.checks.ao_prior_cross);

    let config = EngineConfig {
        window_length: 14,
        ..EngineConfig::default()
    };
    let verdict =
        evaluate_with_oscillators(&bars, &osc, TODAY, &passing_market(), &config).unwrap();
    assert!(verdict.signal);
}

#[test]
fn window_boundary_is_exact() {
    let bars = bars();
    // cross after bar 9 is j = 20; after bar 8 is j = 21
    let at_edge = oscillators(&bars, 9);
    assert!(find_prior_cross(&at_edge.ao, TODAY, 20).unwrap().found);
    let past_edge = oscillators(&bars, 8);
    assert!(!find_prior_cross(&past_edge.ao, TODAY, 20).unwrap().found);
}

#[test]
fn oscillators_from_another_series_are_rejected() {
    let bars = bars();
    let osc = oscillators(&bars, 15);
    let other = BarSeries::new("ACME", bars.bars()[1..].to_vec()).unwrap();
    let err = evaluate_with_oscillators(
        &other,
        &osc,
        TODAY - 1,
        &passing_market(),
        &EngineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::LengthMismatch { .. }));
}

#[test]
fn each_condition_alone_blocks_the_entry() {
    let bars = bars();
    let config = EngineConfig::default();

    // MACD stays under its signal today
    let (ao, mut macd, signal) = lines(15);
    macd[TODAY] = 0.38;
    let no_macd_cross = assemble(&bars, ao, macd, signal);

    // AO dips to zero today; the bar 14/15 cross is still in the window
    let (mut ao, macd, signal) = lines(15);
    ao[TODAY] = 0.0;
    let ao_not_positive = assemble(&bars, ao, macd, signal);

    // AO turned positive after bar 5, 24 bars back, beyond the 20-bar window
    let cross_too_old = oscillators(&bars, 5);
    let all_pass = oscillators(&bars, 15);

    let calm = passing_market();
    let volatile = MarketSnapshot::new(510.0, 470.0, 30.0);
    let cases = [
        (&no_macd_cross, calm, EntryCondition::MacdCrossToday),
        (&ao_not_positive, calm, EntryCondition::AoPositive),
        (&cross_too_old, calm, EntryCondition::AoPriorCross),
        (&all_pass, volatile, EntryCondition::MarketFilter),
    ];
    for (osc, market, failing) in cases {
        let verdict = evaluate_with_oscillators(&bars, osc, TODAY, &market, &config).unwrap();
        assert!(!verdict.signal, "{failing} failed but the entry fired");
        assert_eq!(verdict.checks.failures(), vec![failing], "{}", verdict.reason);
    }
}
