//! Zero-cross scanner over the window before today.
//!
//! "Today" is excluded from the scan. Offset `j` names the candidate whose
//! *after* bar sits `j` bars before today:
//!
//! ```text
//! j = 0            (today-1, today)      never scanned here
//! j = 1            (today-2, today-1)    most recent candidate
//! ...
//! j = window       (today-window-1, today-window)   oldest candidate
//! ```
//!
//! A crossing on today's own bar is the entry evaluator's business (the MACD
//! "crossed today" check), not the scanner's. Keeping the two apart stops a
//! single bar from satisfying both conditions at once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::OscillatorSeries;
use crate::error::EngineError;

/// Which way a monitored value crosses the zero line (or another series).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    /// At or below → strictly above.
    Up,
    /// At or above → strictly below.
    Down,
}

impl CrossDirection {
    /// Strict sign-change predicate. Equality belongs to the *before* side only.
    pub fn is_zero_cross(&self, before: f64, after: f64) -> bool {
        match self {
            CrossDirection::Up => before <= 0.0 && after > 0.0,
            CrossDirection::Down => before >= 0.0 && after < 0.0,
        }
    }
}

/// Result of a prior-window scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorCross {
    pub found: bool,
    /// Position of the crossing's *after* bar.
    pub cross_index: Option<usize>,
    /// Distance from today to the after bar (the offset `j`).
    pub bars_ago: Option<usize>,
    pub date: Option<NaiveDate>,
}

impl PriorCross {
    pub fn not_found() -> Self {
        Self::default()
    }

    fn at(series: &OscillatorSeries, cross_index: usize, bars_ago: usize) -> Self {
        Self {
            found: true,
            cross_index: Some(cross_index),
            bars_ago: Some(bars_ago),
            date: series.date_at(cross_index),
        }
    }
}

/// Most recent upward zero-cross strictly within the `window_length` bars
/// before `today_index`.
pub fn find_prior_cross(
    series: &OscillatorSeries,
    today_index: usize,
    window_length: usize,
) -> Result<PriorCross, EngineError> {
    find_prior_cross_in(series, today_index, window_length, CrossDirection::Up)
}

/// Directional variant of [`find_prior_cross`].
pub fn find_prior_cross_in(
    series: &OscillatorSeries,
    today_index: usize,
    window_length: usize,
    direction: CrossDirection,
) -> Result<PriorCross, EngineError> {
    if window_length == 0 {
        return Err(EngineError::InvalidConfiguration(
            "window_length must be positive".into(),
        ));
    }
    if today_index >= series.len() {
        return Err(EngineError::insufficient(today_index + 1, series.len()));
    }
    // One full window plus the bar before its oldest candidate.
    if today_index < window_length + 1 {
        return Ok(PriorCross::not_found());
    }

    for j in 1..=window_length {
        let after = today_index - j;
        if after == 0 {
            break;
        }
        let (Some(before_value), Some(after_value)) = (series.get(after - 1), series.get(after))
        else {
            // Absent values are warm-up; everything older is too.
            break;
        };
        if direction.is_zero_cross(before_value, after_value) {
            return Ok(PriorCross::at(series, after, j));
        }
    }

    Ok(PriorCross::not_found())
}

/// True when `a` crosses above `b` between the previous and current bar:
/// `a_now > b_now && a_prev <= b_prev`.
pub fn crossed_above(a_prev: f64, b_prev: f64, a_now: f64, b_now: f64) -> bool {
    a_now > b_now && a_prev <= b_prev
}

/// True when `a` crosses below `b`: `a_now < b_now && a_prev >= b_prev`.
pub fn crossed_below(a_prev: f64, b_prev: f64, a_now: f64, b_now: f64) -> bool {
    a_now < b_now && a_prev >= b_prev
}

/// Direction in which `line` crossed `signal` on bar `index`, if it did.
///
/// Returns `None` when no crossing happened, and also when any of the four
/// values is absent; use [`line_values_at`] to tell the two apart.
pub fn line_cross_at(
    line: &OscillatorSeries,
    signal: &OscillatorSeries,
    index: usize,
) -> Option<CrossDirection> {
    let (prev_line, prev_signal, line_now, signal_now) = line_values_at(line, signal, index)?;
    if crossed_above(prev_line, prev_signal, line_now, signal_now) {
        Some(CrossDirection::Up)
    } else if crossed_below(prev_line, prev_signal, line_now, signal_now) {
        Some(CrossDirection::Down)
    } else {
        None
    }
}

/// `(line[i-1], signal[i-1], line[i], signal[i])` when all four are present.
pub fn line_values_at(
    line: &OscillatorSeries,
    signal: &OscillatorSeries,
    index: usize,
) -> Option<(f64, f64, f64, f64)> {
    let prev = index.checked_sub(1)?;
    Some((
        line.get(prev)?,
        signal.get(prev)?,
        line.get(index)?,
        signal.get(index)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> OscillatorSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| base + chrono::Duration::days(i as i64))
            .collect();
        OscillatorSeries::new("ao", dates, values.iter().map(|v| Some(*v)).collect()).unwrap()
    }

    /// 30 negative bars with a single upward cross whose after bar is `after`.
    fn single_cross(len: usize, after: usize) -> OscillatorSeries {
        let values: Vec<f64> = (0..len)
            .map(|i| if i >= after { 1.0 } else { -1.0 })
            .collect();
        series(&values)
    }

    #[test]
    fn zero_belongs_to_before_side() {
        assert!(CrossDirection::Up.is_zero_cross(0.0, 0.1));
        assert!(!CrossDirection::Up.is_zero_cross(-0.1, 0.0));
        assert!(CrossDirection::Down.is_zero_cross(0.0, -0.1));
        assert!(!CrossDirection::Down.is_zero_cross(0.1, 0.0));
    }

    #[test]
    fn todays_cross_is_excluded() {
        let s = single_cross(30, 29);
        let r = find_prior_cross(&s, 29, 20).unwrap();
        assert!(!r.found);
        assert_eq!(r.cross_index, None);
    }

    #[test]
    fn cross_one_bar_ago_is_found() {
        let s = single_cross(30, 28);
        let r = find_prior_cross(&s, 29, 20).unwrap();
        assert!(r.found);
        assert_eq!(r.cross_index, Some(28));
        assert_eq!(r.bars_ago, Some(1));
    }

    #[test]
    fn oldest_window_offset_is_found() {
        // j = 20 → after bar 9
        let r = find_prior_cross(&single_cross(30, 9), 29, 20).unwrap();
        assert!(r.found);
        assert_eq!(r.bars_ago, Some(20));
        assert_eq!(r.cross_index, Some(9));
    }

    #[test]
    fn one_past_window_is_not_found() {
        // j = 21 → after bar 8
        let r = find_prior_cross(&single_cross(30, 8), 29, 20).unwrap();
        assert!(!r.found);
    }

    #[test]
    fn most_recent_cross_wins() {
        let mut values = vec![-1.0; 30];
        // j = 10 → after bar 19, j = 3 → after bar 26
        values[19] = 1.0;
        values[26] = 1.0;
        values[27] = 1.0;
        values[28] = 1.0;
        values[29] = 1.0;
        let r = find_prior_cross(&series(&values), 29, 20).unwrap();
        assert_eq!(r.bars_ago, Some(3));
        assert_eq!(r.cross_index, Some(26));
    }

    #[test]
    fn older_cross_found_when_today_also_crosses() {
        let mut values = vec![-1.0; 30];
        values[15] = 1.0; // j = 14
        values[29] = 1.0; // today
        let r = find_prior_cross(&series(&values), 29, 20).unwrap();
        assert_eq!(r.cross_index, Some(15));
        assert_eq!(r.bars_ago, Some(14));
    }

    #[test]
    fn short_series_is_not_found_without_panicking() {
        let window = 20;
        for len in 1..(window + 2) {
            let mut values = vec![-1.0; len];
            if len > 1 {
                values[len / 2] = 1.0;
            }
            let r = find_prior_cross(&series(&values), len - 1, window).unwrap();
            assert!(!r.found, "len {len} should be insufficient");
        }
    }

    #[test]
    fn minimal_full_window_scans_first_pair() {
        // len = window + 2: the oldest candidate uses bar 0 as its before bar.
        let mut values = vec![1.0; 22];
        values[0] = -1.0;
        let r = find_prior_cross(&series(&values), 21, 20).unwrap();
        assert!(r.found);
        assert_eq!(r.cross_index, Some(1));
    }

    #[test]
    fn zero_valued_bar_counts_as_before_side() {
        let mut values = vec![-1.0; 25];
        values[20] = 0.0;
        values[21] = 0.5;
        values[22] = 0.5;
        values[23] = 0.5;
        values[24] = 0.5;
        let r = find_prior_cross(&series(&values), 24, 10).unwrap();
        assert_eq!(r.cross_index, Some(21));

        // A bar landing exactly on zero is not a completed upward cross.
        let mut values = vec![-1.0; 25];
        values[22] = 0.0;
        let r = find_prior_cross(&series(&values), 24, 10).unwrap();
        assert!(!r.found);
    }

    #[test]
    fn absent_values_stop_the_scan() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..30)
            .map(|i| base + chrono::Duration::days(i))
            .collect();
        let mut values: Vec<Option<f64>> = vec![Some(1.0); 30];
        for v in values.iter_mut().take(20) {
            *v = None;
        }
        let s = OscillatorSeries::new("ao", dates, values).unwrap();
        // No value may be treated as zero: the first valid bar is not a cross.
        assert!(!find_prior_cross(&s, 29, 20).unwrap().found);
    }

    #[test]
    fn downward_cross_is_symmetric() {
        let values: Vec<f64> = (0..30).map(|i| if i >= 20 { -1.0 } else { 1.0 }).collect();
        let s = series(&values);
        let r = find_prior_cross_in(&s, 29, 20, CrossDirection::Down).unwrap();
        assert_eq!(r.cross_index, Some(20));
        assert!(!find_prior_cross(&s, 29, 20).unwrap().found);
    }

    #[test]
    fn date_is_reported() {
        let s = single_cross(30, 15);
        let r = find_prior_cross(&s, 29, 20).unwrap();
        assert_eq!(r.date, s.date_at(15));
    }

    #[test]
    fn zero_window_is_invalid() {
        let s = single_cross(30, 15);
        assert!(matches!(
            find_prior_cross(&s, 29, 0),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn today_out_of_range_is_insufficient() {
        let s = single_cross(30, 15);
        assert!(matches!(
            find_prior_cross(&s, 30, 20),
            Err(EngineError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn line_crosses() {
        let line = series(&[0.3, 0.5, 0.2]);
        let signal = series(&[0.35, 0.4, 0.3]);
        assert_eq!(line_cross_at(&line, &signal, 1), Some(CrossDirection::Up));
        assert_eq!(line_cross_at(&line, &signal, 2), Some(CrossDirection::Down));
        assert_eq!(line_cross_at(&line, &signal, 0), None);
    }

    #[test]
    fn equal_lines_do_not_cross() {
        assert!(!crossed_above(0.3, 0.35, 0.4, 0.4));
        assert!(crossed_above(0.4, 0.4, 0.5, 0.4));
        assert!(!crossed_below(0.4, 0.4, 0.4, 0.4));
    }
}
