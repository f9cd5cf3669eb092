//! Daily → weekly / monthly bar aggregation.
//!
//! Buckets are ISO weeks or calendar months. The last bucket is kept even if
//! the period has not ended yet: on any given day it holds exactly what a
//! chart of that timeframe would show, which keeps the higher timeframes
//! free of look-ahead.

use chrono::Datelike;

use super::bar::Bar;
use super::series::BarSeries;
use super::timeframe::Timeframe;
use crate::error::EngineError;

/// Aggregate daily bars onto `timeframe`.
///
/// `Daily` returns a copy of the input. `H4` cannot be built from daily bars.
pub fn resample(bars: &BarSeries, timeframe: Timeframe) -> Result<BarSeries, EngineError> {
    let bucket: fn(&Bar) -> (i32, u32) = match timeframe {
        Timeframe::Daily => return Ok(bars.clone()),
        Timeframe::Weekly => |bar| {
            let week = bar.date.iso_week();
            (week.year(), week.week())
        },
        Timeframe::Monthly => |bar| (bar.date.year(), bar.date.month()),
        Timeframe::H4 => {
            return Err(EngineError::InvalidConfiguration(
                "H4 bars cannot be derived from daily bars; supply them directly".into(),
            ))
        }
    };

    let mut out: Vec<Bar> = Vec::new();
    let mut current_key = None;
    for bar in bars.bars() {
        let key = bucket(bar);
        match out.last_mut() {
            Some(agg) if current_key == Some(key) => {
                agg.date = bar.date;
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                out.push(bar.clone());
                current_key = Some(key);
            }
        }
    }

    BarSeries::new(bars.symbol(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(y: i32, m: u32, d: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            open,
            high,
            low,
            close,
            volume: 10,
        }
    }

    fn sample() -> BarSeries {
        BarSeries::new(
            "SPY",
            vec![
                // ISO week 2024-W05 (Mon 29 Jan .. Fri 2 Feb) straddles a month end
                bar(2024, 1, 29, 10.0, 12.0, 9.0, 11.0),
                bar(2024, 1, 31, 11.0, 15.0, 10.0, 14.0),
                bar(2024, 2, 1, 14.0, 14.5, 8.0, 9.0),
                bar(2024, 2, 2, 9.0, 10.0, 8.5, 9.5),
                // 2024-W06
                bar(2024, 2, 5, 9.5, 11.0, 9.0, 10.5),
                bar(2024, 2, 9, 10.5, 13.0, 10.0, 12.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn weekly_buckets_follow_iso_weeks() {
        let weekly = resample(&sample(), Timeframe::Weekly).unwrap();
        assert_eq!(weekly.len(), 2);
        let first = weekly.get(0).unwrap();
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
        assert_eq!(first.open, 10.0);
        assert_eq!(first.high, 15.0);
        assert_eq!(first.low, 8.0);
        assert_eq!(first.close, 9.5);
        assert_eq!(first.volume, 40);
        assert_eq!(weekly.symbol(), "SPY");
    }

    #[test]
    fn monthly_buckets_follow_calendar_months() {
        let monthly = resample(&sample(), Timeframe::Monthly).unwrap();
        assert_eq!(monthly.len(), 2);
        let jan = monthly.get(0).unwrap();
        assert_eq!(jan.date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(jan.close, 14.0);
        let feb = monthly.get(1).unwrap();
        assert_eq!(feb.open, 14.0);
        assert_eq!(feb.low, 8.0);
        assert_eq!(feb.close, 12.0);
    }

    #[test]
    fn year_boundary_uses_iso_year() {
        // 2024-12-30 and 2025-01-02 are both in ISO week 2025-W01.
        let bars = BarSeries::new(
            "SPY",
            vec![
                bar(2024, 12, 27, 1.0, 1.0, 1.0, 1.0),
                bar(2024, 12, 30, 1.0, 2.0, 1.0, 2.0),
                bar(2025, 1, 2, 2.0, 3.0, 2.0, 3.0),
            ],
        )
        .unwrap();
        let weekly = resample(&bars, Timeframe::Weekly).unwrap();
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly.get(1).unwrap().open, 1.0);
    }

    #[test]
    fn partial_last_bucket_matches_truncated_input() {
        let full = sample();
        let partial = resample(&full.truncated(5), Timeframe::Weekly).unwrap();
        let last = partial.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(last.close, 10.5);
    }

    #[test]
    fn daily_is_identity_and_h4_is_rejected() {
        let bars = sample();
        assert_eq!(resample(&bars, Timeframe::Daily).unwrap(), bars);
        assert!(matches!(
            resample(&bars, Timeframe::H4),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn empty_input() {
        let bars = BarSeries::new("SPY", Vec::new()).unwrap();
        assert!(resample(&bars, Timeframe::Monthly).unwrap().is_empty());
    }
}
