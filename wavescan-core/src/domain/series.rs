//! Validated, immutable series.
//!
//! `BarSeries` enforces the ordering contract once at construction: dates are
//! strictly increasing (no duplicates), gaps are allowed and never filled.
//! `OscillatorSeries` carries one slot per input bar; warm-up slots are `None`
//! and never coerced to zero, since a zero is a legitimate crossing value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::ids::DatasetHash;
use crate::error::EngineError;

/// Ordered bar history for one symbol on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, rejecting unordered or duplicate dates and bars with
    /// a non-finite price.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, EngineError> {
        if let Some(bar) = bars.iter().find(|b| b.is_void()) {
            return Err(EngineError::InvalidSeries(format!(
                "non-finite price on {}",
                bar.date
            )));
        }
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(EngineError::InvalidSeries(format!(
                    "dates must be strictly increasing: {} at position {} follows {}",
                    pair[1].date,
                    i + 1,
                    pair[0].date
                )));
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.bars.get(index).map(|b| b.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Position of `date` in the series, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// The first `len` bars as a new series, i.e. what a live scan would have
    /// seen on the date of bar `len - 1`.
    pub fn truncated(&self, len: usize) -> BarSeries {
        BarSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }

    /// Content hash over dates and OHLCV values (symbol excluded).
    pub fn dataset_hash(&self) -> DatasetHash {
        let mut hasher = blake3::Hasher::new();
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
        DatasetHash(hasher.finalize().to_hex().to_string())
    }
}

/// A derived numeric series aligned 1:1 with the bars it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

/// The MACD signal line shares the oscillator representation.
pub type SignalLineSeries = OscillatorSeries;

impl OscillatorSeries {
    /// Build from explicit values. Lengths must match.
    pub fn new(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        values: Vec<Option<f64>>,
    ) -> Result<Self, EngineError> {
        if dates.len() != values.len() {
            return Err(EngineError::LengthMismatch {
                left: dates.len(),
                right: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            dates,
            values,
        })
    }

    /// Build from a raw indicator output where NaN marks warm-up / invalid slots.
    pub(crate) fn from_raw(name: impl Into<String>, dates: Vec<NaiveDate>, raw: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), raw.len());
        let values = raw
            .into_iter()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .collect();
        Self {
            name: name.into(),
            dates,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`; `None` for warm-up slots and out-of-range positions.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Index of the first present value.
    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    /// Verify that `other` shares this series' date index, position by position.
    pub fn ensure_aligned(&self, other: &OscillatorSeries) -> Result<(), EngineError> {
        ensure_same_dates(&self.dates, &other.dates)
    }

    /// Verify that this series was computed on `bars`' date index.
    pub fn ensure_aligned_with(&self, bars: &BarSeries) -> Result<(), EngineError> {
        if self.dates.len() != bars.len() {
            return Err(EngineError::LengthMismatch {
                left: self.dates.len(),
                right: bars.len(),
            });
        }
        for (position, (date, bar)) in self.dates.iter().zip(bars.bars()).enumerate() {
            if *date != bar.date {
                return Err(EngineError::IndexAlignment {
                    position,
                    left: *date,
                    right: bar.date,
                });
            }
        }
        Ok(())
    }
}

fn ensure_same_dates(left: &[NaiveDate], right: &[NaiveDate]) -> Result<(), EngineError> {
    if left.len() != right.len() {
        return Err(EngineError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    match left.iter().zip(right).position(|(l, r)| l != r) {
        Some(position) => Err(EngineError::IndexAlignment {
            position,
            left: left[position],
            right: right[position],
        }),
        None => Ok(()),
    }
}
