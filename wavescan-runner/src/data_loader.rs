//! Bar loading for the runner.
//!
//! Daily bars come from CSV files with a header row
//! `date,open,high,low,close[,volume]` and ISO dates (`YYYY-MM-DD`). Row
//! order in the file does not matter; bars are sorted by date and then
//! validated as a [`BarSeries`]. Rows with an empty or non-finite OHLC field,
//! or a high/low range that does not contain open and close, are skipped and
//! counted.
//!
//! A [`CsvDirectory`] resolves `{dir}/{SYMBOL}.csv`. When the file is absent
//! and synthetic data is enabled, a deterministic random walk is generated
//! instead and tagged as such. Synthetic data is a developer-only mode;
//! verdicts computed on it carry [`DataSource::Synthetic`].

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use wavescan_core::domain::{Bar, BarSeries, DatasetHash};
use wavescan_core::EngineError;

/// Everything that can go wrong turning files into a `BarSeries`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed CSV '{path}': {source}")]
    Csv { path: String, source: csv::Error },

    #[error("'{path}' row {row}: unparseable date '{value}'")]
    BadDate {
        path: String,
        row: usize,
        value: String,
    },

    #[error("'{path}' contains no usable rows")]
    Empty { path: String },

    #[error("'{path}': {source}")]
    Series { path: String, source: EngineError },

    #[error("no data file for '{symbol}' in {dir} (use --synthetic for synthetic data)")]
    NoData { symbol: String, dir: String },
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Synthetic,
}

/// A loaded series with provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: BarSeries,
    pub source: DataSource,
    pub dataset_hash: DatasetHash,
    /// Rows dropped for empty, non-finite or inconsistent OHLC fields.
    pub skipped_rows: usize,
}

impl LoadedSeries {
    fn new(series: BarSeries, source: DataSource, skipped_rows: usize) -> Self {
        let dataset_hash = series.dataset_hash();
        Self {
            series,
            source,
            dataset_hash,
            skipped_rows,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Anything that can produce the daily bars of a symbol.
pub trait BarSource: Send + Sync {
    fn load(&self, symbol: &str) -> Result<LoadedSeries, LoadError>;
}

/// Date range for synthetic bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Directory of `{SYMBOL}.csv` files.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
    synthetic: Option<SyntheticRange>,
}

impl CsvDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            synthetic: None,
        }
    }

    /// Fall back to synthetic bars over `range` for symbols without a file.
    pub fn with_synthetic(mut self, range: SyntheticRange) -> Self {
        self.synthetic = Some(range);
        self
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_ascii_uppercase()))
    }
}

impl BarSource for CsvDirectory {
    fn load(&self, symbol: &str) -> Result<LoadedSeries, LoadError> {
        let path = self.path_for(symbol);
        if path.exists() {
            return load_csv(&path, symbol);
        }
        match self.synthetic {
            Some(range) => {
                warn!(symbol, "no data file, using synthetic bars (tagged as synthetic)");
                let bars = generate_synthetic_bars(symbol, range.start, range.end);
                let series = BarSeries::new(symbol, bars).map_err(|source| LoadError::Series {
                    path: format!("synthetic:{symbol}"),
                    source,
                })?;
                Ok(LoadedSeries::new(series, DataSource::Synthetic, 0))
            }
            None => Err(LoadError::NoData {
                symbol: symbol.to_string(),
                dir: self.dir.display().to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

/// Load one CSV file of daily bars.
pub fn load_csv(path: &Path, symbol: &str) -> Result<LoadedSeries, LoadError> {
    let origin = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: origin.clone(),
        source,
    })?;
    let (series, skipped) = read_bars(file, symbol, &origin)?;
    debug!(
        symbol,
        path = %origin,
        bars = series.len(),
        skipped,
        "loaded CSV"
    );
    Ok(LoadedSeries::new(series, DataSource::Csv, skipped))
}

/// Parse CSV bars from any reader. `origin` names the input in errors.
pub fn read_bars<R: Read>(
    reader: R,
    symbol: &str,
    origin: &str,
) -> Result<(BarSeries, usize), LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (i, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = record.map_err(|source| LoadError::Csv {
            path: origin.to_string(),
            source,
        })?;
        let date = parse_date(&row.date).ok_or_else(|| LoadError::BadDate {
            path: origin.to_string(),
            row: i + 2,
            value: row.date.clone(),
        })?;
        let (Some(open), Some(high), Some(low), Some(close)) =
            (row.open, row.high, row.low, row.close)
        else {
            skipped += 1;
            continue;
        };
        let bar = Bar {
            date,
            open,
            high,
            low,
            close,
            volume: row.volume.map_or(0, |v| v.max(0.0).round() as u64),
        };
        if !bar.is_sane() {
            debug!(symbol, path = origin, %date, "skipping non-finite or inconsistent OHLC row");
            skipped += 1;
            continue;
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: origin.to_string(),
        });
    }
    if skipped > 0 {
        warn!(symbol, path = origin, skipped, "skipped rows with empty, non-finite or inconsistent OHLC fields");
    }

    bars.sort_by_key(|b| b.date);
    let series = BarSeries::new(symbol, bars).map_err(|source| LoadError::Series {
        path: origin.to_string(),
        source,
    })?;
    Ok((series, skipped))
}

#[derive(Debug, Deserialize)]
struct ValueRow {
    date: String,
    #[serde(alias = "value")]
    close: Option<f64>,
}

/// Load a `date,close` (or `date,value`) file into a date-keyed map, for
/// volatility index readings. Rows with an empty value are skipped.
pub fn load_value_csv(path: &Path) -> Result<BTreeMap<NaiveDate, f64>, LoadError> {
    let origin = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: origin.clone(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut values = BTreeMap::new();
    for (i, record) in reader.deserialize::<ValueRow>().enumerate() {
        let row = record.map_err(|source| LoadError::Csv {
            path: origin.clone(),
            source,
        })?;
        let date = parse_date(&row.date).ok_or_else(|| LoadError::BadDate {
            path: origin.clone(),
            row: i + 2,
            value: row.date.clone(),
        })?;
        if let Some(value) = row.close {
            values.insert(date, value);
        }
    }
    if values.is_empty() {
        return Err(LoadError::Empty { path: origin });
    }
    Ok(values)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part, which is ignored.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Weekday-only random walk seeded from the symbol name, so the same symbol
/// always yields the same bars. The drift switches sign in regimes of 15 to
/// 60 bars, enough for the oscillators to cross zero now and then.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::from_seed(*blake3::hash(symbol.as_bytes()).as_bytes());
    let mut close: f64 = rng.gen_range(20.0..200.0);
    let mut drift = 0.0;
    let mut regime_left = 0u32;

    let mut bars = Vec::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        if regime_left == 0 {
            drift = rng.gen_range(-0.004..0.005);
            regime_left = rng.gen_range(15..60);
        }
        regime_left -= 1;

        let open = close * (1.0 + rng.gen_range(-0.005..0.005));
        close = (open * (1.0 + drift + rng.gen_range(-0.02..0.02))).max(1.0);
        let spread = close * rng.gen_range(0.002..0.015);
        bars.push(Bar {
            date,
            open,
            high: open.max(close) + spread,
            low: open.min(close) - spread,
            close,
            volume: rng.gen_range(200_000..3_000_000),
        });
    }
    bars
}
