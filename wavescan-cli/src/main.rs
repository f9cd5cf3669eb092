//! WaveScan CLI: entry evaluation, backtest replay and universe scans.
//!
//! Commands:
//! - `evaluate`: live scan of one symbol's latest bar
//! - `backtest`: replay every bar of one symbol, optionally verifying
//!   replay/live parity
//! - `scan`: entry plus multi-timeframe alignment for many symbols
//! - `config`: print the default configuration as TOML
//!
//! Results are written to stdout as JSON; logs go to stderr.

mod logging;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use wavescan_core::signals::{snapshots_from_benchmark, MarketSnapshot, TimeframeReading};
use wavescan_core::EngineConfig;
use wavescan_runner::{
    check_parity, config_fingerprint, live_scan, live_scan_as_of, load_config, load_value_csv,
    replay, scan_universe, BarSource, CsvDirectory, DataSource, MarketSource, ParityReport,
    ReplayReport, ScanOptions, Staleness, SyntheticRange,
};

#[derive(Parser)]
#[command(
    name = "wavescan",
    about = "WaveScan CLI: momentum entry signals and multi-timeframe alignment"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the entry rule on a symbol's latest bar.
    Evaluate {
        /// Symbol to evaluate.
        #[arg(long)]
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        market: MarketArgs,

        #[command(flatten)]
        stale: StaleArgs,
    },
    /// Replay every bar of a symbol through the entry rule.
    Backtest {
        /// Symbol to replay.
        #[arg(long)]
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        market: MarketArgs,

        /// Also live-scan every truncated history and require identical verdicts.
        #[arg(long, default_value_t = false)]
        parity: bool,

        /// Only include bars where the entry fired.
        #[arg(long, default_value_t = false)]
        signals_only: bool,
    },
    /// Scan many symbols for entries and timeframe alignment.
    Scan {
        /// Symbols to scan (e.g., AAPL MSFT NVDA).
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        market: MarketArgs,

        #[command(flatten)]
        stale: StaleArgs,

        /// JSON file of externally computed H4 readings:
        /// `{"AAPL": {"light": "GREEN", "state": "STRONG"}}`.
        #[arg(long)]
        h4_readings: Option<PathBuf>,

        /// Only print symbols with a fired, aligned entry.
        #[arg(long, default_value_t = false)]
        candidates_only: bool,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[derive(Args)]
struct DataArgs {
    /// Directory of `{SYMBOL}.csv` files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate synthetic bars for symbols without a data file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Synthetic data start (YYYY-MM-DD). Defaults to 5 years ago.
    #[arg(long)]
    start: Option<String>,

    /// Synthetic data end (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,
}

#[derive(Args)]
struct MarketArgs {
    /// Benchmark close for a fixed market snapshot.
    #[arg(long, requires_all = ["benchmark_trend", "volatility"])]
    benchmark_close: Option<f64>,

    /// Benchmark trend level (e.g. its 200-day SMA) for a fixed snapshot.
    #[arg(long, requires = "benchmark_close")]
    benchmark_trend: Option<f64>,

    /// Volatility index level for a fixed snapshot.
    #[arg(long, requires = "benchmark_close")]
    volatility: Option<f64>,

    /// Benchmark symbol loaded from the data directory; the trend level is
    /// the SMA of its closes over `market_filter.trend_period`.
    #[arg(long, conflicts_with = "benchmark_close", requires = "volatility_csv")]
    benchmark: Option<String>,

    /// CSV of volatility index readings (`date,close`).
    #[arg(long, requires = "benchmark")]
    volatility_csv: Option<PathBuf>,
}

#[derive(Args)]
struct StaleArgs {
    /// Reference date for the staleness check (YYYY-MM-DD).
    #[arg(long)]
    as_of: Option<String>,

    /// Maximum age in calendar days of the last bar relative to `--as-of`.
    #[arg(long, default_value_t = 5)]
    max_stale_days: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json);

    match cli.command {
        Commands::Evaluate {
            symbol,
            data,
            market,
            stale,
        } => run_evaluate(&symbol, &data, &market, &stale),
        Commands::Backtest {
            symbol,
            data,
            market,
            parity,
            signals_only,
        } => run_backtest(&symbol, &data, &market, parity, signals_only),
        Commands::Scan {
            symbols,
            data,
            market,
            stale,
            h4_readings,
            candidates_only,
        } => run_scan(&symbols, &data, &market, &stale, h4_readings, candidates_only),
        Commands::Config => {
            print!("{}", EngineConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn run_evaluate(
    symbol: &str,
    data: &DataArgs,
    market_args: &MarketArgs,
    stale: &StaleArgs,
) -> Result<()> {
    let config = load_config(data.config.as_deref())?;
    let source = data_source(data)?;
    let loaded = source.load(symbol)?;
    let Some(market) = market_source(market_args, &source, &config)? else {
        bail!("a market snapshot is required: use --benchmark-close/--benchmark-trend/--volatility or --benchmark with --volatility-csv");
    };
    let Some(last) = loaded.series.last() else {
        bail!("no bars for '{symbol}'");
    };
    let Some(snapshot) = market.at(last.date) else {
        bail!("no market snapshot for {}", last.date);
    };

    let verdict = match parse_date(stale.as_of.as_deref())? {
        Some(as_of) => {
            live_scan_as_of(&loaded.series, &snapshot, &config, as_of, stale.max_stale_days)?
        }
        None => live_scan(&loaded.series, &snapshot, &config)?,
    };
    info!(symbol, signal = verdict.signal, reason = %verdict.reason, "evaluated");
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

#[derive(Serialize)]
struct BacktestOutput {
    config_fingerprint: String,
    dataset_hash: String,
    source: DataSource,
    parity: Option<ParityReport>,
    report: ReplayReport,
}

fn run_backtest(
    symbol: &str,
    data: &DataArgs,
    market_args: &MarketArgs,
    parity: bool,
    signals_only: bool,
) -> Result<()> {
    let config = load_config(data.config.as_deref())?;
    let source = data_source(data)?;
    let loaded = source.load(symbol)?;
    let Some(market) = market_source(market_args, &source, &config)? else {
        bail!("a market snapshot is required: use --benchmark-close/--benchmark-trend/--volatility or --benchmark with --volatility-csv");
    };

    let parity = if parity {
        Some(check_parity(&loaded.series, &market, &config)?)
    } else {
        None
    };
    let mut report = replay(&loaded.series, &market, &config)?;
    if signals_only {
        report.verdicts.retain(|v| v.signal);
    }

    let output = BacktestOutput {
        config_fingerprint: config_fingerprint(&config)?,
        dataset_hash: loaded.dataset_hash.to_string(),
        source: loaded.source,
        parity,
        report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_scan(
    symbols: &[String],
    data: &DataArgs,
    market_args: &MarketArgs,
    stale: &StaleArgs,
    h4_path: Option<PathBuf>,
    candidates_only: bool,
) -> Result<()> {
    let config = load_config(data.config.as_deref())?;
    let source = data_source(data)?;
    let market = market_source(market_args, &source, &config)?;

    let h4_readings = match h4_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let raw: BTreeMap<String, TimeframeReading> = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            raw.into_iter()
                .map(|(symbol, reading)| (symbol.to_ascii_uppercase(), reading))
                .collect()
        }
        None => BTreeMap::new(),
    };
    let staleness = parse_date(stale.as_of.as_deref())?.map(|as_of| Staleness {
        as_of,
        max_days: stale.max_stale_days,
    });

    let options = ScanOptions {
        market,
        h4_readings,
        staleness,
    };
    let mut outcomes = scan_universe(symbols, &source, &options, &config);
    if candidates_only {
        outcomes.retain(|o| o.is_candidate());
    }
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

fn data_source(data: &DataArgs) -> Result<CsvDirectory> {
    let source = CsvDirectory::new(&data.data_dir);
    if !data.synthetic {
        return Ok(source);
    }
    let today = chrono::Local::now().date_naive();
    let start = parse_date(data.start.as_deref())?
        .unwrap_or_else(|| today - chrono::Duration::days(365 * 5));
    let end = parse_date(data.end.as_deref())?.unwrap_or(today);
    if start >= end {
        bail!("--start must be before --end");
    }
    Ok(source.with_synthetic(SyntheticRange { start, end }))
}

fn market_source(
    args: &MarketArgs,
    source: &CsvDirectory,
    config: &EngineConfig,
) -> Result<Option<MarketSource>> {
    if let (Some(close), Some(trend), Some(volatility)) =
        (args.benchmark_close, args.benchmark_trend, args.volatility)
    {
        return Ok(Some(MarketSource::Fixed(MarketSnapshot::new(
            close, trend, volatility,
        ))));
    }
    let (Some(benchmark), Some(vol_path)) = (&args.benchmark, &args.volatility_csv) else {
        return Ok(None);
    };
    let benchmark = source.load(benchmark)?;
    let volatility = load_value_csv(vol_path)?;
    let snapshots = snapshots_from_benchmark(
        &benchmark.series,
        &volatility,
        config.market_filter.trend_period,
    )?;
    if snapshots.is_empty() {
        bail!(
            "benchmark '{}' and {} share no dates with a full trend window",
            benchmark.series.symbol(),
            vol_path.display()
        );
    }
    Ok(Some(MarketSource::ByDate(snapshots)))
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
    })
    .transpose()
}
