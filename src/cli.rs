//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceLog;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::manual_quote_adapter::ManualQuoteAdapter;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestResult, DEFAULT_BUY_THRESHOLD,
    DEFAULT_INITIAL_INVESTMENT, DEFAULT_REENTRY_BAND, DEFAULT_SELL_THRESHOLD,
};
use crate::domain::config_validation::validate_config;
use crate::domain::error::KimchiError;
use crate::domain::metrics::Metrics;
use crate::domain::optimizer::{
    self, OptimizationEntry, OptimizerConfig, DEFAULT_MAX_THRESHOLD, DEFAULT_MIN_THRESHOLD,
    DEFAULT_STEP,
};
use crate::domain::outlier::{
    self, OutlierAnalysis, OutlierVerdict, DEFAULT_IQR_MULTIPLIER, DEFAULT_WINDOW_DAYS,
};
use crate::domain::price_record::PriceRecord;
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{PriceSeriesPort, QuotePort};
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_PATH: &str = "data/kimchi_gold_price_log.csv";
const DEFAULT_TOP: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "kimchigold", about = "Gold kimchi premium tracker and backtester")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Price log CSV (overrides [data] path)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,
    /// -v for info, -vv for debug
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether the latest premium is an IQR outlier
    Outlier(OutlierArgs),
    /// Replay the log against buy/sell premium thresholds
    Backtest(BacktestArgs),
    /// Search symmetric thresholds for the best return
    Optimize(OptimizeArgs),
    /// Append today's quotes to the price log
    Record(RecordArgs),
    /// Show the date range of the price log
    Info,
    /// Validate the configuration file
    Validate,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct OutlierArgs {
    /// Analysis date (default: today, or the quote date)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
    #[arg(long)]
    pub window_days: Option<i64>,
    #[arg(long)]
    pub multiplier: Option<f64>,
    /// Domestic price (KRW/g) for live mode
    #[arg(long)]
    pub domestic: Option<f64>,
    /// International price (USD/oz) for live mode
    #[arg(long)]
    pub international: Option<f64>,
    /// USD/KRW rate for live mode
    #[arg(long)]
    pub rate: Option<f64>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct BacktestArgs {
    /// First day to trade (default: first logged day)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long, allow_hyphen_values = true)]
    pub buy_threshold: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub sell_threshold: Option<f64>,
    /// Initial investment in KRW
    #[arg(long)]
    pub investment: Option<f64>,
    /// Write the trade log as CSV
    #[arg(long)]
    pub trades_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct OptimizeArgs {
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub min_threshold: Option<f64>,
    #[arg(long)]
    pub max_threshold: Option<f64>,
    #[arg(long)]
    pub step: Option<f64>,
    #[arg(long)]
    pub investment: Option<f64>,
    /// Rows to show in the ranking
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RecordArgs {
    /// Date of the quotes (default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Domestic price (KRW/g)
    #[arg(long)]
    pub domestic: f64,
    /// International price (USD/oz)
    #[arg(long)]
    pub international: f64,
    /// USD/KRW rate
    #[arg(long)]
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierSettings {
    pub as_of: NaiveDate,
    pub window_days: i64,
    pub multiplier: f64,
}

pub fn run(cli: Cli) -> ExitCode {
    logging::init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_config(&config) {
        return fail(&e);
    }

    let log = CsvPriceLog::new(resolve_data_path(cli.data.as_deref(), &config));

    let outcome = match cli.command {
        Command::Outlier(args) => run_outlier(&log, &config, &args),
        Command::Backtest(args) => run_backtest(&log, &config, &args),
        Command::Optimize(args) => run_optimize(&log, &config, &args),
        Command::Record(args) => run_record(&log, &args),
        Command::Info => run_info(&log),
        Command::Validate => {
            println!("Configuration is valid.");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(err: &KimchiError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, KimchiError> {
    match path {
        Some(p) => {
            tracing::info!("loading config from {}", p.display());
            FileConfigAdapter::from_file(p)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

pub fn resolve_data_path(cli_path: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
}

fn load_all(port: &dyn PriceSeriesPort) -> Result<Vec<PriceRecord>, KimchiError> {
    port.load_series(NaiveDate::MIN, NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// outlier

pub fn build_outlier_settings(
    config: &dyn ConfigPort,
    args: &OutlierArgs,
    default_as_of: NaiveDate,
) -> OutlierSettings {
    OutlierSettings {
        as_of: args.as_of.unwrap_or(default_as_of),
        window_days: args
            .window_days
            .unwrap_or_else(|| config.get_int("outlier", "window_days", DEFAULT_WINDOW_DAYS)),
        multiplier: args
            .multiplier
            .unwrap_or_else(|| config.get_double("outlier", "multiplier", DEFAULT_IQR_MULTIPLIER)),
    }
}

/// Analyze the logged series, substituting the live quote when one is given.
pub fn execute_outlier(
    port: &dyn PriceSeriesPort,
    quote: Option<&dyn QuotePort>,
    settings: &OutlierSettings,
) -> Result<OutlierAnalysis, KimchiError> {
    outlier::check_parameters(settings.window_days, settings.multiplier)?;
    let series = load_all(port)?;

    match quote.map(|q| q.current_quote()).transpose()? {
        Some(Some(record)) => {
            tracing::info!(
                "live quote {}: premium {:.2}%",
                record.date,
                record.premium_percent
            );
            outlier::analyze_with_quote(
                &series,
                &record,
                settings.window_days,
                settings.multiplier,
            )
        }
        Some(None) => {
            tracing::warn!("current quote unavailable");
            Ok(OutlierAnalysis {
                verdict: OutlierVerdict::Indeterminate,
                bounds: None,
                latest_date: None,
                latest_value: None,
                sample_size: 0,
            })
        }
        None => outlier::analyze(
            &series,
            settings.as_of,
            settings.window_days,
            settings.multiplier,
        ),
    }
}

fn run_outlier(
    log: &CsvPriceLog,
    config: &dyn ConfigPort,
    args: &OutlierArgs,
) -> Result<(), KimchiError> {
    let today = chrono::Local::now().date_naive();
    let settings = build_outlier_settings(config, args, today);

    let live = args.domestic.is_some() || args.international.is_some() || args.rate.is_some();
    let quote = live.then(|| {
        ManualQuoteAdapter::new(
            args.as_of.unwrap_or(today),
            args.domestic,
            args.international,
            args.rate,
        )
    });

    let analysis = execute_outlier(log, quote.as_ref().map(|q| q as &dyn QuotePort), &settings)?;

    println!("{}", analysis.verdict);
    if let (Some(bounds), Some(date), Some(value)) =
        (analysis.bounds, analysis.latest_date, analysis.latest_value)
    {
        println!(
            "{date}: premium {value:.2}%, range [{:.2}%, {:.2}%] over {} points",
            bounds.lower_bound, bounds.upper_bound, analysis.sample_size
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// backtest

fn resolve_start_date(
    explicit: Option<NaiveDate>,
    config: &dyn ConfigPort,
    section: &str,
    series: &[PriceRecord],
) -> Result<NaiveDate, KimchiError> {
    explicit
        .or_else(|| config.get_date(section, "start_date"))
        .or_else(|| series.first().map(|r| r.date))
        .ok_or_else(|| KimchiError::configuration("price series is empty"))
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    args: &BacktestArgs,
    series: &[PriceRecord],
) -> Result<BacktestConfig, KimchiError> {
    Ok(BacktestConfig {
        start_date: resolve_start_date(args.start_date, config, "backtest", series)?,
        buy_threshold: args.buy_threshold.unwrap_or_else(|| {
            config.get_double("backtest", "buy_threshold", DEFAULT_BUY_THRESHOLD)
        }),
        sell_threshold: args.sell_threshold.unwrap_or_else(|| {
            config.get_double("backtest", "sell_threshold", DEFAULT_SELL_THRESHOLD)
        }),
        initial_investment: args.investment.unwrap_or_else(|| {
            config.get_double("backtest", "initial_investment", DEFAULT_INITIAL_INVESTMENT)
        }),
        reentry_band: config.get_double("backtest", "reentry_band", DEFAULT_REENTRY_BAND),
        force_initial_entry: config.get_bool("backtest", "force_initial_entry", true),
        commission_pct: config.get_double("backtest", "commission_pct", 0.0),
        slippage_pct: config.get_double("backtest", "slippage_pct", 0.0),
    })
}

pub fn execute_backtest(
    port: &dyn PriceSeriesPort,
    config: &dyn ConfigPort,
    args: &BacktestArgs,
) -> Result<(BacktestConfig, BacktestResult), KimchiError> {
    let series = load_all(port)?;
    let bt_config = build_backtest_config(config, args, &series)?;
    tracing::info!(
        "running backtest from {} over {} rows (buy <= {}%, sell >= {}%)",
        bt_config.start_date,
        series.len(),
        bt_config.buy_threshold,
        bt_config.sell_threshold
    );
    let result = backtest_engine::run_backtest(&series, &bt_config)?;
    Ok((bt_config, result))
}

fn run_backtest(
    log: &CsvPriceLog,
    config: &dyn ConfigPort,
    args: &BacktestArgs,
) -> Result<(), KimchiError> {
    let (bt_config, result) = execute_backtest(log, config, args)?;

    println!("=== Trades ===");
    for trade in &result.trades {
        let pnl = trade
            .realized_pnl
            .map(|p| format!(", P&L {} KRW", format_krw(p)))
            .unwrap_or_default();
        println!(
            "{} {:<4} {:>12.2} KRW/g  {:>10.4} g  cash {:>14} KRW  premium {:+.2}%{}",
            trade.date,
            trade.action,
            trade.price_per_gram,
            trade.quantity_grams,
            format_krw(trade.cash_balance),
            trade.premium_percent,
            pnl
        );
    }

    print_summary(&bt_config, &result);

    if let Some(path) = &args.trades_out {
        CsvReportAdapter.write_trades(&result, path)?;
        println!("\nTrade log written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(bt_config: &BacktestConfig, result: &BacktestResult) {
    let metrics = Metrics::compute(result);

    println!("\n=== Backtest Results ===");
    println!(
        "Thresholds:          buy <= {:+.2}%, sell >= {:+.2}%",
        bt_config.buy_threshold, bt_config.sell_threshold
    );
    println!("Start date:          {}", bt_config.start_date);
    println!("Initial investment:  {} KRW", format_krw(result.initial_investment));
    println!("Final value:         {} KRW", format_krw(result.final_portfolio_value));
    println!("Total return:        {} KRW", format_krw(result.total_return_amount));
    println!("Return rate:         {:.2}%", result.total_return_percent);
    println!("Trades:              {}", result.trade_count);
    if result.trade_count > 0 {
        println!(
            "Avg return / trade:  {} KRW",
            format_krw(result.average_return_per_trade)
        );
    }
    println!(
        "Round trips:         {} ({:.1}% won)",
        metrics.round_trips,
        metrics.win_rate * 100.0
    );
    println!("Max drawdown:        -{:.2}%", metrics.max_drawdown * 100.0);
}

// ---------------------------------------------------------------------------
// optimize

pub fn build_optimizer_config(
    config: &dyn ConfigPort,
    args: &OptimizeArgs,
    series: &[PriceRecord],
) -> Result<OptimizerConfig, KimchiError> {
    let explicit = args
        .start_date
        .or_else(|| config.get_date("optimizer", "start_date"));
    let start_date = resolve_start_date(explicit, config, "backtest", series)?;

    Ok(OptimizerConfig {
        start_date,
        min_threshold: args.min_threshold.unwrap_or_else(|| {
            config.get_double("optimizer", "min_threshold", DEFAULT_MIN_THRESHOLD)
        }),
        max_threshold: args.max_threshold.unwrap_or_else(|| {
            config.get_double("optimizer", "max_threshold", DEFAULT_MAX_THRESHOLD)
        }),
        step: args
            .step
            .unwrap_or_else(|| config.get_double("optimizer", "step", DEFAULT_STEP)),
        initial_investment: args.investment.unwrap_or_else(|| {
            config.get_double("backtest", "initial_investment", DEFAULT_INITIAL_INVESTMENT)
        }),
        reentry_band: config.get_double("backtest", "reentry_band", DEFAULT_REENTRY_BAND),
        force_initial_entry: config.get_bool("backtest", "force_initial_entry", true),
        commission_pct: config.get_double("backtest", "commission_pct", 0.0),
        slippage_pct: config.get_double("backtest", "slippage_pct", 0.0),
    })
}

pub fn execute_optimize(
    port: &dyn PriceSeriesPort,
    config: &dyn ConfigPort,
    args: &OptimizeArgs,
) -> Result<Vec<OptimizationEntry>, KimchiError> {
    let series = load_all(port)?;
    let opt_config = build_optimizer_config(config, args, &series)?;
    optimizer::search(&series, &opt_config)
}

fn run_optimize(
    log: &CsvPriceLog,
    config: &dyn ConfigPort,
    args: &OptimizeArgs,
) -> Result<(), KimchiError> {
    let entries = execute_optimize(log, config, args)?;
    let top = args
        .top
        .unwrap_or_else(|| config.get_int("optimizer", "top", DEFAULT_TOP as i64).max(1) as usize);

    println!(
        "{:<4} {:>9} {:>10} {:>16} {:>16} {:>7}",
        "rank", "threshold", "return", "profit", "final value", "trades"
    );
    for (i, entry) in entries.iter().take(top).enumerate() {
        println!(
            "{:<4} {:>9} {:>9.2}% {:>16} {:>16} {:>7}",
            i + 1,
            format!("±{:.2}%", entry.threshold),
            entry.result.total_return_percent,
            format_krw(entry.result.total_return_amount),
            format_krw(entry.result.final_portfolio_value),
            entry.result.trade_count
        );
    }

    if let Some(best) = entries.first() {
        println!("\n=== Best Threshold ===");
        println!(
            "Buy <= {:+.2}%, sell >= {:+.2}%",
            best.buy_threshold(),
            best.sell_threshold()
        );
        println!("Return rate:         {:.2}%", best.result.total_return_percent);
        println!("Total return:        {} KRW", format_krw(best.result.total_return_amount));
        println!("Trades:              {}", best.result.trade_count);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// record / info

/// Append the quotes for one day. `None` when that day is already logged.
pub fn execute_record(
    log: &CsvPriceLog,
    args: &RecordArgs,
) -> Result<Option<PriceRecord>, KimchiError> {
    let date = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    if log.is_date_logged(date)? {
        tracing::info!("{} already logged, skipping", date);
        return Ok(None);
    }
    let record = PriceRecord::from_quotes(date, args.domestic, args.international, args.rate)?;
    log.append_record(&record)?;
    Ok(Some(record))
}

fn run_record(log: &CsvPriceLog, args: &RecordArgs) -> Result<(), KimchiError> {
    let Some(record) = execute_record(log, args)? else {
        println!("Already recorded for this date.");
        return Ok(());
    };
    println!("Domestic gold:        {:>14.2} KRW/g", record.domestic_price_per_gram);
    println!(
        "International (conv): {:>14.2} KRW/g",
        record.international_price_per_gram_krw
    );
    println!(
        "Kimchi premium:       {:>14.2} KRW/g ({:+.2}%)",
        record.premium_amount, record.premium_percent
    );
    Ok(())
}

fn run_info(log: &CsvPriceLog) -> Result<(), KimchiError> {
    match log.date_range()? {
        Some((first, last, count)) => {
            println!("{}: {} rows, {} to {}", log.path().display(), count, first, last)
        }
        None => println!("{}: no data", log.path().display()),
    }
    Ok(())
}

/// Whole won with thousands separators.
pub fn format_krw(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}
