//! CLI definition and dispatch.
//!
//! Command output goes to stdout; progress and diagnostics go through
//! `tracing` to stderr.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::analysis::{Analyzer, BranchAnalysis, BranchOverview};
use crate::domain::branch::{BranchName, branches_for_ticker};
use crate::domain::config_validation::{
    ParamOverrides, build_analysis_settings, build_equity_settings, build_overview_settings,
    data_base_path, validate_config,
};
use crate::domain::equity::{EquityCurve, build_equity_curve};
use crate::domain::error::SlopeFilterError;
use crate::domain::series::date_range;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "slopefilter",
    version,
    about = "Oscillator-triggered, slope-confirmed signal backtester"
)]
pub struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Signal parameter overrides shared by `analyze` and `overview`.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Slope regression window in trading days
    #[arg(long)]
    pub window: Option<usize>,
    /// Slope percentage that counts as an uptrend
    #[arg(long, allow_hyphen_values = true)]
    pub pos_threshold: Option<f64>,
    /// Slope percentage for downtrends; validated but not read by any mode
    #[arg(long, allow_hyphen_values = true)]
    pub neg_threshold: Option<f64>,
    /// both, oscillator (rsi) or slope
    #[arg(long)]
    pub mode: Option<String>,
}

impl From<ParamArgs> for ParamOverrides {
    fn from(args: ParamArgs) -> Self {
        ParamOverrides {
            slope_window: args.window,
            pos_threshold: args.pos_threshold,
            neg_threshold: args.neg_threshold,
            mode: args.mode,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the signal engine on one branch
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        branch: String,
        #[command(flatten)]
        params: ParamArgs,
        /// Write a JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyse every branch in parallel, best return first
    Overview {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build the equity curve described by [equity]
    Equity {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List tickers with price data
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List branches, optionally for one ticker
    ListBranches {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Show the date range of a return dataset
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        dataset: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze {
            config,
            branch,
            params,
            output,
        } => run_analyze(&config, &branch, params.into(), output.as_deref()),
        Command::Overview {
            config,
            params,
            output,
        } => run_overview(&config, params.into(), output.as_deref()),
        Command::Equity { config, output } => run_equity(&config, output.as_deref()),
        Command::ListTickers { config } => run_list_tickers(&config),
        Command::ListBranches { config, ticker } => run_list_branches(&config, ticker.as_deref()),
        Command::Info { config, dataset } => run_info(&config, &dataset),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SlopeFilterError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn open_data(config: &dyn ConfigPort) -> CsvAdapter {
    let base = data_base_path(config);
    info!(base_path = %base.display(), "using CSV data");
    CsvAdapter::new(base)
}

// ---------------------------------------------------------------------------
// Pipelines: everything after config loading, over any DataPort.
// ---------------------------------------------------------------------------

pub fn analyze_pipeline(
    data: &dyn DataPort,
    config: &dyn ConfigPort,
    branch: &str,
    overrides: &ParamOverrides,
    output: Option<&Path>,
) -> Result<BranchAnalysis, SlopeFilterError> {
    let settings = build_analysis_settings(config, overrides)?;
    let analyzer = Analyzer::new(data, 1, settings.risk_free_rate);
    let analysis = analyzer.analyze(branch, &settings.params)?;

    if let Some(path) = output {
        JsonReportAdapter.write_analysis(&analysis, path)?;
    }
    Ok(analysis)
}

pub fn overview_pipeline(
    data: &dyn DataPort,
    config: &dyn ConfigPort,
    overrides: &ParamOverrides,
    output: Option<&Path>,
) -> Result<Vec<BranchOverview>, SlopeFilterError> {
    let settings = build_analysis_settings(config, overrides)?;
    let overview = build_overview_settings(config)?;

    let branches = data.list_branches()?;
    if branches.is_empty() {
        warn!("no branches found");
    }

    let analyzer = Analyzer::new(data, overview.cache_size, settings.risk_free_rate);
    let rows = analyzer.overview(&branches, &settings.params, overview.workers)?;

    if let Some(path) = output {
        JsonReportAdapter.write_overview(&rows, path)?;
    }
    Ok(rows)
}

pub fn equity_pipeline(
    data: &dyn DataPort,
    config: &dyn ConfigPort,
    output: Option<&Path>,
) -> Result<EquityCurve, SlopeFilterError> {
    let settings = build_equity_settings(config)?;

    let primary = data.fetch_daily_returns(&settings.returns)?;
    let live = settings
        .live_returns
        .as_deref()
        .map(|name| data.fetch_daily_returns(name))
        .transpose()?;
    let benchmark = settings
        .benchmark
        .as_deref()
        .map(|name| data.fetch_benchmark(name))
        .transpose()?;
    info!(
        returns = %settings.returns,
        points = primary.len(),
        live = live.as_ref().map_or(0, Vec::len),
        benchmark = benchmark.as_ref().map_or(0, Vec::len),
        "equity inputs loaded"
    );

    let curve = build_equity_curve(
        &primary,
        &settings.curve,
        live.as_deref(),
        benchmark.as_deref(),
    );

    if let Some(path) = output {
        JsonReportAdapter.write_equity(&curve, path)?;
    }
    Ok(curve)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_analyze(
    config_path: &Path,
    branch: &str,
    overrides: ParamOverrides,
    output: Option<&Path>,
) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    let data = open_data(&config);
    let analysis = analyze_pipeline(&data, &config, branch, &overrides, output)?;
    print!("{}", format_analysis(&analysis));
    Ok(())
}

fn run_overview(
    config_path: &Path,
    overrides: ParamOverrides,
    output: Option<&Path>,
) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    let data = open_data(&config);
    let rows = overview_pipeline(&data, &config, &overrides, output)?;
    print!("{}", format_overview(&rows));
    Ok(())
}

fn run_equity(config_path: &Path, output: Option<&Path>) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    let data = open_data(&config);
    let curve = equity_pipeline(&data, &config, output)?;
    print!("{}", format_equity(&curve));
    Ok(())
}

fn run_list_tickers(config_path: &Path) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    let tickers = open_data(&config).list_tickers()?;
    for ticker in &tickers {
        println!("{ticker}");
    }
    info!(count = tickers.len(), "tickers listed");
    Ok(())
}

fn run_list_branches(config_path: &Path, ticker: Option<&str>) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    let branches = open_data(&config).list_branches()?;
    let selected: Vec<&String> = match ticker {
        Some(t) => branches_for_ticker(&branches, t),
        None => branches.iter().collect(),
    };
    for branch in &selected {
        println!("{}", format_branch_line(branch));
    }
    info!(count = selected.len(), "branches listed");
    Ok(())
}

fn run_info(config_path: &Path, dataset: &str) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    let returns = open_data(&config).fetch_daily_returns(dataset)?;
    match date_range(&returns, |r| r.date) {
        Some((first, last)) => println!("{dataset}: {} days, {first} to {last}", returns.len()),
        None => println!("{dataset}: no data"),
    }
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), SlopeFilterError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;
    println!("Configuration is valid.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Console formatting
// ---------------------------------------------------------------------------

pub fn format_analysis(analysis: &BranchAnalysis) -> String {
    let mut out = String::new();
    let p = &analysis.params;
    out.push_str(&format!("=== {} ({}) ===\n", analysis.branch, analysis.ticker));
    out.push_str(&format!(
        "mode: {}, window: {}, pos_threshold: {}, neg_threshold: {}\n",
        p.mode, p.slope_window, p.pos_threshold, p.neg_threshold
    ));

    let Some(m) = &analysis.metrics else {
        out.push_str("\nNo completed trades.\n");
        return out;
    };

    out.push_str(&format!("\nTotal Return:     {:.2}%\n", m.total_return));
    out.push_str(&format!("Win Rate:         {:.2}%\n", m.win_rate));
    out.push_str(&format!("Max Drawdown:     {:.2}%\n", m.max_drawdown));
    out.push_str(&format!("Trades:           {}\n", m.num_trades));
    out.push_str(&format!("Time in Market:   {:.2}%\n", m.time_in_market));
    out.push_str(&format!("Avg Days Held:    {:.2}\n", m.avg_days_held));
    out.push_str(&format!("Avg Return:       {:.2}%\n", m.avg_return));
    out.push_str(&format!("Sharpe Ratio:     {:.2}\n", m.sharpe_ratio));
    out.push_str(&format!("Volatility:       {:.2}\n", m.volatility));

    out.push_str("\n=== Trades ===\n");
    for t in &analysis.signals.trades {
        out.push_str(&format!(
            "  {} -> {}  {:>10.2} -> {:>10.2}  {:>7.2}%  {:>4}d  {}\n",
            t.entry_date, t.exit_date, t.entry_price, t.exit_price, t.return_pct, t.days_held, t.entry_type
        ));
    }
    if analysis.signals.open_position_at_end() {
        out.push_str("  (position still open at end of data)\n");
    }

    out.push_str("\n=== Yearly ===\n");
    for y in &analysis.yearly {
        out.push_str(&format!(
            "  {}: {:>7.2}%  max dd {:>7.2}%  {} trades  avg hold {:.1}d\n",
            y.year, y.return_pct, y.max_drawdown, y.trades, y.avg_hold
        ));
    }
    out
}

pub fn format_overview(rows: &[BranchOverview]) -> String {
    let mut out = format!(
        "{:<8} {:<40} {:<24} {:>9} {:>8} {:>7} {:>8} {:>6} {:>7} {:>7}\n",
        "Ticker", "Branch", "Period", "Return%", "CAGR%", "Win%", "MaxDD%", "Trades", "Sharpe", "InMkt%"
    );
    for r in rows {
        out.push_str(&format!(
            "{:<8} {:<40} {:<24} {:>9.2} {:>8.2} {:>7.2} {:>8.2} {:>6} {:>7.2} {:>7.2}\n",
            r.ticker,
            r.branch,
            r.period,
            r.return_pct,
            r.cagr,
            r.win_rate,
            r.max_drawdown,
            r.trades,
            r.sharpe,
            r.time_in_market
        ));
    }
    out.push_str(&format!("{} branches\n", rows.len()));
    out
}

/// `branch<TAB>ticker<TAB>condition`, with `-` columns for names outside
/// the branch convention.
pub fn format_branch_line(branch: &str) -> String {
    match BranchName::parse(branch) {
        Ok(name) => format!("{branch}\t{}\t{}", name.ticker, name.condition()),
        Err(_) => format!("{branch}\t-\t-"),
    }
}

pub fn format_equity(curve: &EquityCurve) -> String {
    let (Some(first), Some(last)) = (curve.points.first(), curve.points.last()) else {
        return "No equity data in range.\n".to_string();
    };

    let mut out = String::new();
    out.push_str(&format!("Period:        {} to {}\n", first.date, last.date));
    out.push_str(&format!("Final Equity:  {:.2}\n", last.equity));
    out.push_str(&format!("Max Drawdown:  {:.2}%\n", curve.max_drawdown_pct()));
    if let Some(live) = curve.points.iter().find(|p| p.is_live) {
        out.push_str(&format!("Live Since:    {}\n", live.date));
    }
    if let Some(bench) = last.benchmark_equity {
        out.push_str(&format!("Benchmark:     {:.2}\n", bench));
    }

    out.push_str("\n=== Yearly ===\n");
    for y in &curve.yearly {
        out.push_str(&format!(
            "  {}: {:>8.2}%  max dd {:>6.2}%  {:>12.2} -> {:>12.2}\n",
            y.year, y.profit_pct, y.max_drawdown_pct, y.start_equity, y.end_equity
        ));
    }
    out
}
