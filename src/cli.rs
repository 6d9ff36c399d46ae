//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_adapter::CsvSeriesAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    read_strategy_params, validate_data_config, validate_strategy_config, validate_sweep_config,
};
use crate::domain::error::MeanrevError;
use crate::domain::fee::FeeSchedule;
use crate::domain::params::StrategyParams;
use crate::domain::quarter::parse_years;
use crate::domain::result::{format_rate, BacktestResult};
use crate::domain::simulator::run_backtest;
use crate::domain::state::LastMove;
use crate::domain::sweep::{run_sweep, run_sweep_with_threads, ParameterGrid, SweepOutcome};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::series_port::SeriesPort;

const DEFAULT_SWEEP_TOP: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "meanrev", about = "Mean-reversion strategy backtester")]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Series CSV, overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Comma-separated years, overrides [data] years
        #[arg(short, long)]
        years: Option<String>,
        /// Report directory, overrides [output] directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a parameter sweep
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        years: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Worker threads, overrides [sweep] threads
        #[arg(short, long)]
        threads: Option<usize>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the time range of a series
    Info {
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("warning: failed to set tracing subscriber: {e}");
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            years,
            output,
        } => run_backtest_command(&config, data.as_deref(), years.as_deref(), output.as_deref()),
        Command::Sweep {
            config,
            data,
            years,
            output,
            threads,
        } => run_sweep_command(
            &config,
            data.as_deref(),
            years.as_deref(),
            output.as_deref(),
            threads,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data, config } => run_info(data.as_deref(), config.as_deref()),
    }
}

fn fail(err: MeanrevError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Read and validate the run parameters from `config`.
pub fn build_params(config: &dyn ConfigPort) -> Result<StrategyParams, MeanrevError> {
    let params = read_strategy_params(config);
    params.validate()?;
    Ok(params)
}

/// `[fees] tiers` when present, otherwise the exchange's published schedule.
pub fn build_fee_schedule(config: &dyn ConfigPort) -> Result<FeeSchedule, MeanrevError> {
    match config.get_string("fees", "tiers") {
        Some(tiers) if !tiers.trim().is_empty() => FeeSchedule::parse(&tiers),
        _ => Ok(FeeSchedule::default()),
    }
}

fn parse_list<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Vec<T>, MeanrevError> {
    config
        .get_list("sweep", key)
        .iter()
        .map(|v| {
            v.parse::<T>().map_err(|_| MeanrevError::ConfigInvalid {
                section: "sweep".into(),
                key: key.into(),
                reason: format!("'{}' could not be parsed", v),
            })
        })
        .collect()
}

pub fn build_grid(config: &dyn ConfigPort) -> Result<ParameterGrid, MeanrevError> {
    Ok(ParameterGrid {
        ma_length: parse_list(config, "ma_length")?,
        buy_threshold: parse_list(config, "buy_threshold")?,
        take_profit: parse_list(config, "take_profit")?,
        stop_loss: parse_list(config, "stop_loss")?,
        order_sizing: parse_list(config, "order_sizing")?,
    })
}

/// The `--years` flag wins over `[data] years`; neither means the whole file.
pub fn resolve_years(
    years_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Option<Vec<i32>>, MeanrevError> {
    match years_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "years"))
    {
        Some(s) => parse_years(&s).map(Some),
        None => Ok(None),
    }
}

pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, MeanrevError> {
    if let Some(path) = data_override {
        return Ok(path.to_path_buf());
    }
    config
        .get_string("data", "path")
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| MeanrevError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

pub fn resolve_output_dir(
    output_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Option<PathBuf> {
    output_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("output", "directory").map(PathBuf::from))
}

/// Fetch, simulate and (optionally) report one backtest.
pub fn run_backtest_pipeline(
    series_port: &dyn SeriesPort,
    params: &StrategyParams,
    fees: &FeeSchedule,
    years: Option<&[i32]>,
    report: Option<&dyn ReportPort>,
) -> Result<BacktestResult, MeanrevError> {
    let series = series_port.fetch_series(years)?;
    eprintln!(
        "Running backtest: {} points, moving average over {}",
        series.len(),
        params.ma_length
    );

    let result = run_backtest(&series, params, fees)?;

    if params.display_results {
        print_summary(&result);
    }

    if let Some(report) = report {
        report.write(&result)?;
    }
    Ok(result)
}

/// Fetch once, expand the grid and run every parameter set.
pub fn run_sweep_pipeline(
    series_port: &dyn SeriesPort,
    base: &StrategyParams,
    grid: &ParameterGrid,
    fees: &FeeSchedule,
    years: Option<&[i32]>,
    threads: Option<usize>,
    report: Option<&dyn ReportPort>,
) -> Result<Vec<SweepOutcome>, MeanrevError> {
    let series = series_port.fetch_series(years)?;
    let runs = grid.expand(base);
    eprintln!(
        "Running sweep: {} parameter sets over {} points",
        runs.len(),
        series.len()
    );

    let outcomes = match threads {
        Some(n) => run_sweep_with_threads(&series, &runs, fees, n)?,
        None => run_sweep(&series, &runs, fees),
    };

    if let Some(report) = report {
        report.write_sweep(&outcomes)?;
    }
    Ok(outcomes)
}

pub fn print_summary(result: &BacktestResult) {
    if !result.quarters.is_empty() {
        eprintln!("\n=== Quarterly Results ===");
        eprintln!(
            "  {:>7}  {:>10}  {:>10}  {:>7}  {:>8}",
            "Quarter", "Return", "Baseline", "Trades", "Hit Rate"
        );
        for q in &result.quarters {
            eprintln!(
                "  {:>7}  {:>9.2}%  {:>9.2}%  {:>7}  {:>8}",
                q.quarter,
                q.return_rate * 100.0,
                q.baseline_return_rate * 100.0,
                q.trades,
                format_rate(q.hit_rate),
            );
        }
    }

    eprintln!("\n=== Aggregate Results ===");
    eprintln!(
        "Final Return:        {:.2}%",
        result.final_return_rate * 100.0
    );
    eprintln!(
        "Baseline Return:     {:.2}%",
        result.baseline_return_rate * 100.0
    );
    eprintln!("Hit Rate:            {}", format_rate(result.hit_rate));
    eprintln!(
        "Beating Baseline:    {}",
        format_rate(result.quarters_beating_baseline)
    );
    eprintln!(
        "Strategy Stdev:      {}",
        format_rate(result.strategy_quarterly_stdev)
    );
    eprintln!(
        "Baseline Stdev:      {}",
        format_rate(result.baseline_quarterly_stdev)
    );
    eprintln!(
        "Trades:              {} ({} buy, {} sell, {} short)",
        result.total_trades,
        result.count_moves(LastMove::Buy),
        result.count_moves(LastMove::Sell),
        result.count_moves(LastMove::ShortSell),
    );
}

fn print_sweep(outcomes: &[SweepOutcome], top: usize) {
    eprintln!("\n=== Top {} of {} runs ===", top.min(outcomes.len()), outcomes.len());
    for (rank, o) in outcomes.iter().take(top).enumerate() {
        eprintln!(
            "  {:>3}. ma={:<5} buy={:<6} tp={:<6} sl={:<6} size={:<5} return {:>8.2}% (baseline {:.2}%), {} trades",
            rank + 1,
            o.ma_length,
            o.buy_threshold,
            o.take_profit,
            o.stop_loss,
            o.order_sizing,
            o.final_return_rate * 100.0,
            o.baseline_return_rate * 100.0,
            o.total_trades,
        );
    }
}

fn run_backtest_command(
    config_path: &Path,
    data_override: Option<&Path>,
    years_override: Option<&str>,
    output_override: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Validate and build parameters
    if let Err(e) = validate_strategy_config(&config) {
        return fail(e);
    }
    let params = match build_params(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let fees = match build_fee_schedule(&config) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };

    // Stage 3: Resolve data source
    let data_path = match resolve_data_path(data_override, &config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let years = match resolve_years(years_override, &config) {
        Ok(y) => y,
        Err(e) => return fail(e),
    };
    eprintln!("Loading series from {}", data_path.display());
    let series_port = CsvSeriesAdapter::new(data_path);

    // Stage 4: Simulate and report
    let report = resolve_output_dir(output_override, &config).map(CsvReportAdapter::new);
    let result = run_backtest_pipeline(
        &series_port,
        &params,
        &fees,
        years.as_deref(),
        report.as_ref().map(|r| r as &dyn ReportPort),
    );

    match result {
        Ok(result) => {
            if !params.display_results {
                eprintln!(
                    "Final return {:.2}% vs baseline {:.2}% over {} steps",
                    result.final_return_rate * 100.0,
                    result.baseline_return_rate * 100.0,
                    result.steps
                );
            }
            if let Some(report) = &report {
                eprintln!("\nReport written to: {}", report.directory().display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_sweep_command(
    config_path: &Path,
    data_override: Option<&Path>,
    years_override: Option<&str>,
    output_override: Option<&Path>,
    threads_override: Option<usize>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_strategy_config(&config).and_then(|_| validate_sweep_config(&config))
    {
        return fail(e);
    }
    let base = match build_params(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let grid = match build_grid(&config) {
        Ok(g) => g,
        Err(e) => return fail(e),
    };
    let fees = match build_fee_schedule(&config) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };

    let data_path = match resolve_data_path(data_override, &config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let years = match resolve_years(years_override, &config) {
        Ok(y) => y,
        Err(e) => return fail(e),
    };
    let threads = threads_override.or_else(|| {
        config
            .get_list("sweep", "threads")
            .first()
            .and_then(|t| t.parse().ok())
    });
    let top = config
        .get_list("sweep", "top")
        .first()
        .and_then(|t| t.parse().ok())
        .unwrap_or(DEFAULT_SWEEP_TOP);

    let series_port = CsvSeriesAdapter::new(data_path);
    let report = resolve_output_dir(output_override, &config).map(CsvReportAdapter::new);

    match run_sweep_pipeline(
        &series_port,
        &base,
        &grid,
        &fees,
        years.as_deref(),
        threads,
        report.as_ref().map(|r| r as &dyn ReportPort),
    ) {
        Ok(outcomes) => {
            print_sweep(&outcomes, top);
            if let Some(report) = &report {
                eprintln!("\nSweep written to: {}", report.directory().display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let checks = validate_data_config(&config)
        .and_then(|_| validate_strategy_config(&config))
        .and_then(|_| validate_sweep_config(&config));
    if let Err(e) = checks {
        return fail(e);
    }

    let params = match build_params(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let grid = match build_grid(&config) {
        Ok(g) => g,
        Err(e) => return fail(e),
    };

    eprintln!("\nStrategy:");
    eprintln!("  Moving average:  {} steps", params.ma_length);
    eprintln!("  Capital:         {}", params.starting_capital);
    eprintln!("  Order sizing:    {}", params.order_sizing);
    eprintln!(
        "  Thresholds:      buy {} / take profit {} / stop loss {}",
        params.buy_threshold, params.take_profit, params.stop_loss
    );
    eprintln!("  Shorting:        {}", params.shorting_allowed);
    if params.fixed_fee {
        eprintln!("  Fee:             fixed {}", params.fee);
    } else {
        eprintln!("  Fee:             tiered by 30-day volume");
    }
    if params.annual_taxes {
        eprintln!("  Taxes:           {} on annual gains", params.tax_percentage);
    }
    let runs = grid.expand(&params).len();
    if runs > 1 {
        eprintln!("  Sweep:           {} parameter sets", runs);
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(data_path: Option<&Path>, config_path: Option<&Path>) -> ExitCode {
    let path = match (data_path, config_path) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(c)) => {
            let config = match load_config(c) {
                Ok(c) => c,
                Err(code) => return code,
            };
            match resolve_data_path(None, &config) {
                Ok(p) => p,
                Err(e) => return fail(e),
            }
        }
        (None, None) => {
            eprintln!("error: --data or --config is required for info");
            return ExitCode::from(1);
        }
    };

    let adapter = CsvSeriesAdapter::new(path.clone());
    match adapter.data_range() {
        Ok(Some((first, last, count))) => {
            println!("{}: {} points, {} to {}", path.display(), count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
