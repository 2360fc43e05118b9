//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{self, validate_config};
use crate::domain::error::MeanrevError;
use crate::domain::metrics::Metrics;
use crate::domain::price_history::PriceHistory;
use crate::domain::simulator::{run_simulation, SimulationConfig, SimulationResult};
use crate::domain::universe::{load_universe, parse_codes, LoadedUniverse};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_EQUITY_PATH: &str = "equity.csv";
pub const DEFAULT_SNAPSHOT_PATH: &str = "snapshot.csv";

#[derive(Parser, Debug)]
#[command(
    name = "meanrev",
    about = "Daily cross-sectional mean-reversion portfolio simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation and write the equity curve and snapshot reports
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory for the report files
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Comma-separated instrument codes
        #[arg(long)]
        codes: Option<String>,
        /// Validate config and data without simulating
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show data range for instrument(s)
    Info {
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// Where the two report files go.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub equity: PathBuf,
    pub snapshot: PathBuf,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Run {
            config,
            output,
            data_dir,
            codes,
            dry_run,
        } => run_command(
            &config,
            output.as_deref(),
            data_dir.as_deref(),
            codes.as_deref(),
            dry_run,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config, data_dir } => {
            run_list_symbols(config.as_deref(), data_dir.as_deref())
        }
        Command::Info {
            code,
            config,
            data_dir,
        } => run_info(code.as_deref(), config.as_deref(), data_dir.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, MeanrevError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn build_simulation_config(config: &dyn ConfigPort) -> Result<SimulationConfig, MeanrevError> {
    config_validation::validate_simulation_config(config)?;

    let start_date = config_validation::parse_date(config, "start_date")?;
    let end_date = config_validation::parse_date(config, "end_date")?;
    let initial_capital = config.get_double("simulation", "initial_capital", 0.0);

    let mut sim_config = SimulationConfig::new(start_date, end_date, initial_capital)
        .with_parallelism(config.get_bool("simulation", "parallel", true));
    sim_config.risk_free_rate = config.get_double("simulation", "risk_free_rate", 0.0);
    Ok(sim_config)
}

/// Data directory from the override, else `[data] dir`.
pub fn resolve_data_dir(
    override_dir: Option<&Path>,
    config: Option<&dyn ConfigPort>,
) -> Result<PathBuf, MeanrevError> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }
    config
        .and_then(|c| c.get_string("data", "dir"))
        .map(PathBuf::from)
        .ok_or_else(|| MeanrevError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

/// Instrument list from the override, else `[data] codes`, else everything the
/// data port lists.
pub fn resolve_codes(
    override_codes: Option<&str>,
    config: &dyn ConfigPort,
    data_port: &dyn PriceDataPort,
) -> Result<Vec<String>, MeanrevError> {
    let configured = override_codes
        .map(str::to_string)
        .or_else(|| config.get_string("data", "codes"));

    let codes = match configured {
        Some(raw) => parse_codes(&raw).map_err(|e| MeanrevError::ConfigInvalid {
            section: "data".into(),
            key: "codes".into(),
            reason: e.to_string(),
        })?,
        None => data_port.list_instruments()?,
    };

    if codes.is_empty() {
        return Err(MeanrevError::Data {
            reason: "no instruments to simulate".into(),
        });
    }
    Ok(codes)
}

/// Report paths from `[report]`; an output directory keeps the file names and
/// replaces their location.
pub fn resolve_report_paths(config: &dyn ConfigPort, output_dir: Option<&Path>) -> ReportPaths {
    let equity = config
        .get_string("report", "equity_path")
        .unwrap_or_else(|| DEFAULT_EQUITY_PATH.to_string());
    let snapshot = config
        .get_string("report", "snapshot_path")
        .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string());

    let place = |configured: String, default: &str| -> PathBuf {
        let path = PathBuf::from(configured);
        match output_dir {
            Some(dir) => dir.join(
                path.file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(default)),
            ),
            None => path,
        }
    };

    ReportPaths {
        equity: place(equity, DEFAULT_EQUITY_PATH),
        snapshot: place(snapshot, DEFAULT_SNAPSHOT_PATH),
    }
}

fn run_command(
    config_path: &Path,
    output_dir: Option<&Path>,
    data_dir: Option<&Path>,
    codes_override: Option<&str>,
    dry_run: bool,
) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    let sim_config = build_simulation_config(&config)?;
    let dir = resolve_data_dir(data_dir, Some(&config))?;
    let data_port = CsvAdapter::new(dir);
    let codes = resolve_codes(codes_override, &config, &data_port)?;

    if dry_run {
        return run_dry_run(&data_port, &sim_config, codes);
    }

    let paths = resolve_report_paths(&config, output_dir);
    run_pipeline(&data_port, &CsvReportAdapter::new(), &sim_config, codes, &paths)?;
    Ok(())
}

/// Load the universe and check it without simulating.
pub fn run_dry_run(
    data_port: &dyn PriceDataPort,
    sim_config: &SimulationConfig,
    codes: Vec<String>,
) -> Result<(), MeanrevError> {
    let loaded = load_history(data_port, sim_config, codes)?;
    let history = PriceHistory::from_series(loaded.series)?;
    let days = history.trading_days(sim_config.start_date, sim_config.end_date);

    eprintln!("\nUniverse:");
    eprintln!("  instruments: {}", loaded.universe.instruments.join(", "));
    for skipped in &loaded.skipped {
        eprintln!("  skipped: {} ({:?})", skipped.instrument, skipped.reason);
    }
    eprintln!("  trading days: {}", days.len());
    eprintln!("\nDry run complete: configuration and data are valid");
    Ok(())
}

fn load_history(
    data_port: &dyn PriceDataPort,
    sim_config: &SimulationConfig,
    codes: Vec<String>,
) -> Result<LoadedUniverse, MeanrevError> {
    eprintln!(
        "Validating {} instruments, {} to {}...",
        codes.len(),
        sim_config.start_date,
        sim_config.end_date
    );
    load_universe(data_port, codes, sim_config.start_date, sim_config.end_date)
}

/// Load, simulate, summarize and write both reports.
pub fn run_pipeline(
    data_port: &dyn PriceDataPort,
    report_port: &dyn ReportPort,
    sim_config: &SimulationConfig,
    codes: Vec<String>,
    paths: &ReportPaths,
) -> Result<SimulationResult, MeanrevError> {
    let loaded = load_history(data_port, sim_config, codes)?;
    let history = PriceHistory::from_series(loaded.series)?;

    eprintln!(
        "Running simulation: {} instruments, {} trading days",
        history.instrument_count(),
        history
            .trading_days(sim_config.start_date, sim_config.end_date)
            .len()
    );

    let result = run_simulation(&history, sim_config)?;
    let metrics = Metrics::compute(&result, sim_config.risk_free_rate);
    print_summary(&result, &metrics);

    report_port.write_equity_curve(&result, &paths.equity)?;
    info!(path = %paths.equity.display(), "equity curve written");
    report_port.write_snapshot(&result, &paths.snapshot)?;
    info!(path = %paths.snapshot.display(), "snapshot written");

    eprintln!("\nEquity curve written to: {}", paths.equity.display());
    eprintln!("Snapshot written to:     {}", paths.snapshot.display());
    Ok(result)
}

fn print_summary(result: &SimulationResult, metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:     {:.2}", result.final_equity());
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Drawdown Days:    {}", metrics.max_drawdown_duration);
    eprintln!(
        "Rebalance Days:   {} of {}",
        metrics.rebalance_days, metrics.trading_days
    );
    eprintln!(
        "Avg Gross Exp.:   {:.2}",
        metrics.avg_gross_exposure
    );
    eprintln!("Turnover:         {:.2}", metrics.turnover);
    eprintln!("Fills:            {}", metrics.fill_count);

    if !result.final_weights.is_empty() {
        eprintln!("\n=== Final Weights ===");
        for (instrument, weight) in &result.final_weights {
            eprintln!("  {:<10} {:>+8.4}", instrument, weight);
        }
    }
}

fn run_validate(config_path: &Path) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let sim_config = build_simulation_config(&config)?;
    eprintln!("\nSimulation:");
    eprintln!("  window:          {} to {}", sim_config.start_date, sim_config.end_date);
    eprintln!("  initial capital: {:.2}", sim_config.initial_capital);
    eprintln!("  risk-free rate:  {}", sim_config.risk_free_rate);
    eprintln!("  parallel:        {}", sim_config.parallel);

    eprintln!("\nData:");
    if let Some(dir) = config.get_string("data", "dir") {
        eprintln!("  dir:   {}", dir);
    }
    match config.get_string("data", "codes") {
        Some(codes) => eprintln!("  codes: {}", codes),
        None => eprintln!("  codes: (all instruments in dir)"),
    }

    eprintln!("\nConfig is valid");
    Ok(())
}

fn data_port_for(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<CsvAdapter, MeanrevError> {
    let config = match (data_dir, config_path) {
        (None, Some(path)) => Some(load_config(path)?),
        _ => None,
    };
    let dir = resolve_data_dir(data_dir, config.as_ref().map(|c| c as &dyn ConfigPort))?;
    Ok(CsvAdapter::new(dir))
}

fn run_list_symbols(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<(), MeanrevError> {
    let adapter = data_port_for(config_path, data_dir)?;
    let symbols = adapter.list_instruments()?;

    if symbols.is_empty() {
        eprintln!("No instruments found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} instruments found", symbols.len());
    }
    Ok(())
}

fn run_info(
    code: Option<&str>,
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<(), MeanrevError> {
    let adapter = data_port_for(config_path, data_dir)?;
    let instruments = match code {
        Some(c) => vec![c.to_string()],
        None => adapter.list_instruments()?,
    };

    println!("{:<12} {:<12} {:<12} {:>8}", "instrument", "first", "last", "closes");
    for instrument in &instruments {
        match adapter.get_data_range(instrument) {
            Ok(Some((first, last, count))) => {
                println!("{:<12} {:<12} {:<12} {:>8}", instrument, first, last, count);
            }
            Ok(None) => {
                println!("{:<12} {:<12} {:<12} {:>8}", instrument, "-", "-", 0);
            }
            Err(e) if code.is_none() => {
                warn!(%instrument, error = %e, "unreadable data file");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
