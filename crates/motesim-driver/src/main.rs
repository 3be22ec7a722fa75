//! # motesim
//!
//! CLI runner for motesim scenarios.
//!
//! Runs a scenario file or a built-in scenario against the reference event
//! engine. Channel output goes to stdout unless `--log-file` is given; driver
//! logs go to stderr and are filtered with `RUST_LOG`.

use motesim_driver::scenario::BUILTIN_SCENARIOS;
use motesim_driver::{ChannelSink, DriverConfig, DriverError, Scenario, SessionStats, SimDriver};
use motesim_engine::{EngineConfig, EngineStats, EventEngine, DEFAULT_TICKS_PER_SECOND};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// CLI Configuration
// ============================================================================

/// motesim - sensor network simulation driver
#[derive(Parser, Debug)]
#[command(name = "motesim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario from a YAML file
    Run(RunConfig),
    /// Run one of the built-in scenarios
    Builtin(BuiltinConfig),
    /// List the built-in scenarios
    List,
}

/// Configuration for running a scenario file
#[derive(Args, Debug)]
pub struct RunConfig {
    /// Path to the scenario YAML file
    pub scenario: PathBuf,

    #[command(flatten)]
    pub session: SessionOptions,
}

/// Configuration for running a built-in scenario
#[derive(Args, Debug)]
pub struct BuiltinConfig {
    /// Built-in scenario name (see `motesim list`)
    pub name: String,

    #[command(flatten)]
    pub session: SessionOptions,
}

/// Options shared by every scenario run
#[derive(Args, Debug)]
pub struct SessionOptions {
    /// Directory topology files are resolved against
    #[arg(long, default_value = "topo")]
    pub topo_dir: PathBuf,

    /// Directory noise files are resolved against
    #[arg(long, default_value = "noise")]
    pub noise_dir: PathBuf,

    /// Engine clock resolution
    #[arg(long, default_value_t = DEFAULT_TICKS_PER_SECOND)]
    pub ticks_per_second: u64,

    /// Write channel output to this file instead of stdout (truncated first)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print session and engine statistics as JSON when the scenario finishes
    #[arg(long)]
    pub stats: bool,
}

/// Statistics printed by `--stats`.
#[derive(Debug, Serialize)]
struct RunSummary {
    scenario: String,
    session: SessionStats,
    engine: EngineStats,
}

// ============================================================================
// Commands
// ============================================================================

fn run_scenario(scenario: &Scenario, options: &SessionOptions) -> Result<(), DriverError> {
    let sink = match &options.log_file {
        Some(path) => {
            File::create(path)?;
            ChannelSink::File(path.clone())
        }
        None => ChannelSink::Stdout,
    };

    let engine = EventEngine::new(EngineConfig {
        ticks_per_second: options.ticks_per_second,
    });
    let config = DriverConfig {
        topo_dir: options.topo_dir.clone(),
        noise_dir: options.noise_dir.clone(),
        ..DriverConfig::default()
    };
    let mut driver = SimDriver::new(engine, config);

    let result = scenario.execute(&mut driver, &sink);
    driver.engine_mut().flush_channels();
    result?;

    if options.stats {
        let summary = RunSummary {
            scenario: scenario.display_name().to_string(),
            session: driver.stats(),
            engine: driver.engine().stats(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn print_builtins() {
    let width = BUILTIN_SCENARIOS
        .iter()
        .map(|b| b.name.len())
        .max()
        .unwrap_or(0);
    for builtin in BUILTIN_SCENARIOS {
        println!("{:width$}  {}", builtin.name, builtin.description, width = width);
    }
}

fn run(cli: Cli) -> Result<(), DriverError> {
    match cli.command {
        Commands::Run(config) => {
            let scenario = Scenario::load(&config.scenario)?;
            run_scenario(&scenario, &config.session)
        }
        Commands::Builtin(config) => {
            let scenario = Scenario::builtin(&config.name)?;
            run_scenario(&scenario, &config.session)
        }
        Commands::List => {
            print_builtins();
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing subscriber with RUST_LOG env filter
    // Default to "info" level if RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
