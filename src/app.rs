//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments and builds the effective configuration
//! - runs the pipeline stages a subcommand needs
//! - prints reports and writes output tables

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::config::{EngineConfig, load_config, validate};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `georisk` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Run(args) => handle_run(&effective_config(&cli, args)?, args),
        Command::Unify(args) => handle_unify(&effective_config(&cli, args)?, args),
        Command::Scenarios => {
            print!(
                "{}",
                crate::report::format_scenarios(&crate::analysis::STRESS_SCENARIOS)
            );
            Ok(())
        }
        Command::Config(args) => handle_config(&effective_config(&cli, args)?),
    }
}

/// Logs go to stderr so stdout carries only the report. `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second install (e.g. from tests) is harmless; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Defaults -> TOML file -> environment -> CLI flags.
fn effective_config(cli: &Cli, args: &RunArgs) -> Result<EngineConfig, AppError> {
    let mut config = load_config(cli.config.as_deref())?;
    args.apply(&mut config);
    validate(&config)?;
    Ok(config)
}

fn handle_run(config: &EngineConfig, args: &RunArgs) -> Result<(), AppError> {
    let run = pipeline::run_full(config)?;
    println!("{}", crate::report::format_run_summary(&run, config));

    if !args.no_write {
        let written = pipeline::write_outputs(&config.output_dir, &run, &config.volatility)?;
        println!("Wrote {} tables to {}", written.len(), config.output_dir.display());
    }
    Ok(())
}

fn handle_unify(config: &EngineConfig, args: &RunArgs) -> Result<(), AppError> {
    let output = pipeline::run_unify(config)?;
    let market = &output.unified.market;
    println!(
        "Unified {} dates x {} columns; {} country-day risk records.",
        market.row_count(),
        market.columns.len(),
        output.unified.risk.len()
    );

    if !args.no_write {
        let written = pipeline::write_unify_outputs(&config.output_dir, &output, &config.volatility)?;
        for path in &written {
            info!(path = %path.display(), "wrote");
        }
        println!("Wrote {} tables to {}", written.len(), config.output_dir.display());
    }
    Ok(())
}

fn handle_config(config: &EngineConfig) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::new(2, format!("Failed to serialize configuration: {e}")))?;
    println!("{json}");
    Ok(())
}
