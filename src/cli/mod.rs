//! Command-line parsing for the geopolitical risk / market lag engine.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/analysis code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{EngineConfig, InterpolationMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "georisk",
    version,
    about = "Geopolitical risk vs. market lag-correlation engine",
    after_help = "The forecast sensitivity (k_risk) and all warning thresholds are empirical \
                  configuration constants, not derived parameters."
)]
pub struct Cli {
    /// TOML configuration file layered over the built-in defaults.
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load, unify, analyse; write every output table and print a summary.
    Run(RunArgs),
    /// Load and unify only; write the unified and per-country tables.
    Unify(RunArgs),
    /// Print the static stress-scenario catalog.
    Scenarios,
    /// Print the effective configuration (defaults + file + environment + flags) as JSON.
    Config(RunArgs),
}

/// Overrides for the most common configuration knobs.
#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    /// Root directory that relative source paths are resolved against.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for output tables.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Market column to project in the forecast.
    #[arg(long, value_name = "COLUMN")]
    pub forecast_target: Option<String>,

    /// Forecast sensitivity per unit of risk (empirical).
    #[arg(long)]
    pub k_risk: Option<f64>,

    /// Gap filling before volatility is computed.
    #[arg(long, value_enum)]
    pub interpolation: Option<InterpolationMode>,

    /// Compute and print, but do not write output tables.
    #[arg(long)]
    pub no_write: bool,
}

impl RunArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(dir) = &self.data_dir {
            config.sources.data_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.output_dir = dir.clone();
        }
        if let Some(target) = &self.forecast_target {
            config.forecast.target = target.clone();
        }
        if let Some(k) = self.k_risk {
            config.forecast.k_risk = k;
        }
        if let Some(mode) = self.interpolation {
            config.volatility.interpolation = mode;
        }
    }
}
