//! CLI command definitions and handlers.

pub mod evaluate;
pub mod monitor;

use crate::settings::Preset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a value in `0.0..=1.0`
pub(crate) fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a strictly positive number of seconds
pub(crate) fn parse_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be a positive number of seconds"))
    }
}

/// Drowsiness Monitor - eye-closure based driver alertness
#[derive(Parser)]
#[command(name = "drowsiness-monitor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// TOML configuration file
    #[arg(long, value_name = "TOML", global = true)]
    pub config: Option<PathBuf>,

    /// Threshold preset applied before the configuration file
    #[arg(long, value_enum, default_value_t = Preset::Default, global = true)]
    pub preset: Preset,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Score a labeled image dataset
    Evaluate(evaluate::EvaluateArgs),
    /// Replay a landmark stream through the real-time monitor
    Monitor(monitor::MonitorArgs),
}
