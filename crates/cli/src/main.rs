//! Drowsiness Monitor - Main Entry Point

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info};

mod commands;
mod logging;
mod settings;

use commands::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_json);

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = match settings::Settings::load(cli.config.as_deref(), cli.preset) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Effective settings: {:?}", settings);

    let result = match cli.command {
        Commands::Evaluate(ref args) => commands::evaluate::run(args, settings),
        Commands::Monitor(ref args) => commands::monitor::run(args, settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
