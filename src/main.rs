//! Binary entry point for embedstore.
//!
//! This binary provides the CLI interface for the embedstore vector store.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::Parser;
use embedstore::cli::{self, Cli};
use embedstore::observability::{self, LoggingConfig};
use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Load .env before reading configuration; a missing file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    match LoggingConfig::from_settings(&config.logging, cli.verbose) {
        Ok(logging) => {
            if let Err(e) = observability::init(logging) {
                eprintln!("Warning: failed to initialize logging: {e}");
            }
        },
        Err(e) => eprintln!("Warning: invalid logging configuration: {e}"),
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = cli::run(cli.command, &config, &mut out);
    let _ = out.flush();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}
