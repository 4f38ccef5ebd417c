//! Spacelens — storage usage analyser.
//!
//! Thin binary entry point. All logic lives in the `spacelens-core`
//! and `spacelens-cli` crates.

use std::process::ExitCode;

use clap::Parser;
use spacelens_cli::{exit_code, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Spacelens starting");

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
