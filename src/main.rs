//! Slate: project bootstrap and command dispatch for studio pipeline
//! configurations.
//!
//! This is the entry point for the `slate` CLI. It parses arguments,
//! sets up logging, dispatches to the appropriate command handler, and
//! reports errors: known failure categories as a single line with a
//! hint, unexpected ones with their full error chain.

mod cli;
mod commands;
pub mod constants;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod pipeline;
pub mod platform;
pub mod provision;
pub mod remote;
#[cfg(test)]
pub mod test_support;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // Help and version output.
            print!("{}", e);
            return ExitCode::from(exit_codes::SUCCESS as u8);
        }
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(exit_codes::FAILURE as u8);
        }
    };

    init_tracing(cli.debug);
    debug!("Running with debug output enabled.");

    match commands::dispatch(&cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) if err.is_expected() => {
            eprintln!();
            eprintln!(
                "Error: {}. Re-run the command with --debug for more information.",
                err
            );
            ExitCode::from(exit_codes::FAILURE as u8)
        }
        Err(err) => {
            // Full diagnostic chain for the unexpected.
            eprintln!();
            eprintln!("An unexpected error was reported: {:?}", err);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("slate={}", level)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
