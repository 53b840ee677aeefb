//! Command dispatch for slate.
//!
//! Classifies the free tokens of an invocation into a builtin
//! non-project command, a builtin project command, or a context/command
//! pair handed to the engine layer.

pub mod core_cmd;
pub mod engine_cmd;
pub mod folders;
pub mod project_cmds;
pub mod setup_project;
pub mod tracker_cmds;

use crate::cli::Cli;
use crate::constants::DEFAULT_ENGINE;
use crate::context::classify_tokens;
use crate::error::{Result, SlateError};
use std::path::PathBuf;
use tracing::debug;

/// Builtin commands that run without an existing pipeline handle.
pub const NON_PROJECT_COMMANDS: [&str; 3] = ["setup_project", "core", "folders"];

/// Builtin commands that run against a specific project configuration.
pub const PROJECT_COMMANDS: [&str; 8] = [
    "validate",
    "clone",
    "join",
    "leave",
    "switch",
    "revert",
    "tracker_run_action",
    "tracker_cache_actions",
];

/// Dispatch a parsed invocation to its implementation.
pub fn dispatch(cli: &Cli) -> Result<()> {
    let cwd = current_dir()?;
    debug!("Code install root: {}", cli.install_root.display());
    debug!(
        "Pipeline config root: {}",
        cli.pc.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "none".into())
    );

    if let Some(first) = cli.tokens.first().map(String::as_str) {
        if PROJECT_COMMANDS.contains(&first) {
            debug!("Running built in project command {}", first);
            return project_cmds::run_project_command(
                &cli.install_root,
                cli.pc.as_deref().map(PathBuf::from).unwrap_or_else(|| cwd.clone()),
                first,
                &cli.tokens[1..],
            );
        }

        if NON_PROJECT_COMMANDS.contains(&first) {
            debug!("Running built in command {}", first);
            return match first {
                "setup_project" => setup_project::run(&cli.install_root, &cli.tokens[1..], &cwd),
                "folders" => folders::run(&cli.install_root, &cli.tokens[1..], cli.preview),
                "core" => core_cmd::run(
                    &cli.install_root,
                    cli.pc.as_deref(),
                    &cli.tokens[1..],
                    &cwd,
                ),
                _ => unreachable!("command list covers the match"),
            };
        }
    }

    let classification = classify_tokens(&cli.tokens, &cwd)?;
    let engine_name = cli.engine.as_deref().unwrap_or(DEFAULT_ENGINE);
    engine_cmd::run_engine_cmd(&cli.install_root, cli.pc.as_deref(), engine_name, classification)
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        SlateError::Usage(format!("failed to get the current working directory: {}", e))
    })
}
