//! CLI argument parsing for slate.
//!
//! The surface is launcher-oriented: the wrapper script passes the core
//! install root as the first token, everything else is free tokens that
//! the dispatcher classifies. Only a handful of flags are recognized;
//! `--engine=` and `--pc=` keep their equals form because the tracker
//! integration composes command lines that way.

use clap::Parser;
use std::path::PathBuf;

const AFTER_HELP: &str = "\
Running commands:
  Syntax: slate <install_root> [command] [context]

  Context is a location on disk, or a tracker entity written as a type
  followed by an id or a name. Without a context, the current working
  directory is used.

  Without a command, the available commands for the context are listed.

Examples:
  Show the commands available for the current directory:
    slate /studio/core

  Show the commands available for Shot ABC123:
    slate /studio/core Shot ABC123

  Launch a command for your current path:
    slate /studio/core launch_maya

  Launch a command for a Shot by id:
    slate /studio/core launch_maya Shot 123

  Launch a command for a folder:
    slate /studio/core launch_maya /studio/proj_xyz/shots/ABC123

Administration:
  slate <install_root> setup_project            set up a new project
  slate <install_root> folders Shot ABC123      create folders on disk
  slate <install_root> core                     information about the core
  slate <install_root> core localize            install the core into this configuration
  slate <install_root> validate                 validate the configuration
";

/// Project bootstrap and command dispatch for studio pipeline
/// configurations.
#[derive(Parser, Debug)]
#[command(name = "slate")]
#[command(version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Root of the core install the launcher runs from.
    #[arg(value_name = "INSTALL_ROOT")]
    pub install_root: PathBuf,

    /// Display verbose debug output.
    #[arg(long)]
    pub debug: bool,

    /// Engine to start instead of the default shell engine.
    #[arg(long, require_equals = true, value_name = "NAME")]
    pub engine: Option<String>,

    /// Pipeline configuration root this invocation is bound to.
    #[arg(long, require_equals = true, value_name = "PATH")]
    pub pc: Option<PathBuf>,

    /// Preview folder creation without touching disk (folders command).
    #[arg(long)]
    pub preview: bool,

    /// Free tokens: a builtin command with its arguments, or a
    /// command/context pair.
    #[arg(value_name = "TOKENS")]
    pub tokens: Vec<String>,
}
