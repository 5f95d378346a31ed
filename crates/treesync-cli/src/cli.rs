//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// treesync - Keep a live directory tree in step with a validated candidate
#[derive(Parser, Debug)]
#[command(name = "treesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append log lines to this file as well as stderr
    #[arg(long, global = true, env = "TREESYNC_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Roots of a sync setup, from flags or a settings file
///
/// Flags override values loaded from `--config`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RootArgs {
    /// Settings file (.toml, .json or .yaml)
    #[arg(short, long, env = "TREESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the candidate tree
    #[arg(long)]
    pub candidate: Option<PathBuf>,

    /// Directory kept in sync
    #[arg(long)]
    pub live: Option<PathBuf>,

    /// Scratch directory for the backup snapshot
    #[arg(long)]
    pub backup: Option<PathBuf>,

    /// Status file written during the cycle
    #[arg(long)]
    pub status: Option<PathBuf>,

    /// Path component names to ignore in both trees (repeatable)
    #[arg(long)]
    pub ignore: Vec<String>,
}

/// Arguments of `treesync run`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    /// Only validate files with these extensions (repeatable)
    #[arg(long = "ext")]
    pub extensions: Vec<String>,

    /// Program run once per candidate file; a non-zero exit rejects the candidate
    ///
    /// The file path is passed as the last argument.
    #[arg(long)]
    pub check: Option<String>,

    /// Extra argument passed to the check program before the file path (repeatable)
    #[arg(long = "check-arg", requires = "check", allow_hyphen_values = true)]
    pub check_args: Vec<String>,

    /// Leave a rejected candidate tree on disk
    #[arg(long)]
    pub keep_candidate: bool,

    /// Print each status change while the apply runs
    #[arg(long)]
    pub progress: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run one sync cycle and wait for it to finish
    ///
    /// Examples:
    ///   treesync run --candidate /tmp/new --live /srv/scripts \
    ///       --backup /var/backups/scripts --status /run/treesync.json
    ///   treesync run -c treesync.toml --ext ps1 --check pwsh-lint
    Run(RunArgs),

    /// Preview what a sync would change
    Diff {
        #[command(flatten)]
        roots: RootArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the latest status record
    Status {
        #[command(flatten)]
        roots: RootArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
