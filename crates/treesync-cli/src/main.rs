//! treesync CLI
//!
//! Synchronizes a live directory tree from a validated candidate tree,
//! with backup and rollback.

mod check;
mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref())?;
    tracing::debug!("Verbose mode enabled");
    execute_command(cli.command)
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run(args) => commands::run_sync(&args),
        Commands::Diff { roots, json } => commands::run_diff(&roots, json),
        Commands::Status { roots, json } => commands::run_status(&roots, json),
    }
}
