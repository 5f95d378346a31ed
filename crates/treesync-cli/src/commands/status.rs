//! Status command implementation
//!
//! Prints the record written by the running (or last) sync cycle.

use colored::{ColoredString, Colorize};

use treesync_core::{StatusRecord, StatusReporter, SyncPhase};

use super::resolve_status_path;
use crate::cli::RootArgs;
use crate::error::Result;

/// Run the status command
pub fn run_status(roots: &RootArgs, json: bool) -> Result<()> {
    let path = resolve_status_path(roots)?;
    let record = StatusReporter::read(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    match record {
        Some(record) => print_record(&record),
        None => println!(
            "{} No sync cycle recorded at {}",
            "=>".blue().bold(),
            path.display()
        ),
    }
    Ok(())
}

fn print_record(record: &StatusRecord) {
    println!("{} {}", "Cycle:".bold(), record.cycle);
    println!("{} {}", "Phase:".bold(), colored_phase(record.phase));
    let percent = if record.is_error() {
        "error".red().to_string()
    } else {
        format!("{}%", record.percent)
    };
    println!("{} {}", "Progress:".bold(), percent);
    println!(
        "{} {}",
        "Updated:".bold(),
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(message) = &record.message {
        println!("{} {}", "Message:".bold(), message);
    }
}

pub(crate) fn colored_phase(phase: SyncPhase) -> ColoredString {
    match phase {
        SyncPhase::Completed | SyncPhase::NoChangesNoop => phase.as_str().green(),
        SyncPhase::CancelledNoop => phase.as_str().yellow(),
        SyncPhase::Failed
        | SyncPhase::RollingBack
        | SyncPhase::RestoredAfterFailure
        | SyncPhase::RestoreIncomplete => phase.as_str().red(),
        _ => phase.as_str().cyan(),
    }
}
