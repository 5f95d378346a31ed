//! Run command implementation
//!
//! Drives one cycle against an already materialized candidate tree and
//! waits for the background apply to reach a terminal phase.

use std::thread;
use std::time::Duration;

use colored::Colorize;
use tracing::debug;

use treesync_core::{
    ApplyHandle, ApplyOutcome, CycleOutcome, PreparedCandidate, RestoreReport, SyncOrchestrator,
    SyncPhase,
};

use super::resolve_settings;
use super::status::colored_phase;
use crate::check::CommandCheck;
use crate::cli::RunArgs;
use crate::error::{CliError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the sync command
pub fn run_sync(args: &RunArgs) -> Result<()> {
    let mut settings = resolve_settings(&args.roots)?;
    if !args.extensions.is_empty() {
        settings.validation_extensions = args.extensions.clone();
    }
    if args.keep_candidate {
        settings.discard_rejected_candidate = false;
    }

    let mut config = settings.into_config();
    if let Some(program) = &args.check {
        config = config.with_check(CommandCheck::new(program, args.check_args.clone()));
    }
    let orchestrator = SyncOrchestrator::new(config)?;

    match orchestrator.start(&PreparedCandidate)? {
        CycleOutcome::NoChanges => {
            println!(
                "{} No changes needed. Live tree is up to date.",
                "OK".green().bold()
            );
            Ok(())
        }
        CycleOutcome::Cancelled(report) => {
            println!(
                "{} Candidate rejected, live tree left untouched ({})",
                "CANCELLED".yellow().bold(),
                report.summary()
            );
            for failure in &report.failures {
                println!("  {} {}: {}", "x".red(), failure.path, failure.reason);
            }
            Ok(())
        }
        CycleOutcome::Started(handle) => {
            let changes = handle.changeset();
            println!(
                "{} Applying {} new, {} modified, {} deleted",
                "=>".blue().bold(),
                changes.new.len(),
                changes.modified.len(),
                changes.deleted.len()
            );
            if args.progress {
                watch(&handle);
            }
            finish(handle.wait()?)
        }
    }
}

/// Print every phase/percent change until the apply thread exits.
fn watch(handle: &ApplyHandle) {
    let mut last: Option<(SyncPhase, i8)> = None;
    loop {
        let finished = handle.is_finished();
        let record = handle.status();
        if last != Some((record.phase, record.percent)) {
            let percent = if record.is_error() {
                "--".to_string()
            } else {
                format!("{:>3}%", record.percent)
            };
            println!("  [{}] {}", percent, colored_phase(record.phase));
            last = Some((record.phase, record.percent));
        }
        if finished {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }
    debug!("Apply thread finished");
}

fn finish(outcome: ApplyOutcome) -> Result<()> {
    match outcome {
        ApplyOutcome::Completed(summary) => {
            println!(
                "{} Synced: copied {}, deleted {}, pruned {} dir(s)",
                "OK".green().bold(),
                summary.copied,
                summary.deleted,
                summary.pruned_dirs
            );
            Ok(())
        }
        ApplyOutcome::RestoredAfterFailure { error, report } => Err(CliError::CycleFailed {
            phase: SyncPhase::RestoredAfterFailure,
            message: format!(
                "{}; restored {} file(s) from backup",
                error,
                report.restored.len()
            ),
        }),
        ApplyOutcome::RestoreIncomplete { error, report } => {
            print_unrestored(&report);
            Err(CliError::CycleFailed {
                phase: SyncPhase::RestoreIncomplete,
                message: format!(
                    "{}; {} file(s) could not be restored, manual intervention required",
                    error,
                    report.failures.len()
                ),
            })
        }
    }
}

fn print_unrestored(report: &RestoreReport) {
    eprintln!("{}", "Files not restored:".red().bold());
    for failure in &report.failures {
        eprintln!("  {} {}: {}", "x".red(), failure.path, failure.message);
    }
    if let Some(error) = &report.snapshot_error {
        eprintln!("  {} backup snapshot unreadable: {}", "x".red(), error);
    }
}
