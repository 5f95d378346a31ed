//! SyncOrchestrator implementation
//!
//! Sequences one sync cycle:
//!
//! ```text
//! Init -> Fetching -> Validating -> Comparing -> ApplyStarted -> BackingUp -> Applying -> Completed
//!                          |             |                           |            |
//!                    CancelledNoop  NoChangesNoop                 Failed    Failed -> RollingBack
//!                                                                                      |
//!                                                   RestoredAfterFailure | RestoreIncomplete
//! ```
//!
//! Everything up to and including the backup runs on the caller's thread.
//! Applying (and any rollback) runs on a background thread; the caller
//! observes it through the status record or the returned [`ApplyHandle`].

use super::apply::{ApplyExecutor, ApplySummary, CancellationToken};
use super::detect::{ChangeDetector, Changeset};
use crate::backup::{BackupManager, RestoreReport, RollbackCoordinator};
use crate::config::SyncConfig;
use crate::status::{StatusRecord, StatusReporter, SyncPhase, scale};
use crate::validation::{ValidationGate, ValidationReport};
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{info, warn};
use treesync_fs::TreeWalker;

/// Acquires the candidate tree (clone, download, extract, ...)
pub trait CandidateSource {
    /// Materialize the candidate tree at `candidate_root`.
    fn fetch(&self, candidate_root: &Path) -> std::result::Result<(), String>;
}

/// Source for a candidate tree that is already on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreparedCandidate;

impl CandidateSource for PreparedCandidate {
    fn fetch(&self, candidate_root: &Path) -> std::result::Result<(), String> {
        if candidate_root.is_dir() {
            Ok(())
        } else {
            Err(format!(
                "candidate root {} is not a directory",
                candidate_root.display()
            ))
        }
    }
}

/// How a cycle ended on the caller's thread
#[derive(Debug)]
pub enum CycleOutcome {
    /// The candidate matched the live tree
    NoChanges,
    /// Validation rejected the candidate; the live tree was not touched
    Cancelled(ValidationReport),
    /// The changeset is being applied in the background
    Started(ApplyHandle),
}

/// Terminal result of a background apply
#[derive(Debug)]
pub enum ApplyOutcome {
    Completed(ApplySummary),
    /// The apply failed and every backed-up file was restored
    RestoredAfterFailure { error: String, report: RestoreReport },
    /// The apply failed and some backed-up files could not be restored
    RestoreIncomplete { error: String, report: RestoreReport },
}

impl ApplyOutcome {
    /// Final phase recorded for this outcome.
    pub fn phase(&self) -> SyncPhase {
        match self {
            Self::Completed(_) => SyncPhase::Completed,
            Self::RestoredAfterFailure { .. } => SyncPhase::RestoredAfterFailure,
            Self::RestoreIncomplete { .. } => SyncPhase::RestoreIncomplete,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Handle to an in-flight background apply.
///
/// Dropping the handle detaches the task; it still runs to a terminal
/// status record.
#[derive(Debug)]
pub struct ApplyHandle {
    changeset: Changeset,
    join: JoinHandle<ApplyOutcome>,
    cancel: CancellationToken,
    reporter: StatusReporter,
}

impl ApplyHandle {
    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Latest status record of this cycle.
    pub fn status(&self) -> StatusRecord {
        self.reporter.current()
    }

    /// Ask the apply to stop at the next file boundary and roll back.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the apply (and any rollback) has finished.
    pub fn wait(self) -> Result<ApplyOutcome> {
        self.join.join().map_err(|_| Error::ApplyPanicked)
    }
}

/// Exclusive single-flight lock, released on drop
#[derive(Debug)]
struct FlightLock {
    file: File,
    path: PathBuf,
}

impl FlightLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| Error::CycleInFlight {
                lock: path.to_path_buf(),
            })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for FlightLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = %self.path.display(), "Failed to release cycle lock: {}", e);
        }
    }
}

/// State machine driving sync cycles against one live tree
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    config: SyncConfig,
}

impl SyncOrchestrator {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configured roots overlap.
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn walker(&self) -> TreeWalker {
        TreeWalker::new(self.config.settings.ignore.iter().cloned())
    }

    /// Latest persisted status record, if any cycle has run.
    pub fn status(&self) -> Result<Option<StatusRecord>> {
        StatusReporter::read(&self.config.settings.status_path)
    }

    /// Compute the changeset without validating or applying anything.
    pub fn preview(&self) -> Result<Changeset> {
        let s = &self.config.settings;
        ChangeDetector::new(self.walker()).detect(&s.candidate_root, &s.live_root)
    }

    /// Run one cycle up to the hand-off of the apply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleInFlight`] without touching anything if another
    /// cycle is still running against this live tree. Any other error has
    /// already been recorded as a `Failed` status, and the live tree has not
    /// been modified.
    pub fn start(&self, source: &dyn CandidateSource) -> Result<CycleOutcome> {
        let s = &self.config.settings;
        let lock = FlightLock::acquire(&self.config.lock_path()?)?;

        if let Some(previous) = StatusReporter::read(&s.status_path).unwrap_or(None)
            && !previous.phase.is_terminal()
        {
            warn!(
                cycle = %previous.cycle,
                phase = %previous.phase,
                "Previous cycle ended without a terminal status, overwriting"
            );
        }

        let reporter = StatusReporter::begin(&s.status_path)?;

        reporter.report(SyncPhase::Fetching, 0);
        if let Err(message) = source.fetch(&s.candidate_root) {
            self.discard_candidate();
            return Err(self.fail(&reporter, Error::Fetch { message }));
        }
        reporter.report(SyncPhase::Fetching, 5);

        reporter.report(SyncPhase::Validating, 5);
        let gate = ValidationGate::new(
            self.config.check.clone(),
            &s.validation_extensions,
            self.walker(),
        );
        let validation = gate
            .validate(&s.candidate_root)
            .map_err(|e| self.fail(&reporter, e))?;
        if !validation.passed {
            self.discard_candidate();
            reporter.report_with(SyncPhase::CancelledNoop, 100, validation.summary());
            info!("Candidate rejected by validation: {}", validation.summary());
            return Ok(CycleOutcome::Cancelled(validation));
        }

        reporter.report(SyncPhase::Comparing, 10);
        let changeset = self.preview().map_err(|e| self.fail(&reporter, e))?;
        if changeset.is_empty() {
            reporter.report_with(SyncPhase::NoChangesNoop, 100, "live tree already up to date");
            return Ok(CycleOutcome::NoChanges);
        }
        reporter.report_with(
            SyncPhase::ApplyStarted,
            20,
            format!(
                "{} new, {} modified, {} deleted",
                changeset.new.len(),
                changeset.modified.len(),
                changeset.deleted.len()
            ),
        );

        reporter.report(SyncPhase::BackingUp, 20);
        let backup = BackupManager::new(&s.backup_root, self.config.ops.clone());
        let to_back_up = changeset.to_back_up();
        backup
            .snapshot(&s.live_root, to_back_up, |done, total| {
                reporter.report(SyncPhase::BackingUp, scale(20, 30, done, total));
            })
            .map_err(|e| self.fail(&reporter, e))?;

        let executor = ApplyExecutor::new(&s.candidate_root, &s.live_root, self.config.ops.clone());
        let cancel = CancellationToken::new();
        let live_root = s.live_root.clone();
        let task_reporter = reporter.clone();
        let task_cancel = cancel.clone();
        let task_changeset = changeset.clone();

        let join = std::thread::Builder::new()
            .name("treesync-apply".into())
            .spawn(move || {
                // Held until the terminal record is written
                let _lock = lock;
                run_apply(
                    &executor,
                    &backup,
                    &live_root,
                    &task_changeset,
                    &task_reporter,
                    &task_cancel,
                )
            })
            .map_err(|e| self.fail(&reporter, Error::Io(e)))?;

        Ok(CycleOutcome::Started(ApplyHandle {
            changeset,
            join,
            cancel,
            reporter,
        }))
    }

    /// Run one cycle and wait for the background apply to finish.
    pub fn run(&self, source: &dyn CandidateSource) -> Result<SyncPhase> {
        match self.start(source)? {
            CycleOutcome::NoChanges => Ok(SyncPhase::NoChangesNoop),
            CycleOutcome::Cancelled(_) => Ok(SyncPhase::CancelledNoop),
            CycleOutcome::Started(handle) => Ok(handle.wait()?.phase()),
        }
    }

    fn fail(&self, reporter: &StatusReporter, error: Error) -> Error {
        reporter.fail(SyncPhase::Failed, error.to_string());
        error
    }

    fn discard_candidate(&self) {
        let s = &self.config.settings;
        if !s.discard_rejected_candidate || !s.candidate_root.exists() {
            return;
        }
        match fs::remove_dir_all(&s.candidate_root) {
            Ok(()) => info!(root = %s.candidate_root.display(), "Discarded candidate tree"),
            Err(e) => warn!(
                root = %s.candidate_root.display(),
                "Failed to discard candidate tree: {}", e
            ),
        }
    }
}

fn run_apply(
    executor: &ApplyExecutor,
    backup: &BackupManager,
    live_root: &Path,
    changeset: &Changeset,
    reporter: &StatusReporter,
    cancel: &CancellationToken,
) -> ApplyOutcome {
    match executor.apply(changeset, reporter, cancel) {
        Ok(summary) => {
            reporter.report_with(
                SyncPhase::Completed,
                100,
                format!(
                    "copied {}, deleted {}, pruned {} dir(s)",
                    summary.copied, summary.deleted, summary.pruned_dirs
                ),
            );
            ApplyOutcome::Completed(summary)
        }
        Err(e) => {
            let error = e.to_string();
            reporter.fail(SyncPhase::Failed, &error);
            let outcome = RollbackCoordinator::new(backup).rollback(live_root, reporter);
            match outcome.phase {
                SyncPhase::RestoredAfterFailure => ApplyOutcome::RestoredAfterFailure {
                    error,
                    report: outcome.report,
                },
                _ => ApplyOutcome::RestoreIncomplete {
                    error,
                    report: outcome.report,
                },
            }
        }
    }
}
