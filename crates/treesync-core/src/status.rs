//! Current-status record for external observers
//!
//! A sync cycle publishes exactly one [`StatusRecord`] at a time. Every phase
//! transition overwrites it, both in memory and in the persisted status file,
//! so pollers only ever see the most recent phase.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use treesync_fs::io;
use uuid::Uuid;

/// Percent value that signals an error state
pub const ERROR_PERCENT: i8 = -1;

/// Phases of a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Init,
    Fetching,
    Validating,
    Comparing,
    /// Terminal: the candidate matched the live tree
    NoChangesNoop,
    /// Terminal: validation rejected the candidate
    CancelledNoop,
    ApplyStarted,
    BackingUp,
    Applying,
    /// Terminal: the changeset was applied in full
    Completed,
    /// Terminal unless followed by `RollingBack`
    Failed,
    RollingBack,
    /// Terminal: every backed-up file was restored after a failed apply
    RestoredAfterFailure,
    /// Terminal: some backed-up files could not be restored
    RestoreIncomplete,
}

impl SyncPhase {
    /// Whether a cycle can end in this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NoChangesNoop
                | Self::CancelledNoop
                | Self::Completed
                | Self::Failed
                | Self::RestoredAfterFailure
                | Self::RestoreIncomplete
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Validating => "validating",
            Self::Comparing => "comparing",
            Self::NoChangesNoop => "no_changes_noop",
            Self::CancelledNoop => "cancelled_noop",
            Self::ApplyStarted => "apply_started",
            Self::BackingUp => "backing_up",
            Self::Applying => "applying",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RollingBack => "rolling_back",
            Self::RestoredAfterFailure => "restored_after_failure",
            Self::RestoreIncomplete => "restore_incomplete",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single live status record of a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Identifies the cycle that wrote this record
    pub cycle: Uuid,
    pub phase: SyncPhase,
    /// 0-100, or -1 for an error state
    pub percent: i8,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusRecord {
    pub fn is_error(&self) -> bool {
        self.percent == ERROR_PERCENT
    }
}

/// Linear percent within `[lo, hi]` for `done` of `total` items.
pub fn scale(lo: i8, hi: i8, done: usize, total: usize) -> i8 {
    if total == 0 {
        return hi;
    }
    let span = i64::from(hi - lo);
    let done = done.min(total) as i64;
    (i64::from(lo) + span * done / total as i64) as i8
}

/// Single writer of a cycle's status record.
///
/// Clones share the same record; the background apply task holds one clone
/// and the caller's [`crate::ApplyHandle`] another.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    path: PathBuf,
    current: Arc<RwLock<StatusRecord>>,
}

impl StatusReporter {
    /// Start a new cycle's record at `Init`, overwriting any previous record.
    ///
    /// # Errors
    ///
    /// Fails if the status file cannot be written; a cycle that cannot
    /// report must not start.
    pub fn begin(path: impl Into<PathBuf>) -> Result<Self> {
        let record = StatusRecord {
            cycle: Uuid::new_v4(),
            phase: SyncPhase::Init,
            percent: 0,
            timestamp: Utc::now(),
            message: None,
        };
        let path = path.into();
        persist(&path, &record)?;
        info!(cycle = %record.cycle, "Sync cycle initialised");

        Ok(Self {
            path,
            current: Arc::new(RwLock::new(record)),
        })
    }

    /// Read the persisted record, if any.
    pub fn read(path: &Path) -> Result<Option<StatusRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = io::read_text(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the in-memory record.
    pub fn current(&self) -> StatusRecord {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Record a phase transition or progress update.
    pub fn report(&self, phase: SyncPhase, percent: i8) {
        self.write(phase, percent, None);
    }

    /// Record a transition with a human-readable message.
    pub fn report_with(&self, phase: SyncPhase, percent: i8, message: impl Into<String>) {
        self.write(phase, percent, Some(message.into()));
    }

    /// Record an error state (`percent = -1`).
    pub fn fail(&self, phase: SyncPhase, message: impl Into<String>) {
        let message = message.into();
        error!(phase = %phase, "{}", message);
        self.write(phase, ERROR_PERCENT, Some(message));
    }

    fn write(&self, phase: SyncPhase, percent: i8, message: Option<String>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let transition = guard.phase != phase;
        guard.phase = phase;
        guard.percent = percent;
        guard.timestamp = Utc::now();
        guard.message = message;

        if transition {
            info!(cycle = %guard.cycle, phase = %phase, percent, "Sync phase transition");
        }

        // Persist while holding the lock so file order matches memory order
        if let Err(e) = persist(&self.path, &guard) {
            warn!(path = %self.path.display(), "Failed to persist status record: {}", e);
        }
    }
}

fn persist(path: &Path, record: &StatusRecord) -> Result<()> {
    let content = serde_json::to_string_pretty(record)?;
    io::write_atomic(path, content.as_bytes())?;
    Ok(())
}
