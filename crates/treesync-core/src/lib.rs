//! Differential directory synchronization engine
//!
//! Given a freshly fetched candidate tree and a live tree, `treesync-core`:
//!
//! - **validates** the candidate with an injected per-file check
//! - **detects** the minimal changeset (new, modified, deleted paths)
//! - **backs up** every live file the changeset will modify or delete
//! - **applies** the changeset on a background thread while the live tree
//!   stays readable
//! - **rolls back** from the backup if the apply fails part-way
//!
//! Progress is published through a single, overwritten [`StatusRecord`].
//!
//! # Architecture
//!
//! ```text
//!                  treesync-cli
//!                       |
//!                 treesync-core
//!   (validation, sync, backup, status, config)
//!                       |
//!                  treesync-fs
//!   (paths, fingerprints, tree walk, atomic I/O)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use treesync_core::{CycleOutcome, PreparedCandidate, SyncConfig, SyncOrchestrator};
//!
//! fn example() -> treesync_core::Result<()> {
//!     let config = SyncConfig::new(
//!         "/tmp/candidate",
//!         "/srv/scripts",
//!         "/var/backups/scripts",
//!         "/var/run/treesync.json",
//!     );
//!     let orchestrator = SyncOrchestrator::new(config)?;
//!     if let CycleOutcome::Started(handle) = orchestrator.start(&PreparedCandidate)? {
//!         let outcome = handle.wait()?;
//!         println!("finished: {}", outcome.phase());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod status;
pub mod sync;
pub mod validation;

pub use backup::{
    BackupManager, RestoreFailure, RestoreReport, RollbackCoordinator, RollbackOutcome,
    SnapshotMetadata,
};
pub use config::{SyncConfig, SyncSettings};
pub use error::{ApplyError, Error, Result};
pub use status::{StatusRecord, StatusReporter, SyncPhase};
pub use sync::{
    ApplyExecutor, ApplyHandle, ApplyOutcome, ApplySummary, CancellationToken, CandidateSource,
    ChangeDetector, ChangeKind, Changeset, CycleOutcome, PreparedCandidate, SyncOrchestrator,
};
pub use validation::{
    AcceptAll, CheckOutcome, FileCheck, ValidationFailure, ValidationGate, ValidationReport,
};
