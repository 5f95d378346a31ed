//! Backup snapshot and rollback
//!
//! Before the live tree is mutated, every file the changeset will modify or
//! delete is copied into an isolated backup root:
//! - `files/<relative path>`: the copied files
//! - `snapshot.toml`: timestamp, source live root and file list
//!
//! The snapshot is scoped to one cycle; the next cycle discards it.

mod rollback;
mod snapshot;

pub use rollback::{RollbackCoordinator, RollbackOutcome};
pub use snapshot::{BackupManager, RestoreFailure, RestoreReport, SnapshotMetadata};
