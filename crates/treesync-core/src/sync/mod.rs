//! Differential sync of a candidate tree onto the live tree
//!
//! This module provides:
//! - **detect**: Classify candidate/live differences into a [`Changeset`]
//! - **apply**: Perform a changeset against the live tree
//! - **orchestrator**: The cycle state machine tying validation, backup,
//!   apply and rollback together

mod apply;
mod detect;
mod orchestrator;

pub use apply::{ApplyExecutor, ApplySummary, CancellationToken};
pub use detect::{ChangeDetector, ChangeKind, Changeset};
pub use orchestrator::{
    ApplyHandle, ApplyOutcome, CandidateSource, CycleOutcome, PreparedCandidate, SyncOrchestrator,
};
