//! Applies a changeset to the live tree
//!
//! Mutations happen in a fixed total order so that an interrupted apply
//! leaves the live tree holding a superset of its old content:
//! 1. create every directory the copies need
//! 2. copy New and Modified files from the candidate
//! 3. delete Deleted files
//! 4. prune directories emptied by the deletions, deepest first
//!
//! The one exception is a path that changes between file and directory.
//! The Deleted entries standing in the way are removed before step 1, since
//! no copy can land until they are gone. They are backed up like every
//! other Deleted entry.

use super::detect::Changeset;
use crate::error::ApplyError;
use crate::status::{StatusReporter, SyncPhase, scale};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use treesync_fs::{FileOps, RelativePath};

/// Cooperative cancellation flag, checked between file operations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What an apply changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub copied: usize,
    pub deleted: usize,
    pub pruned_dirs: usize,
}

/// Performs a changeset against the live tree
pub struct ApplyExecutor {
    candidate_root: PathBuf,
    live_root: PathBuf,
    ops: Arc<dyn FileOps>,
}

impl ApplyExecutor {
    pub fn new(
        candidate_root: impl Into<PathBuf>,
        live_root: impl Into<PathBuf>,
        ops: Arc<dyn FileOps>,
    ) -> Self {
        Self {
            candidate_root: candidate_root.into(),
            live_root: live_root.into(),
            ops,
        }
    }

    /// Apply `changeset`, reporting `Applying` progress (30-90% over copies,
    /// 90-100% over deletions).
    ///
    /// # Errors
    ///
    /// Stops at the first failed operation, or at the next file boundary
    /// after `cancel` is raised. Nothing already written is undone here;
    /// that is the rollback's job.
    pub fn apply(
        &self,
        changeset: &Changeset,
        reporter: &StatusReporter,
        cancel: &CancellationToken,
    ) -> Result<ApplySummary, ApplyError> {
        let to_copy = changeset.to_copy();
        let mut summary = ApplySummary::default();
        reporter.report(SyncPhase::Applying, 30);

        let cleared = self.clear_type_conflicts(changeset, &to_copy, cancel)?;
        summary.deleted += cleared.len();
        self.create_directories(&to_copy, cancel)?;

        let total_copies = to_copy.len();
        for (done, rel) in to_copy.into_iter().enumerate() {
            checkpoint(cancel)?;
            let from = rel.resolve(&self.candidate_root);
            let to = rel.resolve(&self.live_root);
            self.ops
                .copy(&from, &to)
                .map_err(|source| ApplyError::Copy {
                    path: to.clone(),
                    source,
                })?;
            debug!(path = %rel, "Copied");
            summary.copied += 1;
            reporter.report(SyncPhase::Applying, scale(30, 90, done + 1, total_copies));
        }

        let remaining: Vec<&RelativePath> = changeset
            .deleted
            .iter()
            .filter(|rel| !cleared.contains(*rel))
            .collect();
        let total_deletes = remaining.len();
        for (done, rel) in remaining.into_iter().enumerate() {
            checkpoint(cancel)?;
            self.delete(rel)?;
            summary.deleted += 1;
            reporter.report(SyncPhase::Applying, scale(90, 100, done + 1, total_deletes));
        }

        summary.pruned_dirs = self.prune_empty_dirs(&changeset.deleted);

        info!(
            copied = summary.copied,
            deleted = summary.deleted,
            pruned = summary.pruned_dirs,
            "Changeset applied"
        );
        Ok(summary)
    }

    /// Remove Deleted entries that block a copy: a live file where a copied
    /// path needs a directory, or a live directory where a copied path needs
    /// a file. Returns the removed Deleted paths.
    fn clear_type_conflicts(
        &self,
        changeset: &Changeset,
        to_copy: &BTreeSet<&RelativePath>,
        cancel: &CancellationToken,
    ) -> Result<BTreeSet<RelativePath>, ApplyError> {
        let mut cleared = BTreeSet::new();

        for rel in to_copy {
            for dir in rel.ancestors() {
                if changeset.deleted.contains(&dir) && !cleared.contains(&dir) {
                    checkpoint(cancel)?;
                    self.delete(&dir)?;
                    cleared.insert(dir);
                }
            }
        }

        for rel in to_copy {
            let path = rel.resolve(&self.live_root);
            if !fs::symlink_metadata(&path).is_ok_and(|m| m.is_dir()) {
                continue;
            }
            checkpoint(cancel)?;
            let inside: Vec<&RelativePath> = changeset
                .deleted
                .iter()
                .filter(|deleted| deleted.is_within(rel))
                .collect();
            for entry in &inside {
                self.delete(entry)?;
                cleared.insert((*entry).clone());
            }

            let mut dirs: Vec<RelativePath> = inside
                .iter()
                .flat_map(|entry| entry.ancestors())
                .filter(|dir| dir.is_within(rel))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            dirs.sort_by_key(|dir| std::cmp::Reverse(dir.depth()));
            dirs.push((*rel).clone());
            for dir in dirs {
                let dir_path = dir.resolve(&self.live_root);
                self.ops
                    .remove_dir(&dir_path)
                    .map_err(|source| ApplyError::Delete {
                        path: dir_path,
                        source,
                    })?;
            }
        }

        if !cleared.is_empty() {
            info!(cleared = cleared.len(), "Cleared entries that change type");
        }
        Ok(cleared)
    }

    fn delete(&self, rel: &RelativePath) -> Result<(), ApplyError> {
        let path = rel.resolve(&self.live_root);
        self.ops
            .remove_file(&path)
            .map_err(|source| ApplyError::Delete { path, source })?;
        debug!(path = %rel, "Deleted");
        Ok(())
    }

    fn create_directories(
        &self,
        to_copy: &BTreeSet<&RelativePath>,
        cancel: &CancellationToken,
    ) -> Result<(), ApplyError> {
        let dirs: BTreeSet<RelativePath> = to_copy.iter().filter_map(|rel| rel.parent()).collect();
        if dirs.is_empty() && !self.live_root.exists() {
            self.create_dir(&self.live_root)?;
        }
        for dir in dirs {
            checkpoint(cancel)?;
            self.create_dir(&dir.resolve(&self.live_root))?;
        }
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> Result<(), ApplyError> {
        self.ops
            .create_dir_all(path)
            .map_err(|source| ApplyError::CreateDir {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Remove directories left with no entries by `deleted`, deepest first.
    /// The live root itself is never removed.
    fn prune_empty_dirs(&self, deleted: &BTreeSet<RelativePath>) -> usize {
        let mut candidates: Vec<RelativePath> = deleted
            .iter()
            .flat_map(RelativePath::ancestors)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        candidates.sort_by_key(|dir| std::cmp::Reverse(dir.depth()));

        let mut pruned = 0;
        for dir in candidates {
            let path = dir.resolve(&self.live_root);
            let is_empty = fs::read_dir(&path)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                continue;
            }
            match self.ops.remove_dir(&path) {
                Ok(()) => {
                    debug!(dir = %dir, "Pruned empty directory");
                    pruned += 1;
                }
                Err(e) => warn!(dir = %dir, "Failed to prune empty directory: {}", e),
            }
        }
        pruned
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), ApplyError> {
    if cancel.is_cancelled() {
        return Err(ApplyError::Cancelled);
    }
    Ok(())
}
