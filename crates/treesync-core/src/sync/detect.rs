//! Changeset computation between a candidate tree and the live tree

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use treesync_fs::{RelativePath, TreeWalker, fingerprint_file};

/// How a path differs between the candidate and live trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    New,
    Modified,
    Deleted,
}

/// Three disjoint sets of tree-relative paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// In the candidate, absent from live
    pub new: BTreeSet<RelativePath>,
    /// In both, with differing content
    pub modified: BTreeSet<RelativePath>,
    /// In live, absent from the candidate
    pub deleted: BTreeSet<RelativePath>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.modified.len() + self.deleted.len()
    }

    /// Paths copied from the candidate into live (New ∪ Modified), ordered.
    pub fn to_copy(&self) -> BTreeSet<&RelativePath> {
        self.new.iter().chain(self.modified.iter()).collect()
    }

    /// Paths whose live content must be backed up (Modified ∪ Deleted), ordered.
    pub fn to_back_up(&self) -> BTreeSet<&RelativePath> {
        self.modified.iter().chain(self.deleted.iter()).collect()
    }

    /// Every entry tagged with its kind, in path order within each kind.
    pub fn entries(&self) -> impl Iterator<Item = (ChangeKind, &RelativePath)> {
        self.new
            .iter()
            .map(|p| (ChangeKind::New, p))
            .chain(self.modified.iter().map(|p| (ChangeKind::Modified, p)))
            .chain(self.deleted.iter().map(|p| (ChangeKind::Deleted, p)))
    }
}

/// Walks two trees and classifies their differences
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    walker: TreeWalker,
}

impl ChangeDetector {
    pub fn new(walker: TreeWalker) -> Self {
        Self { walker }
    }

    /// Compute the changeset that turns `live_root` into `candidate_root`.
    ///
    /// A missing live root means every candidate file is new.
    ///
    /// # Errors
    ///
    /// Returns an error if either tree cannot be enumerated or a file
    /// cannot be fingerprinted.
    pub fn detect(&self, candidate_root: &Path, live_root: &Path) -> Result<Changeset> {
        let candidate = self.walker.list(candidate_root)?;
        let mut changeset = Changeset::default();

        if !live_root.exists() {
            changeset.new = candidate.into_keys().collect();
            info!(new = changeset.new.len(), "Live tree absent, every candidate file is new");
            return Ok(changeset);
        }

        // Entries still present after the loop were never matched
        let mut live_index = self.walker.list(live_root)?;

        for (rel, candidate_path) in candidate {
            match live_index.remove(&rel) {
                None => {
                    changeset.new.insert(rel);
                }
                Some(live_path) => {
                    if entry_differs(&candidate_path, &live_path)? {
                        changeset.modified.insert(rel);
                    } else {
                        debug!(path = %rel, "Unchanged");
                    }
                }
            }
        }
        changeset.deleted = live_index.into_keys().collect();

        info!(
            new = changeset.new.len(),
            modified = changeset.modified.len(),
            deleted = changeset.deleted.len(),
            "Changeset computed"
        );
        Ok(changeset)
    }
}

/// Symbolic links are compared by target and never followed. A link on
/// one side and a file on the other always differ. Files compare sizes
/// first and fall back to fingerprints.
fn entry_differs(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = fs::symlink_metadata(a).map_err(|e| treesync_fs::Error::io(a, e))?;
    let meta_b = fs::symlink_metadata(b).map_err(|e| treesync_fs::Error::io(b, e))?;

    match (meta_a.file_type().is_symlink(), meta_b.file_type().is_symlink()) {
        (false, false) => {}
        (true, true) => {
            let target_a = fs::read_link(a).map_err(|e| treesync_fs::Error::io(a, e))?;
            let target_b = fs::read_link(b).map_err(|e| treesync_fs::Error::io(b, e))?;
            return Ok(target_a != target_b);
        }
        _ => return Ok(true),
    }

    if meta_a.len() != meta_b.len() {
        return Ok(true);
    }
    Ok(fingerprint_file(a)? != fingerprint_file(b)?)
}
