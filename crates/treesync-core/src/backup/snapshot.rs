//! Backup snapshot implementation
//!
//! Copies live files into the backup root before they are touched, and
//! copies them back on rollback.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use treesync_fs::{FileOps, RelativePath, TreeWalker, io};

/// Metadata written alongside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// When the snapshot was taken
    pub created: DateTime<Utc>,
    /// Live tree the files were copied from
    pub live_root: PathBuf,
    /// Backed-up files (relative paths)
    pub files: Vec<RelativePath>,
}

/// A file that could not be restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    pub path: RelativePath,
    pub message: String,
}

/// Outcome of a best-effort restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<RelativePath>,
    pub failures: Vec<RestoreFailure>,
    /// Set when the snapshot itself could not be enumerated
    pub snapshot_error: Option<String>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.snapshot_error.is_none()
    }
}

/// Owns the backup root for one sync cycle
pub struct BackupManager {
    /// Root of the backup area
    backup_root: PathBuf,
    ops: Arc<dyn FileOps>,
}

impl BackupManager {
    pub fn new(backup_root: impl Into<PathBuf>, ops: Arc<dyn FileOps>) -> Self {
        Self {
            backup_root: backup_root.into(),
            ops,
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Directory holding the copied files
    pub fn files_dir(&self) -> PathBuf {
        self.backup_root.join("files")
    }

    fn metadata_path(&self) -> PathBuf {
        self.backup_root.join("snapshot.toml")
    }

    /// Remove any previous snapshot.
    pub fn discard(&self) -> Result<()> {
        if self.backup_root.exists() {
            fs::remove_dir_all(&self.backup_root)?;
        }
        Ok(())
    }

    /// Snapshot every listed path that exists under `live_root`.
    ///
    /// Any prior snapshot is discarded first. `progress` is called with
    /// `(done, total)` after each path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backup`] on the first file that cannot be copied;
    /// the snapshot is then incomplete and must not be relied on.
    pub fn snapshot<'a>(
        &self,
        live_root: &Path,
        paths: impl IntoIterator<Item = &'a RelativePath>,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<SnapshotMetadata> {
        let paths: Vec<&RelativePath> = paths.into_iter().collect();
        self.discard()?;
        let files_dir = self.files_dir();
        self.ops
            .create_dir_all(&files_dir)
            .map_err(|source| Error::Backup {
                path: files_dir.clone(),
                source,
            })?;

        let total = paths.len();
        let mut files = Vec::with_capacity(total);
        for (done, rel) in paths.into_iter().enumerate() {
            let source_path = rel.resolve(live_root);
            let present = fs::symlink_metadata(&source_path).is_ok_and(|m| !m.is_dir());
            if present {
                let dest = rel.resolve(&files_dir);
                if let Some(parent) = dest.parent() {
                    self.ops
                        .create_dir_all(parent)
                        .map_err(|source| Error::Backup {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                }
                self.ops
                    .copy(&source_path, &dest)
                    .map_err(|source| Error::Backup {
                        path: source_path.clone(),
                        source,
                    })?;
                debug!(path = %rel, "Backed up");
                files.push(rel.clone());
            } else {
                debug!(path = %rel, "Not present in live tree, nothing to back up");
            }
            progress(done + 1, total);
        }

        let metadata = SnapshotMetadata {
            created: Utc::now(),
            live_root: live_root.to_path_buf(),
            files,
        };
        io::write_text(&self.metadata_path(), &toml::to_string_pretty(&metadata)?)?;
        info!(
            files = metadata.files.len(),
            root = %self.backup_root.display(),
            "Backup snapshot taken"
        );
        Ok(metadata)
    }

    /// Read the metadata of the current snapshot, if one exists.
    pub fn load_metadata(&self) -> Result<Option<SnapshotMetadata>> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = io::read_text(&path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Copy every backed-up file back to its place under `live_root`.
    ///
    /// Best-effort: a file that cannot be restored is logged and recorded
    /// in the report, and the remaining files are still restored.
    pub fn restore(&self, live_root: &Path) -> RestoreReport {
        let mut report = RestoreReport::default();
        let files_dir = self.files_dir();
        if !files_dir.exists() {
            warn!(root = %self.backup_root.display(), "No backup snapshot to restore");
            return report;
        }

        let listing = match TreeWalker::default().list(&files_dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Cannot enumerate backup snapshot: {}", e);
                report.snapshot_error = Some(e.to_string());
                return report;
            }
        };

        for (rel, source_path) in listing {
            let dest = rel.resolve(live_root);
            let result = match dest.parent() {
                Some(parent) => self.ops.create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|_| self.ops.copy(&source_path, &dest));

            match result {
                Ok(()) => {
                    debug!(path = %rel, "Restored");
                    report.restored.push(rel);
                }
                Err(e) => {
                    warn!(path = %rel, "Failed to restore: {}", e);
                    report.failures.push(RestoreFailure {
                        path: rel,
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
