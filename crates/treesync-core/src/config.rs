//! Sync configuration
//!
//! [`SyncSettings`] is the serializable part (paths and policies) that can be
//! loaded from a config file. [`SyncConfig`] adds the injected collaborators
//! and is what the orchestrator is constructed from.

use crate::validation::{AcceptAll, FileCheck};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treesync_fs::{ConfigStore, FileOps, StdFileOps};

fn default_ignore() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_true() -> bool {
    true
}

/// File-loadable sync settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Where the freshly fetched tree is materialized
    pub candidate_root: PathBuf,
    /// The tree kept up to date
    pub live_root: PathBuf,
    /// Scratch space for the current cycle's backup snapshot
    pub backup_root: PathBuf,
    /// Persisted status record polled by observers
    pub status_path: PathBuf,
    /// Path-component names excluded from both trees
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
    /// Extensions eligible for validation; empty means every file
    #[serde(default)]
    pub validation_extensions: Vec<String>,
    /// Remove the candidate tree when it is rejected or fails to fetch
    #[serde(default = "default_true")]
    pub discard_rejected_candidate: bool,
}

impl SyncSettings {
    /// Settings with the default ignore list, every file validated and
    /// rejected candidates discarded.
    pub fn new(
        candidate_root: impl Into<PathBuf>,
        live_root: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
        status_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            candidate_root: candidate_root.into(),
            live_root: live_root.into(),
            backup_root: backup_root.into(),
            status_path: status_path.into(),
            ignore: default_ignore(),
            validation_extensions: Vec::new(),
            discard_rejected_candidate: true,
        }
    }

    /// Load settings from a `.toml`, `.json` or `.yaml` file.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Attach the default collaborators.
    pub fn into_config(self) -> SyncConfig {
        SyncConfig {
            settings: self,
            check: Arc::new(AcceptAll),
            ops: Arc::new(StdFileOps),
        }
    }
}

/// Everything the orchestrator needs for one live tree
#[derive(Clone)]
pub struct SyncConfig {
    pub settings: SyncSettings,
    /// Per-file validation check
    pub check: Arc<dyn FileCheck>,
    /// Mutation primitives used by backup, apply and restore
    pub ops: Arc<dyn FileOps>,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SyncConfig {
    pub fn new(
        candidate_root: impl Into<PathBuf>,
        live_root: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
        status_path: impl Into<PathBuf>,
    ) -> Self {
        SyncSettings::new(candidate_root, live_root, backup_root, status_path).into_config()
    }

    pub fn with_check(mut self, check: impl FileCheck + 'static) -> Self {
        self.check = Arc::new(check);
        self
    }

    pub fn with_ops(mut self, ops: Arc<dyn FileOps>) -> Self {
        self.ops = ops;
        self
    }

    pub fn with_extensions(
        mut self,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.settings.validation_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignore(mut self, ignore: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.settings.ignore = ignore.into_iter().map(Into::into).collect();
        self
    }

    /// Leave a rejected candidate tree on disk.
    pub fn keep_rejected_candidate(mut self) -> Self {
        self.settings.discard_rejected_candidate = false;
        self
    }

    /// Lock file guarding single-flight cycles against this live tree.
    ///
    /// Keyed on the canonical live root and placed beside it as
    /// `.<name>.treesync.lock`, so every configuration naming the same live
    /// tree contends for the same lock whatever its status or backup paths.
    pub fn lock_path(&self) -> Result<PathBuf> {
        let live = resolve(&self.settings.live_root);
        match (live.parent(), live.file_name()) {
            (Some(parent), Some(name)) => {
                let mut lock_name = OsString::from(".");
                lock_name.push(name);
                lock_name.push(".treesync.lock");
                Ok(parent.join(lock_name))
            }
            _ => Err(invalid(format!(
                "live root {} has no parent directory to hold the cycle lock",
                live.display()
            ))),
        }
    }

    /// Check that the roots do not overlap.
    ///
    /// The backup root is wiped at the start of every cycle, and the status
    /// file would otherwise be classified as part of a tree.
    pub fn validate(&self) -> Result<()> {
        let s = &self.settings;
        let candidate = resolve(&s.candidate_root);
        let live = resolve(&s.live_root);
        let backup = resolve(&s.backup_root);
        let status = resolve(&s.status_path);

        if candidate.starts_with(&live) || live.starts_with(&candidate) {
            return Err(invalid(format!(
                "candidate root {} overlaps the live root {}",
                candidate.display(),
                live.display()
            )));
        }
        for (name, root) in [("live", &live), ("candidate", &candidate)] {
            if backup.starts_with(root) || root.starts_with(&backup) {
                return Err(invalid(format!(
                    "backup root {} overlaps the {} root {}",
                    backup.display(),
                    name,
                    root.display()
                )));
            }
        }
        for (name, root) in [("live", &live), ("candidate", &candidate), ("backup", &backup)] {
            if status.starts_with(root) {
                return Err(invalid(format!(
                    "status file {} lies inside the {} root",
                    status.display(),
                    name
                )));
            }
        }
        self.lock_path()?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig {
        message: message.into(),
    }
}

/// Canonicalize when the path exists, otherwise canonicalize the nearest
/// existing ancestor and re-append the rest.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = dunce::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => resolve(parent).join(name),
        _ => path.to_path_buf(),
    }
}
