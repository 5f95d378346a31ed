//! Command implementations for treesync-cli

pub mod diff;
pub mod run;
pub mod status;

pub use diff::run_diff;
pub use run::run_sync;
pub use status::run_status;

use std::path::PathBuf;

use treesync_core::SyncSettings;

use crate::cli::RootArgs;
use crate::error::{CliError, Result};

fn required(flag: &Option<PathBuf>, name: &str) -> Result<PathBuf> {
    flag.clone()
        .ok_or_else(|| CliError::user(format!("missing --{} (or pass --config)", name)))
}

/// Build settings from `--config` (if any) overlaid with explicit flags.
pub(crate) fn resolve_settings(roots: &RootArgs) -> Result<SyncSettings> {
    let mut settings = match &roots.config {
        Some(path) => SyncSettings::load(path)?,
        None => SyncSettings::new(
            required(&roots.candidate, "candidate")?,
            required(&roots.live, "live")?,
            required(&roots.backup, "backup")?,
            required(&roots.status, "status")?,
        ),
    };

    if let Some(candidate) = &roots.candidate {
        settings.candidate_root = candidate.clone();
    }
    if let Some(live) = &roots.live {
        settings.live_root = live.clone();
    }
    if let Some(backup) = &roots.backup {
        settings.backup_root = backup.clone();
    }
    if let Some(status) = &roots.status {
        settings.status_path = status.clone();
    }
    if !roots.ignore.is_empty() {
        settings.ignore = roots.ignore.clone();
    }
    Ok(settings)
}

/// Resolve only the status file path.
pub(crate) fn resolve_status_path(roots: &RootArgs) -> Result<PathBuf> {
    match (&roots.status, &roots.config) {
        (Some(path), _) => Ok(path.clone()),
        (None, Some(config)) => Ok(SyncSettings::load(config)?.status_path),
        (None, None) => required(&None, "status"),
    }
}

/// Resolve the candidate and live roots plus the ignore list for `diff`.
pub(crate) fn resolve_trees(roots: &RootArgs) -> Result<(PathBuf, PathBuf, Vec<String>)> {
    if roots.config.is_some() {
        let settings = resolve_settings(roots)?;
        return Ok((settings.candidate_root, settings.live_root, settings.ignore));
    }
    // backup/status are irrelevant to a preview
    let placeholder = SyncSettings::new(
        required(&roots.candidate, "candidate")?,
        required(&roots.live, "live")?,
        PathBuf::new(),
        PathBuf::new(),
    );
    let ignore = if roots.ignore.is_empty() {
        placeholder.ignore
    } else {
        roots.ignore.clone()
    };
    Ok((placeholder.candidate_root, placeholder.live_root, ignore))
}
