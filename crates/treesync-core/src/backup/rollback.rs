//! Rollback after a failed apply

use super::snapshot::{BackupManager, RestoreReport};
use crate::status::{StatusReporter, SyncPhase};
use std::path::Path;
use tracing::{error, info};

/// Terminal result of a rollback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    /// `RestoredAfterFailure` or `RestoreIncomplete`
    pub phase: SyncPhase,
    pub report: RestoreReport,
}

/// Restores the backup snapshot into the live tree.
///
/// Files that were newly added by the failed apply are left in place; only
/// backed-up (modified or deleted) files are brought back.
pub struct RollbackCoordinator<'a> {
    backup: &'a BackupManager,
}

impl<'a> RollbackCoordinator<'a> {
    pub fn new(backup: &'a BackupManager) -> Self {
        Self { backup }
    }

    /// Restore every backed-up file and record the terminal phase.
    pub fn rollback(&self, live_root: &Path, reporter: &StatusReporter) -> RollbackOutcome {
        reporter.report_with(
            SyncPhase::RollingBack,
            crate::status::ERROR_PERCENT,
            "restoring backup snapshot",
        );

        let report = self.backup.restore(live_root);

        if report.is_complete() {
            info!(restored = report.restored.len(), "Rollback restored the live tree");
            reporter.report_with(
                SyncPhase::RestoredAfterFailure,
                crate::status::ERROR_PERCENT,
                format!("restored {} file(s) after failed apply", report.restored.len()),
            );
            RollbackOutcome {
                phase: SyncPhase::RestoredAfterFailure,
                report,
            }
        } else {
            let mut unrestored: Vec<String> =
                report.failures.iter().map(|f| f.path.to_string()).collect();
            if let Some(snapshot_error) = &report.snapshot_error {
                unrestored.push(format!("<snapshot: {}>", snapshot_error));
            }
            error!(
                failed = unrestored.len(),
                "Rollback incomplete, manual intervention required: {}",
                unrestored.join(", ")
            );
            reporter.fail(
                SyncPhase::RestoreIncomplete,
                format!(
                    "rollback incomplete, {} file(s) not restored: {}",
                    unrestored.len(),
                    unrestored.join(", ")
                ),
            );
            RollbackOutcome {
                phase: SyncPhase::RestoreIncomplete,
                report,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use treesync_fs::{FileOps, RelativePath, StdFileOps};
    use treesync_test_utils::TreeFixture;

    /// Refuses to copy anything back into a path containing `blocked`
    struct BlockingOps {
        blocked: &'static str,
    }

    impl FileOps for BlockingOps {
        fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
            if to.to_string_lossy().contains(self.blocked) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "blocked"));
            }
            StdFileOps.copy(from, to)
        }
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            StdFileOps.remove_file(path)
        }
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            StdFileOps.create_dir_all(path)
        }
        fn remove_dir(&self, path: &Path) -> io::Result<()> {
            StdFileOps.remove_dir(path)
        }
    }

    fn rel(path: &str) -> RelativePath {
        RelativePath::new(path).unwrap()
    }

    #[test]
    fn full_restore_ends_restored_after_failure() {
        let live = TreeFixture::with_files(&[("a.txt", "v1")]);
        let scratch = TreeFixture::new();
        let backup = BackupManager::new(scratch.root().join("backup"), Arc::new(StdFileOps));
        backup.snapshot(live.root(), &[rel("a.txt")], |_, _| {}).unwrap();
        std::fs::write(live.root().join("a.txt"), "v2").unwrap();
        let reporter = StatusReporter::begin(scratch.root().join("status.json")).unwrap();

        let outcome = RollbackCoordinator::new(&backup).rollback(live.root(), &reporter);

        assert_eq!(outcome.phase, SyncPhase::RestoredAfterFailure);
        assert_eq!(std::fs::read_to_string(live.root().join("a.txt")).unwrap(), "v1");
        let status = reporter.current();
        assert_eq!(status.phase, SyncPhase::RestoredAfterFailure);
        assert!(status.is_error());
    }

    #[test]
    fn partial_restore_continues_and_reports_incomplete() {
        let live = TreeFixture::with_files(&[("a.txt", "a1"), ("b.txt", "b1"), ("c.txt", "c1")]);
        let scratch = TreeFixture::new();
        let snapshot_only = BackupManager::new(scratch.root().join("backup"), Arc::new(StdFileOps));
        snapshot_only
            .snapshot(live.root(), &[rel("a.txt"), rel("b.txt"), rel("c.txt")], |_, _| {})
            .unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(live.root().join(name), "clobbered").unwrap();
        }

        let backup = BackupManager::new(
            scratch.root().join("backup"),
            Arc::new(BlockingOps { blocked: "b.txt" }),
        );
        let reporter = StatusReporter::begin(scratch.root().join("status.json")).unwrap();
        let outcome = RollbackCoordinator::new(&backup).rollback(live.root(), &reporter);

        assert_eq!(outcome.phase, SyncPhase::RestoreIncomplete);
        assert_eq!(outcome.report.restored, vec![rel("a.txt"), rel("c.txt")]);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(outcome.report.failures[0].path, rel("b.txt"));
        let tree = TreeFixture::read_tree(live.root());
        assert_eq!(tree["a.txt"], b"a1".to_vec());
        assert_eq!(tree["b.txt"], b"clobbered".to_vec());
        assert_eq!(tree["c.txt"], b"c1".to_vec());
        assert_eq!(reporter.current().phase, SyncPhase::RestoreIncomplete);
    }
}
