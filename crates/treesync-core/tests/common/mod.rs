//! Shared helpers for treesync-core integration tests

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use treesync_core::{StatusRecord, StatusReporter, SyncConfig};
use treesync_fs::{FileOps, StdFileOps};
use treesync_test_utils::TreeFixture;

/// Candidate, live and scratch (backup + status) trees for one test
pub struct Workspace {
    pub candidate: TreeFixture,
    pub live: TreeFixture,
    pub scratch: TreeFixture,
}

impl Workspace {
    pub fn new(candidate: &[(&str, &str)], live: &[(&str, &str)]) -> Self {
        Self {
            candidate: TreeFixture::with_files(candidate),
            live: TreeFixture::with_files(live),
            scratch: TreeFixture::new(),
        }
    }

    pub fn backup_root(&self) -> PathBuf {
        self.scratch.root().join("backup")
    }

    pub fn status_path(&self) -> PathBuf {
        self.scratch.root().join("status.json")
    }

    pub fn config(&self) -> SyncConfig {
        SyncConfig::new(
            self.candidate.root(),
            self.live.root(),
            self.backup_root(),
            self.status_path(),
        )
    }
}

/// Fails the `fail_on`-th copy into `live_root` (1-based). After the
/// failure it records the persisted status seen by each later live copy.
pub struct FailingOps {
    pub live_root: PathBuf,
    pub status_path: PathBuf,
    pub fail_on: usize,
    live_copies: AtomicUsize,
    pub observed: Mutex<Vec<StatusRecord>>,
}

impl FailingOps {
    pub fn new(live_root: &Path, status_path: &Path, fail_on: usize) -> Arc<Self> {
        Arc::new(Self {
            live_root: live_root.to_path_buf(),
            status_path: status_path.to_path_buf(),
            fail_on,
            live_copies: AtomicUsize::new(0),
            observed: Mutex::new(Vec::new()),
        })
    }
}

impl FileOps for FailingOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.starts_with(&self.live_root) {
            let n = self.live_copies.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(io::Error::other("simulated disk failure"));
            }
            if n > self.fail_on
                && let Ok(Some(record)) = StatusReporter::read(&self.status_path)
            {
                self.observed.lock().unwrap().push(record);
            }
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

/// Blocks the first copy into `live_root` until released.
pub struct GatedOps {
    live_root: PathBuf,
    entered: Mutex<Option<Sender<()>>>,
    release: Mutex<Option<Receiver<()>>>,
}

impl GatedOps {
    /// Returns the ops, a receiver signalled when the first live copy
    /// starts, and a sender that lets it proceed.
    pub fn new(live_root: &Path) -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let ops = Arc::new(Self {
            live_root: live_root.to_path_buf(),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        (ops, entered_rx, release_tx)
    }
}

impl FileOps for GatedOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.starts_with(&self.live_root) {
            let entered = self.entered.lock().unwrap().take();
            if let Some(entered) = entered {
                let _ = entered.send(());
                let release = self.release.lock().unwrap().take();
                if let Some(release) = release {
                    let _ = release.recv();
                }
            }
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

/// Records any live-tree mutation of an existing file that happens before
/// its backup copy exists.
pub struct BackupAuditOps {
    pub live_root: PathBuf,
    pub backup_files: PathBuf,
    pub violations: Mutex<Vec<String>>,
    pub audited: AtomicUsize,
}

impl BackupAuditOps {
    pub fn new(live_root: &Path, backup_root: &Path) -> Arc<Self> {
        Arc::new(Self {
            live_root: live_root.to_path_buf(),
            backup_files: backup_root.join("files"),
            violations: Mutex::new(Vec::new()),
            audited: AtomicUsize::new(0),
        })
    }

    fn audit(&self, live_path: &Path) {
        if let Ok(rel) = live_path.strip_prefix(&self.live_root)
            && live_path.is_file()
        {
            self.audited.fetch_add(1, Ordering::SeqCst);
            if !self.backup_files.join(rel).is_file() {
                self.violations
                    .lock()
                    .unwrap()
                    .push(rel.display().to_string());
            }
        }
    }
}

impl FileOps for BackupAuditOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.audit(to);
        StdFileOps.copy(from, to)
    }
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.audit(path);
        StdFileOps.remove_file(path)
    }
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        StdFileOps.create_dir_all(path)
    }
    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        StdFileOps.remove_dir(path)
    }
}
