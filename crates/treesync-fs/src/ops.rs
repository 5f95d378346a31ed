//! Mutating filesystem operations
//!
//! Every write the engine performs against the live tree or the backup root
//! goes through [`FileOps`], so the mutation primitives can be swapped
//! (for instance to inject a failure part-way through an apply).

use crate::io::temp_sibling;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Primitive file mutations used by backup, apply and restore.
pub trait FileOps: Send + Sync {
    /// Copy a single entry, replacing whatever is at `to`.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a single file or symbolic link.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`FileOps`] backed by `std::fs`.
///
/// `copy` stages the new content in a sibling temp file and renames it over
/// `to`. Readers of `to` see either the old or the new content, a crash
/// leaves the old content in place, and a symbolic link at `to` is replaced
/// rather than written through. A symbolic link at `from` is copied as a
/// link.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let temp = temp_sibling(to);
        let staged = if fs::symlink_metadata(from)?.file_type().is_symlink() {
            copy_link(from, &temp)
        } else {
            fs::copy(from, &temp).and_then(|_| File::open(&temp)?.sync_all())
        };

        match staged.and_then(|()| fs::rename(&temp, to)) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&temp);
                Err(e)
            }
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(windows)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    if fs::metadata(from).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(target, to)
    } else {
        std::os::windows::fs::symlink_file(target, to)
    }
}
