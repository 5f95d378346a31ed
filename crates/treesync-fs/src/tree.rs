//! Recursive tree enumeration
//!
//! Lists the entries beneath a root, keyed by their [`RelativePath`].
//! Directories are implied by the entries they contain. Symbolic links are
//! listed as entries of their own and never followed, so a link in the live
//! tree is classified like any other path instead of being written through.

use crate::{Error, RelativePath, Result};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Entries under a root, ordered by relative path.
pub type TreeListing = BTreeMap<RelativePath, PathBuf>;

/// Walks a tree, skipping any subtree whose name is in the ignore list.
#[derive(Debug, Clone, Default)]
pub struct TreeWalker {
    ignore: Vec<String>,
}

impl TreeWalker {
    /// Create a walker that skips entries named in `ignore` (e.g. `.git`).
    pub fn new(ignore: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ignore: ignore.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether an entry with this file name is skipped, along with its subtree.
    pub fn is_ignored(&self, name: &OsStr) -> bool {
        self.ignore.iter().any(|ignored| name == OsStr::new(ignored))
    }

    /// List every regular file and symbolic link under `root`.
    ///
    /// Other special files (sockets, FIFOs, devices) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Walk`] if `root` or any directory beneath it cannot
    /// be read, and [`Error::NonUtf8Name`] for an entry whose name cannot be
    /// carried as a [`RelativePath`].
    pub fn list(&self, root: &Path) -> Result<TreeListing> {
        let mut listing = TreeListing::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| Error::Walk {
                root: root.to_path_buf(),
                message: e.to_string(),
            })?;
            let file_type = entry.file_type();
            if entry.depth() == 0 || file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() && !file_type.is_symlink() {
                debug!(path = %entry.path().display(), "Skipping special file");
                continue;
            }
            let rel = RelativePath::from_root(root, entry.path())?;
            listing.insert(rel, entry.into_path());
        }

        debug!(root = %root.display(), entries = listing.len(), "Listed tree");
        Ok(listing)
    }
}
