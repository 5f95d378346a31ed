//! Shared test utilities for the treesync workspace.
//!
//! Dev-dependency only, never published. Provides [`TreeFixture`], a
//! temporary directory tree built from `(path, content)` pairs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A temporary directory tree with helpers for setup and assertion.
///
/// # Example
///
/// ```rust
/// use treesync_test_utils::TreeFixture;
///
/// let tree = TreeFixture::with_files(&[("a.txt", "a"), ("b/c.txt", "c")]);
/// tree.assert_file("b/c.txt", "c");
/// assert_eq!(TreeFixture::read_tree(tree.root()).len(), 2);
/// ```
pub struct TreeFixture {
    temp_dir: TempDir,
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeFixture {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a tree holding the given files (forward-slash paths).
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let tree = Self::new();
        for (path, content) in files {
            tree.write(path, content);
        }
        tree
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    /// Assert that a file exists with the given content.
    pub fn assert_file(&self, path: &str, expected: &str) {
        let full = self.root().join(path);
        let actual = fs::read_to_string(&full)
            .unwrap_or_else(|e| panic!("expected file {} to exist: {}", path, e));
        assert_eq!(actual, expected, "content mismatch for {}", path);
    }

    /// Assert that nothing exists at `path`.
    pub fn assert_absent(&self, path: &str) {
        assert!(
            !self.root().join(path).exists(),
            "expected {} to be absent",
            path
        );
    }

    /// Read every regular file under `root` into a map keyed by
    /// forward-slash relative path. A missing root reads as empty.
    pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut tree = BTreeMap::new();
        if !root.exists() {
            return tree;
        }
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            tree.insert(rel, fs::read(entry.path()).unwrap());
        }
        tree
    }
}
