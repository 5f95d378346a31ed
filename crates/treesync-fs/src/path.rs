//! Tree-relative path handling
//!
//! Every path that travels between the candidate tree, the live tree and the
//! backup root is carried as a [`RelativePath`]: forward slashes internally,
//! converted to a platform-native path only when joined onto a root.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A normalized, forward-slash path relative to the root of a tree.
///
/// Construction strips `.` and empty segments and rejects anything that
/// could resolve outside the root it is later joined onto (absolute paths,
/// drive prefixes and `..` components).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl RelativePath {
    /// Parse a relative path from a string, accepting either separator.
    pub fn new(path: &str) -> Result<Self> {
        let unified = path.replace('\\', "/");
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(Error::PathEscape {
                path: path.to_string(),
            });
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::PathEscape {
                        path: path.to_string(),
                    });
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(Error::PathEscape {
                path: path.to_string(),
            });
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Build the relative path of `path` with respect to `root`.
    pub fn from_root(root: &Path, path: &Path) -> Result<Self> {
        let stripped = path.strip_prefix(root).map_err(|_| Error::PathEscape {
            path: path.display().to_string(),
        })?;

        let mut segments = Vec::new();
        for component in stripped.components() {
            match component {
                Component::Normal(part) => match part.to_str() {
                    Some(part) => segments.push(part),
                    None => {
                        return Err(Error::NonUtf8Name {
                            path: path.to_path_buf(),
                        });
                    }
                },
                Component::CurDir => continue,
                _ => {
                    return Err(Error::PathEscape {
                        path: path.display().to_string(),
                    });
                }
            }
        }
        Self::new(&segments.join("/"))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Resolve this path beneath `root` as a platform-native path.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut resolved = root.to_path_buf();
        for segment in self.inner.split('/') {
            resolved.push(segment);
        }
        resolved
    }

    /// Get the parent directory, or `None` for a top-level entry.
    pub fn parent(&self) -> Option<Self> {
        self.inner.rfind('/').map(|idx| Self {
            inner: self.inner[..idx].to_string(),
        })
    }

    /// All proper ancestors, deepest first.
    pub fn ancestors(&self) -> Vec<Self> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(dir) = current {
            current = dir.parent();
            ancestors.push(dir);
        }
        ancestors
    }

    /// Whether this path lies strictly beneath the directory `dir`.
    pub fn is_within(&self, dir: &RelativePath) -> bool {
        self.inner
            .strip_prefix(dir.inner.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Get the file name component.
    pub fn file_name(&self) -> &str {
        self.inner.rsplit('/').next().unwrap_or(&self.inner)
    }

    /// Number of segments; `a/b/c.txt` has depth 3.
    pub fn depth(&self) -> usize {
        self.inner.split('/').count()
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        let idx = name.rfind('.')?;
        if idx == 0 { None } else { Some(&name[idx + 1..]) }
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(p: RelativePath) -> Self {
        p.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a.txt", "a.txt")]
    #[case("b\\c.txt", "b/c.txt")]
    #[case("./b//c.txt", "b/c.txt")]
    #[case("b/./c/", "b/c")]
    fn normalizes_separators_and_dots(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(RelativePath::new(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("/etc/passwd")]
    #[case("../outside.txt")]
    #[case("a/../../b")]
    #[case("C:\\Windows")]
    #[case("")]
    #[case("./")]
    fn rejects_paths_that_leave_the_tree(#[case] input: &str) {
        assert!(matches!(
            RelativePath::new(input),
            Err(Error::PathEscape { .. })
        ));
    }

    #[test]
    fn from_root_strips_prefix() {
        let root = Path::new("/srv/live");
        let path = root.join("scripts").join("run.ps1");
        let rel = RelativePath::from_root(root, &path).unwrap();
        assert_eq!(rel.as_str(), "scripts/run.ps1");
    }

    #[test]
    fn from_root_rejects_foreign_path() {
        let result = RelativePath::from_root(Path::new("/srv/live"), Path::new("/srv/other/a"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn from_root_rejects_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/srv/live");
        let path = root.join(OsStr::from_bytes(b"stale\xff.txt"));
        assert!(matches!(
            RelativePath::from_root(root, &path),
            Err(Error::NonUtf8Name { .. })
        ));
    }

    #[test]
    fn resolve_joins_every_segment() {
        let rel = RelativePath::new("a/b/c.txt").unwrap();
        assert_eq!(
            rel.resolve(Path::new("/root")),
            Path::new("/root").join("a").join("b").join("c.txt")
        );
    }

    #[test]
    fn ancestors_are_deepest_first() {
        let rel = RelativePath::new("a/b/c.txt").unwrap();
        let ancestors: Vec<_> = rel.ancestors().into_iter().map(String::from).collect();
        assert_eq!(ancestors, vec!["a/b".to_string(), "a".to_string()]);
        assert!(RelativePath::new("top.txt").unwrap().ancestors().is_empty());
    }

    #[rstest]
    #[case("a/b.txt", "a", true)]
    #[case("a/b/c.txt", "a", true)]
    #[case("a", "a", false)]
    #[case("ab/c.txt", "a", false)]
    fn is_within_matches_whole_segments(
        #[case] path: &str,
        #[case] dir: &str,
        #[case] expected: bool,
    ) {
        let path = RelativePath::new(path).unwrap();
        let dir = RelativePath::new(dir).unwrap();
        assert_eq!(path.is_within(&dir), expected);
    }

    #[test]
    fn extension_ignores_dotfiles() {
        assert_eq!(RelativePath::new("x/run.PS1").unwrap().extension(), Some("PS1"));
        assert_eq!(RelativePath::new(".gitignore").unwrap().extension(), None);
    }

    #[test]
    fn deserialize_rejects_escape() {
        let result: std::result::Result<RelativePath, _> = serde_json::from_str("\"../x\"");
        assert!(result.is_err());
    }
}
