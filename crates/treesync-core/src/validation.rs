//! Pre-apply validation of the candidate tree
//!
//! The gate runs an injected per-file check over every eligible candidate
//! file and aggregates the results. It fails closed: a candidate with no
//! eligible files is rejected.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use treesync_fs::{RelativePath, TreeWalker};

/// Result of checking one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub ok: bool,
    pub reason: String,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            ok: true,
            reason: String::new(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Per-file check supplied by the caller (e.g. a script syntax checker)
pub trait FileCheck: Send + Sync {
    fn check(&self, path: &Path) -> CheckOutcome;
}

impl<F> FileCheck for F
where
    F: Fn(&Path) -> CheckOutcome + Send + Sync,
{
    fn check(&self, path: &Path) -> CheckOutcome {
        self(path)
    }
}

/// Check that accepts every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl FileCheck for AcceptAll {
    fn check(&self, _path: &Path) -> CheckOutcome {
        CheckOutcome::pass()
    }
}

/// A file rejected by the check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub path: RelativePath,
    pub reason: String,
}

/// Aggregated outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    /// Number of eligible files checked
    pub checked: usize,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        if self.checked == 0 {
            "no eligible files found in candidate".to_string()
        } else if self.passed {
            format!("{} file(s) passed validation", self.checked)
        } else {
            format!(
                "{} of {} file(s) failed validation",
                self.failures.len(),
                self.checked
            )
        }
    }
}

/// Runs a [`FileCheck`] over the eligible files of a candidate tree
pub struct ValidationGate {
    check: Arc<dyn FileCheck>,
    /// Lowercased, without leading dots
    extensions: Vec<String>,
    walker: TreeWalker,
}

impl ValidationGate {
    pub fn new(check: Arc<dyn FileCheck>, extensions: &[String], walker: TreeWalker) -> Self {
        Self {
            check,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            walker,
        }
    }

    fn is_eligible(&self, path: &RelativePath) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Check every eligible file under `candidate_root`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidate tree cannot be enumerated; a
    /// failing check is reported through [`ValidationReport::passed`].
    pub fn validate(&self, candidate_root: &Path) -> Result<ValidationReport> {
        let listing = self.walker.list(candidate_root)?;
        let mut checked = 0;
        let mut failures = Vec::new();

        for (rel, path) in listing.iter().filter(|(rel, _)| self.is_eligible(rel)) {
            checked += 1;
            let outcome = self.check.check(path);
            if outcome.ok {
                debug!(path = %rel, "Validation passed");
            } else {
                warn!(path = %rel, reason = %outcome.reason, "Validation failed");
                failures.push(ValidationFailure {
                    path: rel.clone(),
                    reason: outcome.reason,
                });
            }
        }

        Ok(ValidationReport {
            passed: checked > 0 && failures.is_empty(),
            checked,
            failures,
        })
    }
}
