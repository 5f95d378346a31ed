//! Diff command implementation
//!
//! Previews the changeset a sync would apply without validating or
//! touching either tree.

use std::path::Path;

use colored::Colorize;
use serde_json::json;

use treesync_core::{ChangeDetector, ChangeKind, Changeset};
use treesync_fs::TreeWalker;

use super::resolve_trees;
use crate::cli::RootArgs;
use crate::error::Result;

/// Run the diff command
pub fn run_diff(roots: &RootArgs, json: bool) -> Result<()> {
    let (candidate, live, ignore) = resolve_trees(roots)?;
    let changeset = ChangeDetector::new(TreeWalker::new(ignore)).detect(&candidate, &live)?;

    if json {
        let output = json!({
            "has_changes": !changeset.is_empty(),
            "new": changeset.new,
            "modified": changeset.modified,
            "deleted": changeset.deleted,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_diff_output(&changeset, &live);
    }

    Ok(())
}

/// Print human-readable diff-style output
fn print_diff_output(changeset: &Changeset, live: &Path) {
    if changeset.is_empty() {
        println!(
            "{} No changes needed. Live tree is up to date.",
            "OK".green().bold()
        );
        return;
    }

    println!(
        "{} {}",
        "Diff".blue().bold(),
        live.display().to_string().yellow()
    );
    println!();

    for (kind, path) in changeset.entries() {
        let line = match kind {
            ChangeKind::New => format!("+ {}", path).green(),
            ChangeKind::Modified => format!("~ {}", path).yellow(),
            ChangeKind::Deleted => format!("- {}", path).red(),
        };
        println!("  {}", line);
    }

    println!();
    println!(
        "{} new, {} modified, {} deleted",
        changeset.new.len(),
        changeset.modified.len(),
        changeset.deleted.len()
    );
}
