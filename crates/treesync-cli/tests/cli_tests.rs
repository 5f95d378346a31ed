//! End-to-end tests for the treesync binary

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use treesync_test_utils::TreeFixture;

/// Get a Command for the treesync binary
fn treesync_cmd() -> Command {
    let mut cmd = Command::cargo_bin("treesync").expect("Failed to find treesync binary");
    cmd.env_remove("TREESYNC_CONFIG")
        .env_remove("TREESYNC_LOG_FILE")
        .env("NO_COLOR", "1");
    cmd
}

/// Candidate and live trees plus a scratch dir for backup and status
struct Setup {
    candidate: TreeFixture,
    live: TreeFixture,
    scratch: TempDir,
}

impl Setup {
    fn new(candidate: &[(&str, &str)], live: &[(&str, &str)]) -> Self {
        Self {
            candidate: TreeFixture::with_files(candidate),
            live: TreeFixture::with_files(live),
            scratch: TempDir::new().unwrap(),
        }
    }

    fn status_path(&self) -> PathBuf {
        self.scratch.path().join("status.json")
    }

    fn root_args(&self) -> Vec<String> {
        vec![
            "--candidate".into(),
            self.candidate.root().display().to_string(),
            "--live".into(),
            self.live.root().display().to_string(),
            "--backup".into(),
            self.scratch.path().join("backup").display().to_string(),
            "--status".into(),
            self.status_path().display().to_string(),
        ]
    }

    fn run(&self, extra: &[&str]) -> Command {
        let mut cmd = treesync_cmd();
        cmd.arg("run").args(self.root_args()).args(extra);
        cmd
    }

    fn status_json(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.status_path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

// ============================================================================
// run
// ============================================================================

#[test]
fn run_applies_changes_and_records_completed() {
    let setup = Setup::new(
        &[("a.txt", "v2"), ("new/b.txt", "b")],
        &[("a.txt", "v1"), ("gone.txt", "x")],
    );

    setup
        .run(&[])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applying 1 new, 1 modified, 1 deleted"))
        .stdout(predicate::str::contains("Synced"));

    setup.live.assert_file("a.txt", "v2");
    setup.live.assert_file("new/b.txt", "b");
    setup.live.assert_absent("gone.txt");
    let status = setup.status_json();
    assert_eq!(status["phase"], "completed");
    assert_eq!(status["percent"], 100);
}

#[test]
fn run_with_identical_trees_is_noop() {
    let setup = Setup::new(&[("a.txt", "same")], &[("a.txt", "same")]);

    setup
        .run(&[])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes needed"));

    assert_eq!(setup.status_json()["phase"], "no_changes_noop");
}

#[test]
fn run_with_progress_prints_phases() {
    let setup = Setup::new(&[("a.txt", "a")], &[]);

    setup
        .run(&["--progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));
}

#[cfg(unix)]
#[test]
fn rejected_candidate_leaves_live_untouched() {
    let setup = Setup::new(&[("a.ps1", "broken"), ("b.txt", "b")], &[("a.ps1", "old")]);

    setup
        .run(&["--ext", "ps1", "--check", "false", "--keep-candidate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CANCELLED"))
        .stdout(predicate::str::contains("a.ps1"));

    setup.live.assert_file("a.ps1", "old");
    setup.live.assert_absent("b.txt");
    setup.candidate.assert_file("a.ps1", "broken");
    assert_eq!(setup.status_json()["phase"], "cancelled_noop");
}

#[cfg(unix)]
#[test]
fn check_applies_only_to_listed_extensions() {
    let setup = Setup::new(&[("notes.txt", "n")], &[]);

    setup
        .run(&["--ext", "ps1", "--check", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Synced"));

    setup.live.assert_file("notes.txt", "n");
}

#[test]
fn run_without_roots_fails_with_user_error() {
    treesync_cmd()
        .args(["run", "--candidate", "somewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("--live"));
}

#[test]
fn run_rejects_backup_inside_live() {
    let setup = Setup::new(&[("a.txt", "a")], &[]);
    let backup_inside = setup.live.root().join(".backup");

    treesync_cmd()
        .args(["run", "--candidate"])
        .arg(setup.candidate.root())
        .arg("--live")
        .arg(setup.live.root())
        .arg("--backup")
        .arg(&backup_inside)
        .arg("--status")
        .arg(setup.status_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("overlaps"));

    assert!(!setup.status_path().exists());
}

#[test]
fn run_reads_roots_from_config_file() {
    let setup = Setup::new(&[("a.txt", "a")], &[]);
    let config = setup.scratch.path().join("treesync.toml");
    std::fs::write(
        &config,
        format!(
            "candidate_root = {:?}\nlive_root = {:?}\nbackup_root = {:?}\nstatus_path = {:?}\n",
            setup.candidate.root().display().to_string(),
            setup.live.root().display().to_string(),
            setup.scratch.path().join("backup").display().to_string(),
            setup.status_path().display().to_string(),
        ),
    )
    .unwrap();

    treesync_cmd()
        .args(["run", "--config", config.to_str().unwrap()])
        .assert()
        .success();

    setup.live.assert_file("a.txt", "a");
}

#[test]
fn run_appends_to_log_file() {
    let setup = Setup::new(&[("a.txt", "a")], &[]);
    let log = setup.scratch.path().join("treesync.log");

    setup
        .run(&["--log-file", log.to_str().unwrap()])
        .assert()
        .success();

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("Changeset applied"));
}

// ============================================================================
// diff
// ============================================================================

#[test]
fn diff_lists_changes_without_applying() {
    let setup = Setup::new(&[("a.txt", "v2"), ("b.txt", "b")], &[("a.txt", "v1"), ("c.txt", "c")]);

    treesync_cmd()
        .args(["diff", "--candidate"])
        .arg(setup.candidate.root())
        .arg("--live")
        .arg(setup.live.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("+ b.txt"))
        .stdout(predicate::str::contains("~ a.txt"))
        .stdout(predicate::str::contains("- c.txt"));

    setup.live.assert_file("a.txt", "v1");
}

#[test]
fn diff_json_output() {
    let setup = Setup::new(&[("a.txt", "v2"), ("b.txt", "b")], &[("a.txt", "v1"), ("c.txt", "c")]);

    let output = treesync_cmd()
        .args(["diff", "--json", "--candidate"])
        .arg(setup.candidate.root())
        .arg("--live")
        .arg(setup.live.root())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["has_changes"], true);
    assert_eq!(json["new"], serde_json::json!(["b.txt"]));
    assert_eq!(json["modified"], serde_json::json!(["a.txt"]));
    assert_eq!(json["deleted"], serde_json::json!(["c.txt"]));
}

#[test]
fn diff_of_identical_trees_reports_no_changes() {
    let setup = Setup::new(&[("a.txt", "a")], &[("a.txt", "a")]);

    treesync_cmd()
        .args(["diff", "--candidate"])
        .arg(setup.candidate.root())
        .arg("--live")
        .arg(setup.live.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes needed"));
}

// ============================================================================
// status
// ============================================================================

#[test]
fn status_without_record() {
    let scratch = TempDir::new().unwrap();

    treesync_cmd()
        .args(["status", "--status"])
        .arg(scratch.path().join("status.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No sync cycle recorded"));
}

#[test]
fn status_after_run_shows_terminal_phase() {
    let setup = Setup::new(&[("a.txt", "a")], &[]);
    setup.run(&[]).assert().success();

    treesync_cmd()
        .args(["status", "--status"])
        .arg(setup.status_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Phase: completed"))
        .stdout(predicate::str::contains("Progress: 100%"));

    let output = treesync_cmd()
        .args(["status", "--json", "--status"])
        .arg(setup.status_path())
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["phase"], "completed");
}

#[test]
fn help_lists_commands() {
    treesync_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("status"));
}
