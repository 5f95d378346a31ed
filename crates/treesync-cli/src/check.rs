//! Validation check backed by an external program

use std::path::Path;
use std::process::Command;

use treesync_core::{CheckOutcome, FileCheck};

/// Runs `program [args...] <file>` for each candidate file.
///
/// Exit status 0 accepts the file. Otherwise the trimmed stderr (or the
/// exit status when stderr is empty) becomes the rejection reason.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    program: String,
    args: Vec<String>,
}

impl CommandCheck {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl FileCheck for CommandCheck {
    fn check(&self, path: &Path) -> CheckOutcome {
        let output = match Command::new(&self.program).args(&self.args).arg(path).output() {
            Ok(output) => output,
            Err(e) => return CheckOutcome::fail(format!("cannot run {}: {}", self.program, e)),
        };
        if output.status.success() {
            return CheckOutcome::pass();
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            CheckOutcome::fail(format!("{} exited with {}", self.program, output.status))
        } else {
            CheckOutcome::fail(stderr)
        }
    }
}
