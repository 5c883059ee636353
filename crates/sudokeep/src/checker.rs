//! Syntax validation by shelling out to the system checker.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::transaction::{CheckReport, SyntaxChecker};

/// Log target for checker invocations.
const CHECKER_TARGET: &str = "sudokeep::checker";

/// Conventional location of the `visudo` binary.
pub const DEFAULT_VISUDO_PATH: &str = "/usr/sbin/visudo";

/// [`SyntaxChecker`] that runs `visudo -c -f <staged>` synchronously.
///
/// Check mode only inspects the named file; it never touches the live
/// sudoers file. A failure to launch the binary at all is reported as a
/// failed check carrying the spawn error, since the staged content cannot
/// be vouched for either way.
#[derive(Debug, Clone)]
pub struct VisudoChecker {
    program: Utf8PathBuf,
}

impl VisudoChecker {
    /// Uses the checker binary at its conventional location.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_VISUDO_PATH)
    }

    /// Uses the checker binary at the given path.
    #[must_use]
    pub fn with_program(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for VisudoChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxChecker for VisudoChecker {
    fn check(&self, staged: &Utf8Path) -> CheckReport {
        debug!(
            target: CHECKER_TARGET,
            program = %self.program,
            staged = %staged,
            "running syntax check"
        );
        let output = match Command::new(self.program.as_std_path())
            .arg("-c")
            .arg("-f")
            .arg(staged.as_std_path())
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                return CheckReport::fail(format!("failed to run {}: {err}", self.program));
            }
        };
        if output.status.success() {
            return CheckReport::pass();
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostic = stdout.trim_end().to_owned();
        if !stderr.trim_end().is_empty() {
            if !diagnostic.is_empty() {
                diagnostic.push('\n');
            }
            diagnostic.push_str(stderr.trim_end());
        }
        CheckReport::fail(diagnostic)
    }
}
