//! Result of a completed child process

use super::invocation::Invocation;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Exit code and captured output of one completed child process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Escalate a nonzero exit into an error carrying the captured output
    pub fn ensure_success(self, invocation: &Invocation) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let message = format!(
            "\nstdout\n------\n\n{}\n\nstderr\n------\n\n{}",
            self.stdout, self.stderr
        );
        Err(Error::command_execution(
            invocation.program().executable(),
            invocation.argv_tail(),
            message,
            Some(self.exit_code),
        ))
    }
}
