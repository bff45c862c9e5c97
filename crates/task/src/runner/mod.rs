//! Child process execution with concurrent stream draining
//!
//! [`ProcessStreamRunner::spawn`] launches one child, reads its stdout and
//! stderr concurrently on the current task (no extra threads), optionally
//! draws a progress indicator alongside, and waits for exit once both
//! streams are closed. The indicator stops only after the child has exited.

mod indicator;
mod output;
mod process;

pub use output::{StreamBuffer, StreamKind};

use memoexec_core::{
    Error, ExecutionResult, Invocation, Result, DEFAULT_CHUNK_SIZE, INDICATOR_INTERVAL_MS,
};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::watch;

/// Tuning knobs for a runner
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Bytes requested per pipe read
    pub chunk_size: usize,
    /// Redraw interval of the progress indicator
    pub indicator_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            indicator_interval: Duration::from_millis(INDICATOR_INTERVAL_MS),
        }
    }
}

/// Spawns child processes and collects their output
#[derive(Debug, Clone, Default)]
pub struct ProcessStreamRunner {
    options: RunnerOptions,
}

impl ProcessStreamRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Run `invocation` to completion.
    ///
    /// Must be awaited inside a tokio runtime with its I/O driver enabled.
    /// A nonzero exit code is returned as data, not as an error.
    pub async fn spawn(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let program = invocation.program().executable().to_string();
        let command = invocation.display_command();
        let verbosity = invocation.verbosity();

        let mut child = process::spawn_child(invocation)?;
        tracing::debug!(command = %command, pid = ?child.id(), %verbosity, "spawned child process");

        let echo = verbosity.echoes_output();
        let (done_tx, done_rx) = watch::channel(false);

        let collected = collect_child(&mut child, &program, self.options.chunk_size, echo, done_tx);
        let status_line = async {
            if verbosity.shows_indicator() {
                indicator::run_indicator(command.clone(), self.options.indicator_interval, done_rx)
                    .await;
            }
        };

        let (collected, ()) = tokio::join!(collected, status_line);
        let (stdout_text, stderr_text, exit_code) = collected?;
        tracing::debug!(command = %command, exit_code, "child process exited");

        Ok(ExecutionResult::new(exit_code, stdout_text, stderr_text))
    }
}

/// Drain both pipes and wait for exit, then flip `done`.
///
/// `done` is signalled on every path, so an indicator watching it always
/// terminates, and never before the child itself has exited.
async fn collect_child(
    child: &mut Child,
    program: &str,
    chunk_size: usize,
    echo: bool,
    done: watch::Sender<bool>,
) -> Result<(String, String, i32)> {
    let collected = drain_and_wait(child, program, chunk_size, echo).await;
    let _ = done.send(true);
    collected
}

async fn drain_and_wait(
    child: &mut Child,
    program: &str,
    chunk_size: usize,
    echo: bool,
) -> Result<(String, String, i32)> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::child_io(program, "capture stdout", missing_pipe()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::child_io(program, "capture stderr", missing_pipe()))?;

    let (stdout_text, stderr_text) = tokio::try_join!(
        output::drain_stream(stdout, StreamKind::Stdout, program, chunk_size, echo),
        output::drain_stream(stderr, StreamKind::Stderr, program, chunk_size, echo),
    )?;

    // Closed pipes do not mean the child is gone
    let status = child
        .wait()
        .await
        .map_err(|e| Error::child_io(program, "wait for exit", e))?;
    Ok((stdout_text, stderr_text, process::exit_code(status)))
}

fn missing_pipe() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe was not created")
}
