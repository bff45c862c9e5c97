use crate::runner::{ProcessStreamRunner, RunnerOptions};
use memoexec_core::{ExecutionResult, Invocation, Result};
use memoexec_utils::AsyncRuntime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(any(test, feature = "test-utils"))]
use memoexec_core::Error;
#[cfg(any(test, feature = "test-utils"))]
use std::collections::HashMap;
#[cfg(any(test, feature = "test-utils"))]
use std::sync::Mutex;

/// Trait for executing external commands
/// This abstraction allows for testing without spawning processes by
/// providing different implementations for production and test environments
pub trait CommandExecutor: Send + Sync {
    /// Run `invocation` to completion and return its captured output.
    ///
    /// Callable from plain synchronous code and from inside a running tokio
    /// runtime alike. A nonzero exit code is data, not an error.
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for Box<T> {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        (**self).execute(invocation)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for Arc<T> {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        (**self).execute(invocation)
    }
}

/// Production implementation that spawns real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor {
    runner: ProcessStreamRunner,
}

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RunnerOptions) -> Self {
        Self {
            runner: ProcessStreamRunner::new(options),
        }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let command = invocation.display_command();
        let runner = self.runner.clone();
        let owned = invocation.clone();
        let started = Instant::now();

        // A fresh manager per call: its runtime is created and dropped on
        // whichever thread drives the task, never inside a caller's runtime
        let result = AsyncRuntime::new().run(move || async move { runner.spawn(&owned).await })?;

        memoexec_utils::tracing::command_completed(
            &command,
            started.elapsed().as_millis() as u64,
            result.exit_code,
        );
        Ok(result)
    }
}

/// Wraps an executor and counts how many invocations reach it
#[derive(Debug, Default)]
pub struct CountingExecutor<E> {
    inner: E,
    spawned: AtomicUsize,
}

impl<E: CommandExecutor> CountingExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            spawned: AtomicUsize::new(0),
        }
    }

    /// Number of invocations delegated so far, failed ones included
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: CommandExecutor> CommandExecutor for CountingExecutor<E> {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(invocation)
    }
}

/// Test implementation that answers from canned results
/// This provides deterministic behavior for testing
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, ExecutionResult>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the result returned for an invocation whose display command
    /// equals `command`
    pub fn add_response(&self, command: &str, result: ExecutionResult) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(command.to_string(), result);
        }
    }

    pub fn add_simple_response(&self, command: &str, stdout: &str) {
        self.add_response(command, ExecutionResult::new(0, stdout, ""));
    }

    pub fn add_error_response(&self, command: &str, stderr: &str) {
        self.add_response(command, ExecutionResult::new(1, "", stderr));
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let key = invocation.display_command();
        let responses = self
            .responses
            .lock()
            .map_err(|e| Error::configuration(format!("failed to lock scripted responses: {e}")))?;

        responses.get(&key).cloned().ok_or_else(|| {
            Error::configuration(format!("no scripted response configured for command: {key}"))
        })
    }
}

/// Factory for creating command executors
pub struct CommandExecutorFactory;

impl CommandExecutorFactory {
    /// Create a production command executor
    pub fn system() -> Box<dyn CommandExecutor> {
        Box::new(SystemCommandExecutor::new())
    }

    /// Create a scripted executor for tests
    #[cfg(any(test, feature = "test-utils"))]
    pub fn scripted() -> ScriptedExecutor {
        ScriptedExecutor::new()
    }
}
