//! Running async work from synchronous call sites.
//!
//! [`AsyncRuntime`] owns a lazily created `current_thread` tokio runtime and
//! decides, per call, whether a task can be driven inline on it or needs a
//! dedicated worker thread with a fresh runtime of its own.

use memoexec_core::{Error, Result};
use std::any::Any;
use std::fmt;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

/// Capabilities of a runtime's drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeBackend {
    /// I/O and time drivers enabled; can wait on child-process pipes
    Io,
    /// No I/O driver; pipe reads would fail or never wake
    Basic,
}

/// Where a task will be driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Inline,
    WorkerThread(WorkerReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerReason {
    /// The calling thread is already inside a runtime
    NestedRuntime,
    /// The owned runtime cannot watch pipes
    IncapableBackend,
}

impl fmt::Display for WorkerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerReason::NestedRuntime => write!(f, "runtime already active on this thread"),
            WorkerReason::IncapableBackend => write!(f, "owned runtime has no I/O driver"),
        }
    }
}

/// Async runtime manager that never blocks inside an active runtime
pub struct AsyncRuntime {
    runtime: Option<(Runtime, RuntimeBackend)>,
}

impl AsyncRuntime {
    /// Create a new async runtime manager; the runtime is built on first use
    #[must_use]
    pub fn new() -> Self {
        Self { runtime: None }
    }

    /// Adopt an already built runtime with known driver capabilities
    #[must_use]
    pub fn with_runtime(runtime: Runtime, backend: RuntimeBackend) -> Self {
        Self {
            runtime: Some((runtime, backend)),
        }
    }

    /// Check if we're already in an async context
    #[must_use]
    pub fn is_in_async_context() -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    /// Decide how the next task will be driven
    #[must_use]
    pub fn placement(&self) -> Placement {
        if Self::is_in_async_context() {
            return Placement::WorkerThread(WorkerReason::NestedRuntime);
        }
        match &self.runtime {
            Some((_, RuntimeBackend::Basic)) => {
                Placement::WorkerThread(WorkerReason::IncapableBackend)
            }
            _ => Placement::Inline,
        }
    }

    /// Drive the task built by `factory` to completion and return its output.
    ///
    /// Errors returned by the task are passed through unchanged. A panic in
    /// the worker thread surfaces as [`Error::Scheduler`].
    pub fn run<F, Fut, T>(&mut self, factory: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>>,
        T: Send + 'static,
    {
        match self.placement() {
            Placement::Inline => {
                tracing::debug!("driving task inline on owned runtime");
                let runtime = self.get_or_create_runtime()?;
                runtime.block_on(factory())
            }
            Placement::WorkerThread(reason) => {
                tracing::debug!(%reason, "driving task on dedicated worker thread");
                run_on_worker_thread(factory)
            }
        }
    }

    fn get_or_create_runtime(&mut self) -> Result<&Runtime> {
        if self.runtime.is_none() {
            self.runtime = Some((new_io_runtime()?, RuntimeBackend::Io));
        }

        self.runtime
            .as_ref()
            .map(|(runtime, _)| runtime)
            .ok_or_else(|| Error::scheduler("runtime unexpectedly missing after initialization"))
    }
}

impl Default for AsyncRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a single-threaded runtime able to wait on pipes and timers
pub fn new_io_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::scheduler(format!("failed to create tokio runtime: {e}")))
}

fn run_on_worker_thread<F, Fut, T>(factory: F) -> Result<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>>,
    T: Send + 'static,
{
    let handle = std::thread::Builder::new()
        .name("memoexec-worker".to_string())
        .spawn(move || {
            let runtime = new_io_runtime()?;
            runtime.block_on(factory())
        })
        .map_err(|e| Error::scheduler(format!("failed to start worker thread: {e}")))?;

    match handle.join() {
        Ok(result) => result,
        Err(payload) => Err(Error::scheduler(format!(
            "worker thread panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run async code from any context with a fresh runtime manager
pub fn run_async<F, Fut, T>(factory: F) -> Result<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>>,
    T: Send + 'static,
{
    AsyncRuntime::new().run(factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_context_runs_inline() -> Result<()> {
        let mut runtime = AsyncRuntime::new();
        assert_eq!(runtime.placement(), Placement::Inline);

        let thread_name = runtime.run(|| async {
            Ok(std::thread::current().name().map(str::to_string))
        })?;

        // Inline execution stays on the test thread
        assert_ne!(thread_name.as_deref(), Some("memoexec-worker"));
        Ok(())
    }

    #[test]
    fn test_runtime_is_reused_across_calls() -> Result<()> {
        let mut runtime = AsyncRuntime::new();
        assert_eq!(runtime.run(|| async { Ok(1) })?, 1);
        assert_eq!(runtime.run(|| async { Ok(2) })?, 2);
        assert!(runtime.runtime.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_async_context_detection() {
        assert!(AsyncRuntime::is_in_async_context());
        assert_eq!(
            AsyncRuntime::new().placement(),
            Placement::WorkerThread(WorkerReason::NestedRuntime)
        );
    }

    #[tokio::test]
    async fn test_nested_call_uses_worker_thread() -> Result<()> {
        let thread_name = run_async(|| async {
            Ok(std::thread::current().name().map(str::to_string))
        })?;
        assert_eq!(thread_name.as_deref(), Some("memoexec-worker"));
        Ok(())
    }

    #[test]
    fn test_basic_backend_forces_worker_thread() -> Result<()> {
        let basic = Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("failed to build basic runtime");
        let mut runtime = AsyncRuntime::with_runtime(basic, RuntimeBackend::Basic);
        assert_eq!(
            runtime.placement(),
            Placement::WorkerThread(WorkerReason::IncapableBackend)
        );

        let value = runtime.run(|| async {
            tokio::task::yield_now().await;
            Ok(7)
        })?;
        assert_eq!(value, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_error_keeps_identity_across_threads() {
        let err = run_async(|| async {
            Err::<(), _>(Error::configuration("bad recipe"))
        })
        .unwrap_err();

        assert!(matches!(err, Error::Configuration { ref message } if message == "bad recipe"));
    }

    #[tokio::test]
    async fn test_worker_panic_becomes_scheduler_error() {
        let err = run_async(|| async {
            if true {
                panic!("stream reader exploded");
            }
            Ok(())
        })
        .unwrap_err();

        match err {
            Error::Scheduler { message } => assert!(message.contains("stream reader exploded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
