use memoexec_core::MEMOEXEC_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `MEMOEXEC_LOG`, then `RUST_LOG`, then `default_level`.
/// Events go to stderr so they never mix with captured command output echoed
/// on stdout.
pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(MEMOEXEC_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if stderr is a terminal
pub fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Emit a structured event for cache lookups
pub fn cache_event(command: &str, digest: &str, hit: bool) {
    if hit {
        debug!(command = %command, digest = %digest, "cache_hit");
    } else {
        debug!(command = %command, digest = %digest, "cache_miss");
    }
}

/// Emit a structured event for command completion
pub fn command_completed(command: &str, duration_ms: u64, exit_code: i32) {
    if exit_code == 0 {
        info!(
            command = %command,
            duration_ms = %duration_ms,
            "command_completed"
        );
    } else {
        error!(
            command = %command,
            duration_ms = %duration_ms,
            exit_code = %exit_code,
            "command_failed"
        );
    }
}
