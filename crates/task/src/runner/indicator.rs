use memoexec_tui::{terminal_width, ProgressLine};
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;

/// Redraw the progress line on stderr every `interval` until `done` flips,
/// then print the finished line.
///
/// Wakes on the completion signal as well as on the timer, so it stops at
/// most one interval after the streams close.
pub(crate) async fn run_indicator(
    command: String,
    interval: Duration,
    mut done: watch::Receiver<bool>,
) {
    let mut line = ProgressLine::new(command).styled(memoexec_utils::tracing::is_tty());

    while !*done.borrow() {
        write_stderr(&line.next_frame(terminal_width()));

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = done.changed() => {
                if changed.is_err() {
                    // Sender dropped without signalling; nothing left to watch
                    break;
                }
            }
        }
    }

    write_stderr(&line.finished());
}

fn write_stderr(text: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(text.as_bytes());
    let _ = stderr.flush();
}
