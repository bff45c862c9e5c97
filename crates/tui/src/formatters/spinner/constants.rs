//! Constants for the progress indicator line

/// Spinner animation frames
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Label shown while the command runs
pub const EXECUTING_LABEL: &str = "Executing:";

/// Label shown once the command has finished
pub const FINISHED_LABEL: &str = "Finished:";

/// Marker appended to a truncated command
pub const ELLIPSIS: &str = "...";

/// Width assumed when the terminal size cannot be queried
pub const FALLBACK_WIDTH: u16 = 80;
