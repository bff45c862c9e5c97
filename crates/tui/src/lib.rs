//! Terminal output for memoexec
//!
//! This crate renders the progress indicator shown while a command runs with
//! its output suppressed.

pub mod formatters;

pub use formatters::{fit_to_width, terminal_width, ProgressLine, SPINNER_FRAMES};
