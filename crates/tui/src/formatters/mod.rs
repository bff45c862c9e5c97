//! Output formatters for terminal display

pub mod spinner;

pub use spinner::{fit_to_width, terminal_width, ProgressLine, SPINNER_FRAMES};
