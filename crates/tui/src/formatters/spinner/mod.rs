//! Single-line progress indicator for a running command
//!
//! Renders a rotating spinner glyph followed by the command text, fitted to
//! the terminal width, and a final "finished" line.

mod constants;
mod progress_line;

pub use constants::SPINNER_FRAMES;
pub use progress_line::{fit_to_width, terminal_width, ProgressLine};
