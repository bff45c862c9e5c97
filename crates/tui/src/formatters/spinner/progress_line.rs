//! Progress line state and rendering

use super::constants::{ELLIPSIS, EXECUTING_LABEL, FALLBACK_WIDTH, FINISHED_LABEL, SPINNER_FRAMES};
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Current terminal width in columns
pub fn terminal_width() -> u16 {
    match crossterm::terminal::size() {
        Ok((columns, _)) if columns > 0 => columns,
        _ => FALLBACK_WIDTH,
    }
}

/// Truncate `text` to at most `max_width` display columns, marking the cut
/// with an ellipsis
pub fn fit_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width <= ELLIPSIS.len() {
        return ELLIPSIS[..max_width].to_string();
    }

    let budget = max_width - ELLIPSIS.len();
    let mut used = 0;
    let mut fitted = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        used += ch_width;
        fitted.push(ch);
    }
    fitted.push_str(ELLIPSIS);
    fitted
}

/// Self-overwriting status line for one running command
#[derive(Clone, Debug)]
pub struct ProgressLine {
    command: String,
    frame: usize,
    styled: bool,
}

impl ProgressLine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            frame: 0,
            styled: false,
        }
    }

    /// Emit colours and line clearing escape codes
    #[must_use]
    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn spinner_frame(&self) -> usize {
        self.frame
    }

    fn glyph(&self) -> &'static str {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }

    /// Render the running line for the current frame and advance the spinner.
    ///
    /// The line starts with a carriage return and never ends with a newline,
    /// so successive renders overwrite each other.
    pub fn next_frame(&mut self, width: u16) -> String {
        let glyph = self.glyph();
        self.frame = self.frame.wrapping_add(1);

        // glyph, space, label, space; keep the last column free to avoid wrapping
        let prefix_width = glyph.width() + 1 + EXECUTING_LABEL.len() + 1;
        let available = usize::from(width).saturating_sub(prefix_width + 1);
        let command = fit_to_width(&self.command, available);

        let mut line = String::from("\r");
        if self.styled {
            line.push_str(&format!(
                "{} {} {}",
                glyph.white(),
                EXECUTING_LABEL.magenta(),
                command.as_str().white()
            ));
            // Cannot fail when writing into a String
            let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut line);
        } else {
            line.push_str(&format!("{glyph} {EXECUTING_LABEL} {command}"));
        }
        line
    }

    /// Render the final line, terminated by a newline
    pub fn finished(&self) -> String {
        let mut line = String::from("\r");
        if self.styled {
            line.push_str(&format!(
                "{} {}",
                FINISHED_LABEL.green(),
                self.command.as_str().white()
            ));
            let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut line);
        } else {
            line.push_str(&format!("{FINISHED_LABEL} {}", self.command));
        }
        line.push('\n');
        line
    }
}
