//! Colored terminal output

use std::fmt::Display;

use memory_bank::Status;
use owo_colors::{OwoColorize, colors::css};
use supports_color::Stream;

/// How a piece of output should stand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Finished work (green).
    Done,
    /// Work under way, or something that can be picked up next (blue).
    Active,
    /// Work still to do (amber).
    Attention,
    /// Secondary detail.
    Muted,
}

impl Tone {
    /// The tone a section status is shown in.
    pub const fn of(status: &Status) -> Self {
        match status {
            Status::Complete => Self::Done,
            Status::InProgress => Self::Active,
            Status::NotStarted | Status::Pending => Self::Attention,
            Status::Other(_) | Status::NotText(_) => Self::Muted,
        }
    }
}

/// Render anything displayable in a [`Tone`].
///
/// Falls back to plain text when stdout does not support color.
pub trait Paint {
    /// The text, colored in `tone`.
    fn paint(&self, tone: Tone) -> String;
}

impl<T: Display + ?Sized> Paint for T {
    fn paint(&self, tone: Tone) -> String {
        if supports_color::on(Stream::Stdout).is_none() {
            return self.to_string();
        }
        match tone {
            Tone::Done => self.fg::<css::Green>().to_string(),
            Tone::Active => self.fg::<css::LightBlue>().to_string(),
            Tone::Attention => self.fg::<css::Orange>().to_string(),
            Tone::Muted => self.dimmed().to_string(),
        }
    }
}

/// A status in the tone of how far along it is.
pub fn paint_status(status: &Status) -> String {
    status.paint(Tone::of(status))
}

/// Whether the terminal is narrower than 60 columns.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < 60)
}
