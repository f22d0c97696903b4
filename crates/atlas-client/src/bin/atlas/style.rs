//! Colored output helpers; plain text when the stream is not a terminal.

use std::io::IsTerminal;

use owo_colors::{AnsiColors, OwoColorize};

fn paint(text: &str, color: AnsiColors, terminal: bool) -> String {
    if terminal {
        text.color(color).to_string()
    } else {
        text.to_string()
    }
}

pub fn success(text: impl AsRef<str>) -> String {
    paint(text.as_ref(), AnsiColors::Green, std::io::stdout().is_terminal())
}

pub fn warning(text: impl AsRef<str>) -> String {
    paint(text.as_ref(), AnsiColors::Yellow, std::io::stdout().is_terminal())
}

pub fn accent(text: impl AsRef<str>) -> String {
    paint(text.as_ref(), AnsiColors::Cyan, std::io::stdout().is_terminal())
}

/// Error lines go to stderr, so color follows stderr.
pub fn error(text: impl AsRef<str>) -> String {
    paint(text.as_ref(), AnsiColors::Red, std::io::stderr().is_terminal())
}
