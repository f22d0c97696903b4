//! Line/column positions and text helpers.
//!
//! Positions are zero-based; columns count `char`s within a line. Lines are
//! separated by `\n`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based line.
    pub line: u32,
    /// Zero-based column, in chars.
    pub column: u32,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.line, self.column).cmp(&(other.line, other.column))
    }
}

/// A half-open span between two positions, always ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl TextRange {
    /// Creates a range, swapping the ends if given backwards.
    #[must_use]
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Empty range at a position.
    #[must_use]
    pub const fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Whether the range selects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Byte offset of `pos` in `text`, or `None` if it lies past the end of its line.
#[must_use]
pub fn offset_of(text: &str, pos: Position) -> Option<usize> {
    let mut line_start = 0usize;
    for (index, line) in text.split('\n').enumerate() {
        if index == pos.line as usize {
            let column = pos.column as usize;
            if column == 0 {
                return Some(line_start);
            }
            let mut chars = line.char_indices().skip(column - 1);
            return match chars.next() {
                Some((at, ch)) => Some(line_start + at + ch.len_utf8()),
                None => None,
            };
        }
        line_start += line.len() + 1;
    }
    None
}

/// Text covered by `range`.
#[must_use]
pub fn text_in_range(text: &str, range: TextRange) -> Option<&str> {
    let start = offset_of(text, range.start)?;
    let end = offset_of(text, range.end)?;
    text.get(start..end)
}

/// Text from the start of the document up to `pos`.
#[must_use]
pub fn text_until(text: &str, pos: Position) -> Option<&str> {
    offset_of(text, pos).and_then(|end| text.get(..end))
}

/// Returns `text` with `range` replaced by `replacement`.
#[must_use]
pub fn replace_range(text: &str, range: TextRange, replacement: &str) -> Option<String> {
    let start = offset_of(text, range.start)?;
    let end = offset_of(text, range.end)?;
    let mut out = String::with_capacity(text.len() - (end - start) + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    Some(out)
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Span of the word touching `pos` on its line.
///
/// The span runs from the word start to the word end, so a position in the
/// middle of a word covers the whole word. A position touching no word yields
/// an empty range at `pos`.
#[must_use]
pub fn word_range_at(text: &str, pos: Position) -> Option<TextRange> {
    offset_of(text, pos)?;
    let line: Vec<char> = text
        .split('\n')
        .nth(pos.line as usize)
        .unwrap_or_default()
        .chars()
        .collect();
    let column = pos.column as usize;

    let mut start = column;
    while start > 0 && is_word_char(line[start - 1]) {
        start -= 1;
    }
    let mut end = column;
    while end < line.len() && is_word_char(line[end]) {
        end += 1;
    }

    Some(TextRange {
        start: Position::new(pos.line, column_u32(start)),
        end: Position::new(pos.line, column_u32(end)),
    })
}

fn column_u32(column: usize) -> u32 {
    u32::try_from(column).unwrap_or(u32::MAX)
}

/// Position just past the last character of `text`.
#[must_use]
pub fn end_position(text: &str) -> Position {
    let line = text.split('\n').count().saturating_sub(1);
    let column = text.rsplit('\n').next().map_or(0, |last| last.chars().count());
    Position::new(column_u32(line), column_u32(column))
}
