use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A char offset into the document's flattened text.
pub type Position = usize;

/// A char range `[start, end)` into the flattened text.
///
/// Spans arriving through the public API are not trusted: an inverted span
/// (`start > end`) is rejected by the command system rather than silently
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset.
    pub start: Position,
    /// Exclusive end offset.
    pub end: Position,
}

impl Span {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty span at `at`.
    #[must_use]
    pub fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Returns the length in chars. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_inverted(self) -> bool {
        self.start > self.end
    }

    /// True when `pos` lies inside the half-open range.
    #[must_use]
    pub fn contains(self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Shifts both ends left by `offset`, for converting to block-local offsets.
    #[must_use]
    pub fn relative_to(self, offset: Position) -> Self {
        Self {
            start: self.start.saturating_sub(offset),
            end: self.end.saturating_sub(offset),
        }
    }

    /// Shifts both ends right by `offset`.
    #[must_use]
    pub fn offset_by(self, offset: Position) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl From<Range<Position>> for Span {
    fn from(range: Range<Position>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

impl From<Span> for Range<Position> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}
