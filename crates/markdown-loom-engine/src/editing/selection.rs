use serde::{Deserialize, Serialize};

use crate::models::{Position, Span};

/// A linear selection over the flattened text. `anchor` is where it started,
/// `focus` where the caret is; either may come first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    #[must_use]
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    #[must_use]
    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    #[must_use]
    pub fn is_collapsed(self) -> bool {
        self.anchor == self.focus
    }

    #[must_use]
    pub fn is_forward(self) -> bool {
        self.anchor <= self.focus
    }

    #[must_use]
    pub fn start(self) -> Position {
        self.anchor.min(self.focus)
    }

    #[must_use]
    pub fn end(self) -> Position {
        self.anchor.max(self.focus)
    }

    #[must_use]
    pub fn span(self) -> Span {
        Span::new(self.start(), self.end())
    }

    /// Pulls both ends into `[0, len]`.
    #[must_use]
    pub fn clamp(self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            focus: self.focus.min(len),
        }
    }

    /// Positions at or after `at` move right by `len`.
    #[must_use]
    pub fn map_through_insert(self, at: Position, len: usize) -> Self {
        let map = |pos: Position| if at <= pos { pos + len } else { pos };
        Self {
            anchor: map(self.anchor),
            focus: map(self.focus),
        }
    }

    /// Positions after the deleted span move left; positions inside it
    /// collapse to its start.
    #[must_use]
    pub fn map_through_delete(self, span: Span) -> Self {
        let map = |pos: Position| {
            if pos >= span.end {
                pos - span.len()
            } else if pos > span.start {
                span.start
            } else {
                pos
            }
        };
        Self {
            anchor: map(self.anchor),
            focus: map(self.focus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_derived_properties() {
        let backward = Selection::new(7, 3);
        assert!(!backward.is_collapsed());
        assert!(!backward.is_forward());
        assert_eq!((backward.start(), backward.end()), (3, 7));
        assert!(Selection::caret(4).is_collapsed());
    }

    #[rstest]
    #[case(Selection::new(2, 9), 5, Selection::new(2, 5))]
    #[case(Selection::new(9, 12), 5, Selection::new(5, 5))]
    #[case(Selection::new(1, 2), 5, Selection::new(1, 2))]
    fn test_clamp(#[case] selection: Selection, #[case] len: usize, #[case] expected: Selection) {
        assert_eq!(selection.clamp(len), expected);
    }

    #[rstest]
    #[case(Selection::caret(5), 5, Selection::caret(8))]
    #[case(Selection::caret(4), 5, Selection::caret(4))]
    #[case(Selection::new(2, 6), 5, Selection::new(2, 9))]
    fn test_map_through_insert(
        #[case] selection: Selection,
        #[case] at: Position,
        #[case] expected: Selection,
    ) {
        assert_eq!(selection.map_through_insert(at, 3), expected);
    }

    #[rstest]
    #[case(Selection::caret(10), Selection::caret(7))]
    #[case(Selection::caret(5), Selection::caret(3))]
    #[case(Selection::caret(3), Selection::caret(3))]
    #[case(Selection::new(1, 4), Selection::new(1, 3))]
    fn test_map_through_delete(#[case] selection: Selection, #[case] expected: Selection) {
        assert_eq!(selection.map_through_delete(Span::new(3, 6)), expected);
    }
}
