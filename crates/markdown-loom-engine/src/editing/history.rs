use std::collections::VecDeque;
use std::time::SystemTime;

use log::debug;
use markdown_loom_config::HistoryConfig;

use super::commands::{Command, execute};
use super::selection::Selection;
use crate::error::EditorError;
use crate::models::Document;

/// A recorded edit and the command that reverses it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub command: Command,
    pub inverse: Command,
    pub timestamp: SystemTime,
}

/// Bounded, linear undo/redo stacks. The oldest entry is evicted when a
/// push would exceed `max_size`.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::from_config(&HistoryConfig::default())
    }
}

impl History {
    /// `max_size` is raised to 1 if zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    #[must_use]
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.max_size)
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Records an edit. Any redoable entries are discarded.
    pub fn push(&mut self, command: Command, inverse: Command) {
        self.redo_stack.clear();
        self.push_undo(HistoryEntry {
            command,
            inverse,
            timestamp: SystemTime::now(),
        });
        debug!("History push: {} undoable", self.undo_stack.len());
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        bounded_push(&mut self.undo_stack, entry, self.max_size);
    }

    /// Reverts the newest entry. `Ok(None)` when there is nothing to undo.
    /// If the inverse fails the entry stays where it was.
    pub fn undo(
        &mut self,
        document: &mut Document,
        selection: &mut Selection,
    ) -> Result<Option<Selection>, EditorError> {
        let Some(entry) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = execute(&entry.inverse, document, selection) {
            self.undo_stack.push_back(entry);
            return Err(err);
        }
        debug!("Undo {}", entry.command.name());
        bounded_push(&mut self.redo_stack, entry, self.max_size);
        Ok(Some(*selection))
    }

    /// Re-applies the most recently undone entry. `Ok(None)` when there is
    /// nothing to redo.
    pub fn redo(
        &mut self,
        document: &mut Document,
        selection: &mut Selection,
    ) -> Result<Option<Selection>, EditorError> {
        let Some(mut entry) = self.redo_stack.pop_back() else {
            return Ok(None);
        };
        match execute(&entry.command, document, selection) {
            Ok(result) => {
                debug!("Redo {}", entry.command.name());
                entry.inverse = result.inverse;
                self.push_undo(entry);
                Ok(Some(*selection))
            }
            Err(err) => {
                self.redo_stack.push_back(entry);
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn bounded_push(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, max_size: usize) {
    stack.push_back(entry);
    while stack.len() > max_size {
        if let Some(evicted) = stack.pop_front() {
            debug!("History full, evicted {}", evicted.command.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Span;
    use crate::parsing::parse;

    fn insert(at: usize, text: &str) -> Command {
        Command::InsertText {
            at,
            text: text.to_string(),
        }
    }

    fn record(history: &mut History, document: &mut Document, command: Command) {
        let mut selection = Selection::default();
        let result = execute(&command, document, &mut selection).unwrap();
        history.push(command, result.inverse);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut document = parse("ab");
        let mut history = History::new(10);
        record(&mut history, &mut document, insert(2, "c"));
        assert_eq!(document.text(), "abc");

        let mut selection = Selection::default();
        assert_eq!(
            history.undo(&mut document, &mut selection).unwrap(),
            Some(Selection::default())
        );
        assert_eq!(document.text(), "ab");
        assert!(history.can_redo());

        history.redo(&mut document, &mut selection).unwrap();
        assert_eq!(document.text(), "abc");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_report_none() {
        let mut document = Document::empty();
        let mut selection = Selection::default();
        let mut history = History::default();
        assert_eq!(history.undo(&mut document, &mut selection), Ok(None));
        assert_eq!(history.redo(&mut document, &mut selection), Ok(None));
    }

    #[test]
    fn test_push_clears_redo() {
        let mut document = parse("x");
        let mut history = History::new(10);
        record(&mut history, &mut document, insert(1, "y"));
        let mut selection = Selection::default();
        history.undo(&mut document, &mut selection).unwrap();
        assert_eq!(history.redo_len(), 1);

        record(&mut history, &mut document, insert(0, "z"));
        assert_eq!(history.redo_len(), 0);
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        let mut document = parse("");
        let mut history = History::new(3);
        for (index, letter) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            record(&mut history, &mut document, insert(index, letter));
        }
        assert_eq!(history.undo_len(), 3);

        let mut selection = Selection::default();
        while history.can_undo() {
            history.undo(&mut document, &mut selection).unwrap();
        }
        assert_eq!(document.text(), "ab");
    }

    #[test]
    fn test_failed_undo_keeps_entry() {
        let mut document = parse("abc");
        let mut history = History::new(5);
        history.push(
            insert(0, "x"),
            Command::DeleteRange {
                span: Span::new(10, 11),
            },
        );
        let mut selection = Selection::default();
        assert!(history.undo(&mut document, &mut selection).is_err());
        assert!(history.can_undo());
        assert_eq!(document.text(), "abc");
    }

    #[test]
    fn test_zero_max_size_is_raised() {
        assert_eq!(History::new(0).max_size(), 1);
    }
}
