use log::debug;
use markdown_loom_config::EditorConfig;

use super::commands::{Command, execute};
use super::formatting::{FormattingState, formatting_at};
use super::history::History;
use super::selection::Selection;
use crate::error::{EditorError, ParseError};
use crate::models::{Document, Position};
use crate::parsing::{parse, parse_bytes};
use crate::serializing::{to_html, to_markdown};

/// Owns a document, its selection and its history. Every change goes
/// through [`Editor::execute`].
#[derive(Debug, Clone, Default)]
pub struct Editor {
    document: Document,
    selection: Selection,
    history: History,
}

impl Editor {
    /// An empty document with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            document: Document::empty(),
            selection: Selection::default(),
            history: History::from_config(&config.history),
        }
    }

    /// Parses `text` into a new editor. Markdown text always parses; the
    /// `Result` mirrors [`Editor::from_markdown_bytes`].
    pub fn from_markdown(text: &str) -> Result<Self, ParseError> {
        let mut editor = Self::new();
        editor.load_markdown(text);
        Ok(editor)
    }

    pub fn from_markdown_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut editor = Self::new();
        editor.load_markdown_bytes(bytes)?;
        Ok(editor)
    }

    /// Replaces the document, collapses the selection to the start and
    /// forgets all history.
    pub fn load_markdown(&mut self, text: &str) {
        self.replace_document(parse(text));
    }

    pub fn load_markdown_bytes(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        let document = parse_bytes(bytes)?;
        self.replace_document(document);
        Ok(())
    }

    fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.selection = Selection::default();
        self.history.clear();
        debug!("Loaded document ({} chars)", self.document.text_len());
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        to_markdown(&self.document)
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        to_html(&self.document)
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.document.text()
    }

    #[must_use]
    pub fn text_len(&self) -> usize {
        self.document.text_len()
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Runs `command`. Only commands that changed the document are recorded
    /// for undo; selection moves alone are not.
    pub fn execute(&mut self, command: Command) -> Result<(), EditorError> {
        let result = execute(&command, &mut self.document, &mut self.selection)?;
        if result.changed {
            self.history.push(command, result.inverse);
        }
        Ok(())
    }

    pub fn formatting_at(&self, position: Position) -> Result<FormattingState, EditorError> {
        formatting_at(&self.document, position)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reverts the last recorded edit. `Ok(None)` when there is none.
    pub fn undo(&mut self) -> Result<Option<Selection>, EditorError> {
        self.history.undo(&mut self.document, &mut self.selection)
    }

    /// Re-applies the last undone edit. `Ok(None)` when there is none.
    pub fn redo(&mut self) -> Result<Option<Selection>, EditorError> {
        self.history.redo(&mut self.document, &mut self.selection)
    }
}
