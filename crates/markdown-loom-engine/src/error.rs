use crate::models::Position;
use thiserror::Error;

/// Failures of the command system. A command that fails leaves the document
/// and selection exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("position {position} is outside the document (length {len})")]
    InvalidPosition { position: Position, len: usize },

    #[error("span {start}..{end} is inverted or crosses a block boundary")]
    InvalidSpan { start: Position, end: Position },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl EditorError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidEncoding { valid_up_to: usize },
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::InvalidEncoding {
            valid_up_to: err.valid_up_to(),
        }
    }
}
