pub mod editing;
pub mod error;
pub mod models;
pub mod parsing;
pub mod serializing;

// Re-export key types for easier usage
pub use editing::{BlockType, Command, CommandResult, Editor, FormattingState, Selection};
pub use error::{EditorError, ParseError};
pub use models::{Block, Document, Inline, Mark, Position, Span};
pub use parsing::{parse, parse_bytes};
pub use serializing::{to_html, to_markdown};
