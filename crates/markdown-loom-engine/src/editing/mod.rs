/*!
 * # Editing
 *
 * Everything that changes a [`Document`](crate::models::Document) after it has
 * been parsed.
 *
 * ## Model
 *
 * - **Commands**: every edit is a [`Command`] value. [`execute`] validates it,
 *   applies it, maps the [`Selection`] through it and returns the inverse
 *   command. A failing command leaves document and selection untouched.
 * - **Inverses**: applying the returned inverse restores the exact prior tree,
 *   formatting and selection included. Deletions capture the removed runs
 *   before mutating; mark changes over mixed formatting snapshot each segment.
 * - **History**: [`History`] keeps bounded undo/redo stacks of
 *   `(command, inverse)` pairs and replays them through [`execute`].
 * - **Editor**: [`Editor`] owns the three and is the only public way to mutate.
 *
 * ## Module Structure
 *
 * - **`commands`**: `Command`, `execute`, text and inline-mark edits
 * - **`structure`**: block type, quote, list and thematic break edits
 * - **`selection`**: anchor/focus selection and position mapping
 * - **`history`**: undo/redo stacks
 * - **`formatting`**: read-only formatting queries for a position
 * - **`editor`**: the owning facade
 *
 * ## Usage
 *
 * ```rust
 * use markdown_loom_engine::editing::{Command, Editor};
 * use markdown_loom_engine::models::{Mark, Span};
 *
 * let mut editor = Editor::from_markdown("Hello world").unwrap();
 * editor
 *     .execute(Command::ToggleMark { mark: Mark::Bold, span: Span::new(0, 5) })
 *     .unwrap();
 * assert_eq!(editor.to_markdown(), "**Hello** world\n");
 *
 * editor.undo().unwrap();
 * assert_eq!(editor.to_markdown(), "Hello world\n");
 * ```
 */

pub mod commands;
pub mod editor;
pub mod formatting;
pub mod history;
pub mod selection;
mod structure;

pub use commands::{BlockType, Command, CommandResult, execute};
pub use editor::Editor;
pub use formatting::{BlockKind, FormattingState, LinkInfo, ListContext, formatting_at};
pub use history::{History, HistoryEntry};
pub use selection::Selection;
