use markdown_loom_engine::editing::{BlockType, Command, Editor, Selection};
use markdown_loom_engine::{Document, Mark, Span, parse, to_markdown};
use pretty_assertions::assert_eq;

const SOURCE: &str = "# Notes\n\nSome *mixed* **formatting** and a [link](/l).\n\n- one\n- two\n\n> quoted\n\n```\ncode\n```";

/// Text layout of `SOURCE`: `Notes` 0..5, paragraph 6..39, `one` 40..43,
/// `two` 44..47, `quoted` 48..54, `code` 55..59. Later positions account for
/// the edits before them.
fn edits() -> Vec<Command> {
    vec![
        Command::ToggleMark {
            mark: Mark::Bold,
            span: Span::new(6, 30),
        },
        Command::DeleteRange {
            span: Span::new(10, 24),
        },
        Command::InsertText {
            at: 10,
            text: " new\ntext".to_string(),
        },
        Command::SetSelection {
            anchor: 6,
            focus: 12,
        },
        Command::InsertLink {
            span: Span::new(6, 12),
            url: "https://example.com".to_string(),
            title: None,
        },
        Command::ToggleList { at: 0, ordered: true },
        Command::ToggleQuote { at: 46 },
        Command::SetBlockType {
            at: 52,
            block_type: BlockType::CodeBlock {
                language: Some("text".to_string()),
            },
        },
        Command::ReplaceRange {
            span: Span::new(50, 54),
            text: "fn main() {}".to_string(),
        },
        Command::InsertImage {
            at: 0,
            url: "logo.png".to_string(),
            alt: "logo".to_string(),
            title: Some("Logo".to_string()),
        },
        Command::Batch(vec![
            Command::ToggleMark {
                mark: Mark::Italic,
                span: Span::new(1, 6),
            },
            Command::SetMark {
                mark: Mark::Code,
                span: Span::new(2, 4),
                enabled: true,
            },
        ]),
        Command::InsertThematicBreak {
            at: 0,
            before: true,
        },
        Command::WrapInList {
            span: Span::new(0, 8),
            ordered: false,
            start: None,
            item_starts: Vec::new(),
        },
    ]
}

#[test]
fn undo_and_redo_walk_back_and_forth_through_every_state() {
    let mut editor = Editor::from_markdown(SOURCE).unwrap();
    let mut states: Vec<Document> = vec![editor.document().clone()];
    for command in edits() {
        let selection_only = matches!(command, Command::SetSelection { .. });
        editor.execute(command).unwrap();
        if !selection_only {
            states.push(editor.document().clone());
        }
    }
    assert_eq!(editor.history().undo_len(), states.len() - 1);

    for expected in states.iter().rev().skip(1) {
        assert!(editor.undo().unwrap().is_some());
        assert_eq!(editor.document(), expected);
    }
    assert!(!editor.can_undo());
    assert_eq!(editor.undo().unwrap(), None);

    for expected in states.iter().skip(1) {
        assert!(editor.redo().unwrap().is_some());
        assert_eq!(editor.document(), expected);
    }
    assert!(!editor.can_redo());
}

#[test]
fn every_edited_state_serializes_stably() {
    let mut editor = Editor::from_markdown(SOURCE).unwrap();
    for command in edits() {
        let name = command.name();
        editor.execute(command).unwrap();
        let markdown = editor.to_markdown();
        assert_eq!(
            to_markdown(&parse(&markdown)),
            markdown,
            "after {name}:\n{markdown}"
        );
    }
}

#[test]
fn undo_restores_selection_moved_by_edits() {
    let mut editor = Editor::from_markdown("abc").unwrap();
    editor
        .execute(Command::SetSelection {
            anchor: 1,
            focus: 2,
        })
        .unwrap();
    editor
        .execute(Command::InsertText {
            at: 0,
            text: "xy".to_string(),
        })
        .unwrap();
    assert_eq!(editor.selection(), Selection::new(3, 4));
    assert_eq!(editor.undo().unwrap(), Some(Selection::new(1, 2)));
}

#[test]
fn undo_restores_markdown_exactly() {
    let mut editor = Editor::from_markdown(SOURCE).unwrap();
    let original = editor.to_markdown();
    for command in edits() {
        editor.execute(command).unwrap();
    }
    assert_ne!(editor.to_markdown(), original);
    while editor.can_undo() {
        editor.undo().unwrap();
    }
    assert_eq!(editor.to_markdown(), original);
}

#[test]
fn new_edit_after_undo_discards_redo() {
    let mut editor = Editor::from_markdown("abc").unwrap();
    editor
        .execute(Command::InsertText {
            at: 3,
            text: "d".to_string(),
        })
        .unwrap();
    editor.undo().unwrap();
    assert!(editor.can_redo());

    editor
        .execute(Command::InsertText {
            at: 0,
            text: "z".to_string(),
        })
        .unwrap();
    assert!(!editor.can_redo());
    assert_eq!(editor.redo().unwrap(), None);
    assert_eq!(editor.text(), "zabc");
}
