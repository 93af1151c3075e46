use markdown_loom_engine::editing::{BlockType, Command, Editor, Selection};
use markdown_loom_engine::{EditorError, Mark, Span, parse, to_markdown};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn heading_and_paragraph_serialize_canonically() {
    init_logging();
    let editor = Editor::from_markdown("# Hello\n\nWorld").unwrap();
    assert_eq!(editor.to_markdown(), "# Hello\n\nWorld\n");
}

#[test]
fn undo_after_typing_restores_text_and_selection() {
    init_logging();
    let mut editor = Editor::from_markdown("Hello").unwrap();
    let before = editor.selection();
    editor
        .execute(Command::InsertText {
            at: 5,
            text: "!".to_string(),
        })
        .unwrap();
    assert_eq!(editor.text(), "Hello!");

    editor.undo().unwrap();
    assert_eq!(editor.text(), "Hello");
    assert_eq!(editor.to_markdown(), "Hello\n");
    assert_eq!(editor.selection(), before);
}

#[test]
fn toggling_bold_off_a_fully_bold_span() {
    init_logging();
    let mut editor = Editor::from_markdown("**Hello**").unwrap();
    editor
        .execute(Command::ToggleMark {
            mark: Mark::Bold,
            span: Span::new(0, 5),
        })
        .unwrap();
    assert_eq!(editor.to_markdown(), "Hello\n");
}

#[test]
fn italic_on_a_lone_comma_is_not_written() {
    init_logging();
    let mut editor = Editor::from_markdown("Hello, world").unwrap();
    editor
        .execute(Command::ToggleMark {
            mark: Mark::Italic,
            span: Span::new(5, 6),
        })
        .unwrap();
    let markdown = editor.to_markdown();
    assert_eq!(markdown, "Hello, world\n");
    assert_eq!(to_markdown(&parse(&markdown)), markdown);
}

#[test]
fn deleting_across_blocks_fails_without_changes() {
    init_logging();
    let mut editor = Editor::from_markdown("# Heading\n\nParagraph").unwrap();
    let err = editor
        .execute(Command::DeleteRange {
            span: Span::new(4, 12),
        })
        .unwrap_err();
    assert_eq!(err, EditorError::InvalidSpan { start: 4, end: 12 });
    assert_eq!(editor.to_markdown(), "# Heading\n\nParagraph\n");
    assert!(!editor.can_undo());
}

#[test]
fn failing_batch_is_discarded() {
    init_logging();
    let mut editor = Editor::from_markdown("Hello").unwrap();
    let result = editor.execute(Command::Batch(vec![
        Command::InsertText {
            at: 0,
            text: "A".to_string(),
        },
        Command::InsertText {
            at: 100,
            text: "B".to_string(),
        },
    ]));
    assert!(matches!(result, Err(EditorError::InvalidPosition { .. })));
    assert_eq!(editor.text(), "Hello");
    assert!(!editor.can_undo());
}

#[test]
fn writing_a_short_document() {
    init_logging();
    let mut editor = Editor::new();
    let steps = [
        Command::InsertText {
            at: 0,
            text: "Shopping".to_string(),
        },
        Command::SetBlockType {
            at: 0,
            block_type: BlockType::Heading(2),
        },
        Command::InsertThematicBreak {
            at: 0,
            before: false,
        },
    ];
    for step in steps {
        editor.execute(step).unwrap();
    }
    assert_eq!(editor.to_markdown(), "## Shopping\n\n---\n");
    assert_eq!(editor.selection(), Selection::caret(8));

    let err = editor
        .execute(Command::InsertText {
            at: 9,
            text: "x".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, EditorError::UnsupportedOperation(_)));

    while editor.can_undo() {
        editor.undo().unwrap();
    }
    assert_eq!(editor.to_markdown(), "");
    assert_eq!(editor.selection(), Selection::caret(0));
}
