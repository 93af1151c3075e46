use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::models::{Block, Document, LinkTarget, Mark, Position, Runs};

/// Kind of leaf block a position sits in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading(u8),
    CodeBlock,
    ThematicBreak,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub url: String,
    pub title: Option<String>,
}

impl From<&LinkTarget> for LinkInfo {
    fn from(target: &LinkTarget) -> Self {
        Self {
            url: target.url.clone(),
            title: target.title.clone(),
        }
    }
}

/// Innermost list around a position and how many lists deep it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListContext {
    pub ordered: bool,
    pub depth: usize,
}

/// What a toolbar needs to know about a position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingState {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: Option<LinkInfo>,
    pub block_type: BlockKind,
    pub quote_depth: usize,
    pub list: Option<ListContext>,
}

/// Formatting at `position`. Marks come from the char before it in its
/// leaf block, or the char after it at the block start.
pub fn formatting_at(
    document: &Document,
    position: Position,
) -> Result<FormattingState, EditorError> {
    let location = document.locate(position)?;
    let mut state = FormattingState::default();

    let mut blocks = document.blocks();
    let mut steps = location.path.iter();
    let mut leaf = None;
    while let Some(&index) = steps.next() {
        let Some(block) = blocks.get(index) else {
            break;
        };
        match block {
            Block::BlockQuote(children) => {
                state.quote_depth += 1;
                blocks = children;
            }
            Block::List(list) => {
                let depth = state.list.map_or(0, |context| context.depth) + 1;
                state.list = Some(ListContext {
                    ordered: list.ordered,
                    depth,
                });
                match steps.next().and_then(|&item| list.items.get(item)) {
                    Some(item) => blocks = &item.blocks,
                    None => break,
                }
            }
            other => {
                leaf = Some(other);
                break;
            }
        }
    }

    match leaf {
        Some(Block::Heading { level, .. }) => state.block_type = BlockKind::Heading(*level),
        Some(Block::CodeBlock { .. }) => state.block_type = BlockKind::CodeBlock,
        Some(Block::ThematicBreak) => state.block_type = BlockKind::ThematicBreak,
        _ => {}
    }

    if let Some(content) = leaf.and_then(Block::inlines) {
        let runs = Runs::from_inlines(content);
        let local = location.local(position);
        let run = local
            .checked_sub(1)
            .and_then(|offset| runs.run_at(offset))
            .or_else(|| runs.run_at(local));
        if let Some(run) = run {
            state.bold = run.has_mark(Mark::Bold);
            state.italic = run.has_mark(Mark::Italic);
            state.code = run.has_mark(Mark::Code);
            state.link = run.marks.link.as_ref().map(LinkInfo::from);
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, true, false)]
    #[case(1, true, false)]
    #[case(2, true, false)]
    #[case(3, false, false)]
    #[case(4, false, true)]
    fn test_marks_follow_previous_char(
        #[case] position: Position,
        #[case] bold: bool,
        #[case] italic: bool,
    ) {
        let document = parse("**ab** *cd*");
        let state = formatting_at(&document, position).unwrap();
        assert_eq!((state.bold, state.italic), (bold, italic));
    }

    #[test]
    fn test_link_and_code() {
        let document = parse("[`x`](/u \"T\")");
        let state = formatting_at(&document, 1).unwrap();
        assert!(state.code);
        assert_eq!(
            state.link,
            Some(LinkInfo {
                url: "/u".to_string(),
                title: Some("T".to_string()),
            })
        );
    }

    #[test]
    fn test_block_context() {
        let document = parse("> - a\n>   1. ## b\n\n```\nc\n```");
        let state = formatting_at(&document, 2).unwrap();
        assert_eq!(state.block_type, BlockKind::Heading(2));
        assert_eq!(state.quote_depth, 1);
        assert_eq!(
            state.list,
            Some(ListContext {
                ordered: true,
                depth: 2
            })
        );

        let state = formatting_at(&document, 4).unwrap();
        assert_eq!(state.block_type, BlockKind::CodeBlock);
        assert_eq!(state.quote_depth, 0);
        assert_eq!(state.list, None);
    }

    #[test]
    fn test_out_of_range() {
        let document = parse("abc");
        assert_eq!(
            formatting_at(&document, 9),
            Err(EditorError::InvalidPosition {
                position: 9,
                len: 3
            })
        );
    }
}
