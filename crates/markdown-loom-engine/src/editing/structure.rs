//! Block-level commands: block type changes, quotes, lists and rules.
//!
//! None of these change the flattened text except rule insertion and
//! removal, which add or drop one block separator.

use super::commands::{Applied, BlockType, Command, batch, restore_fragment};
use super::selection::Selection;
use crate::error::EditorError;
use crate::models::{Block, Document, Fragment, Leaf, List, ListItem, Position, Runs, Span};

impl BlockType {
    /// Type of a leaf text block; `None` for containers and rules.
    #[must_use]
    pub fn of(block: &Block) -> Option<BlockType> {
        match block {
            Block::Paragraph(_) => Some(BlockType::Paragraph),
            Block::Heading { level, .. } => Some(BlockType::Heading(*level)),
            Block::CodeBlock { language, .. } => Some(BlockType::CodeBlock {
                language: language.clone(),
            }),
            _ => None,
        }
    }

    /// Same kind of block, ignoring a code block's language.
    fn same_kind(&self, other: &BlockType) -> bool {
        match (self, other) {
            (BlockType::CodeBlock { .. }, BlockType::CodeBlock { .. }) => true,
            (a, b) => a == b,
        }
    }
}

fn convert(block: &Block, target: &BlockType) -> Block {
    match target {
        BlockType::CodeBlock { language } => {
            let text = match block {
                Block::CodeBlock { text, .. } => text.clone(),
                other => {
                    let mut text = String::new();
                    other.push_text(&mut text);
                    text
                }
            };
            Block::CodeBlock {
                language: language.clone(),
                text,
            }
        }
        BlockType::Paragraph | BlockType::Heading(_) => {
            let content = match block {
                Block::Paragraph(content) | Block::Heading { content, .. } => content.clone(),
                Block::CodeBlock { text, .. } => {
                    Runs::from_text(text, Default::default()).to_inlines()
                }
                _ => Vec::new(),
            };
            match target {
                BlockType::Heading(level) => Block::Heading {
                    level: *level,
                    content,
                },
                _ => Block::Paragraph(content),
            }
        }
    }
}

/// Plain text with no marks, links or images survives a trip through a
/// code block unchanged.
fn is_plain(runs: &Runs) -> bool {
    runs.runs().iter().all(|run| {
        run.marks == Default::default() && !matches!(run.leaf, Leaf::Code(_) | Leaf::Image { .. })
    })
}

pub(crate) fn set_block_type(
    document: &mut Document,
    at: Position,
    block_type: &BlockType,
) -> Result<Applied, EditorError> {
    if let BlockType::Heading(level) = block_type
        && !(1..=6).contains(level)
    {
        return Err(EditorError::unsupported(format!(
            "heading level {level} is outside 1..=6"
        )));
    }
    let location = document.locate(at)?;
    let block = document
        .block(&location.path)
        .ok_or_else(|| EditorError::unsupported("no block at position"))?;
    let current = BlockType::of(block).ok_or_else(|| {
        EditorError::unsupported("only paragraphs, headings and code blocks change type")
    })?;
    if current == *block_type {
        return Ok(Applied::unchanged());
    }

    let mut inverse = vec![Command::SetBlockType {
        at,
        block_type: current,
    }];
    if let (BlockType::CodeBlock { .. }, Some(content)) = (block_type, block.inlines()) {
        let runs = Runs::from_inlines(content);
        if !is_plain(&runs) {
            inverse.push(Command::DeleteRange {
                span: Span::new(location.start, location.end()),
            });
            inverse.push(restore_fragment(
                location.start,
                &Fragment::Inline(runs),
                &Runs::default(),
                0,
            ));
        }
    }

    let converted = convert(block, block_type);
    if let Some(slot) = document.block_mut(&location.path) {
        *slot = converted;
    }
    Ok(Applied::changed(batch(inverse)))
}

pub(crate) fn toggle_block_type(
    document: &mut Document,
    at: Position,
    block_type: &BlockType,
) -> Result<Applied, EditorError> {
    let location = document.locate(at)?;
    let current = document
        .block(&location.path)
        .and_then(BlockType::of)
        .ok_or_else(|| {
            EditorError::unsupported("only paragraphs, headings and code blocks change type")
        })?;
    let target = if current.same_kind(block_type) {
        BlockType::Paragraph
    } else {
        block_type.clone()
    };
    set_block_type(document, at, &target)
}

/// Range of top-level block indices whose closed extents meet `span`.
fn touching(document: &Document, span: Span) -> Result<(usize, usize), EditorError> {
    document.check_span(span)?;
    let spans = document.top_level_spans();
    let first = spans.iter().position(|block| block.end >= span.start);
    let last = spans.iter().rposition(|block| block.start <= span.end);
    match (first, last) {
        (Some(first), Some(last)) if first <= last => Ok((first, last)),
        _ => Err(EditorError::InvalidSpan {
            start: span.start,
            end: span.end,
        }),
    }
}

pub(crate) fn toggle_quote(document: &mut Document, at: Position) -> Result<Applied, EditorError> {
    let index = document.top_level_index(at)?;
    let spans = document.top_level_spans();
    let blocks = document.blocks_mut();
    match &mut blocks[index] {
        Block::BlockQuote(children) => {
            if children.is_empty() {
                return Err(EditorError::unsupported("cannot unwrap an empty quote"));
            }
            let children = std::mem::take(children);
            blocks.splice(index..=index, children);
            Ok(Applied::changed(Command::WrapInQuote {
                span: spans[index],
            }))
        }
        block => {
            let inner = std::mem::replace(block, Block::ThematicBreak);
            *block = Block::BlockQuote(vec![inner]);
            Ok(Applied::changed(Command::ToggleQuote { at }))
        }
    }
}

pub(crate) fn wrap_in_quote(document: &mut Document, span: Span) -> Result<Applied, EditorError> {
    let (first, last) = touching(document, span)?;
    let blocks = document.blocks_mut();
    let wrapped: Vec<Block> = blocks.drain(first..=last).collect();
    blocks.insert(first, Block::BlockQuote(wrapped));
    Ok(Applied::changed(Command::ToggleQuote { at: span.start }))
}

/// Start position of every item in a list starting at `offset`.
fn item_starts(list: &List, offset: Position) -> Vec<Position> {
    let mut starts = Vec::with_capacity(list.items.len());
    let mut pos = offset;
    for item in &list.items {
        starts.push(pos);
        pos += crate::models::blocks_len(&item.blocks) + 1;
    }
    starts
}

pub(crate) fn toggle_list(
    document: &mut Document,
    at: Position,
    ordered: bool,
) -> Result<Applied, EditorError> {
    let index = document.top_level_index(at)?;
    let span = document.top_level_spans()[index];
    let blocks = document.blocks_mut();
    match &mut blocks[index] {
        Block::List(list) if list.ordered == ordered => {
            if list.items.iter().any(|item| item.blocks.is_empty()) {
                return Err(EditorError::unsupported("cannot unwrap a list with empty items"));
            }
            let inverse = Command::WrapInList {
                span,
                ordered,
                start: list.start,
                item_starts: item_starts(list, span.start),
            };
            let items = std::mem::take(&mut list.items);
            blocks.splice(
                index..=index,
                items.into_iter().flat_map(|item| item.blocks),
            );
            Ok(Applied::changed(inverse))
        }
        Block::List(list) => {
            if list.items.iter().any(|item| item.blocks.is_empty()) {
                return Err(EditorError::unsupported("cannot convert a list with empty items"));
            }
            let inverse = Command::Batch(vec![
                Command::ToggleList { at, ordered },
                Command::WrapInList {
                    span,
                    ordered: list.ordered,
                    start: list.start,
                    item_starts: item_starts(list, span.start),
                },
            ]);
            list.ordered = ordered;
            list.start = ordered.then_some(1);
            Ok(Applied::changed(inverse))
        }
        block => {
            let inner = std::mem::replace(block, Block::ThematicBreak);
            *block = Block::List(List {
                ordered,
                start: ordered.then_some(1),
                items: vec![ListItem::new(vec![inner])],
            });
            Ok(Applied::changed(Command::ToggleList { at, ordered }))
        }
    }
}

/// Wraps the touching top-level blocks into one list. A block opens a new
/// item when it is the first one or its start is listed in `item_starts`;
/// otherwise it joins the previous item. Starts that match no block are
/// ignored.
pub(crate) fn wrap_in_list(
    document: &mut Document,
    span: Span,
    ordered: bool,
    start: Option<u64>,
    item_starts: &[Position],
) -> Result<Applied, EditorError> {
    if let Some(start) = start.filter(|&start| ordered && start > List::MAX_NUMBER) {
        return Err(EditorError::unsupported(format!(
            "list start {start} needs more than nine digits"
        )));
    }
    let (first, last) = touching(document, span)?;
    let spans = document.top_level_spans();
    let blocks = document.blocks_mut();

    let mut items: Vec<ListItem> = Vec::new();
    for (offset, block) in blocks.drain(first..=last).enumerate() {
        let opens_item =
            item_starts.is_empty() || item_starts.contains(&spans[first + offset].start);
        match items.last_mut() {
            Some(item) if !opens_item => item.blocks.push(block),
            _ => items.push(ListItem::new(vec![block])),
        }
    }
    let start = if ordered { start.or(Some(1)) } else { None };
    blocks.insert(
        first,
        Block::List(List {
            ordered,
            start,
            items,
        }),
    );
    Ok(Applied::changed(Command::ToggleList {
        at: span.start,
        ordered,
    }))
}

pub(crate) fn insert_thematic_break(
    document: &mut Document,
    selection: &mut Selection,
    at: Position,
    before: bool,
) -> Result<Applied, EditorError> {
    let index = document.top_level_index(at)?;
    let span = document.top_level_spans()[index];
    let (insert_at, rule_at) = if before {
        (index, span.start)
    } else {
        (index + 1, span.end + 1)
    };
    document.blocks_mut().insert(insert_at, Block::ThematicBreak);
    *selection = selection.map_through_insert(rule_at, 1);
    Ok(Applied::changed(Command::RemoveBlock { at: rule_at }))
}

pub(crate) fn remove_block(
    document: &mut Document,
    selection: &mut Selection,
    at: Position,
) -> Result<Applied, EditorError> {
    let index = document.top_level_index(at)?;
    let spans = document.top_level_spans();
    if !matches!(document.blocks()[index], Block::ThematicBreak) {
        return Err(EditorError::unsupported("only thematic breaks can be removed"));
    }
    if spans.len() < 2 {
        return Err(EditorError::unsupported("cannot remove the only block"));
    }
    let (separator, inverse) = match index.checked_sub(1) {
        Some(previous) => (
            Span::new(spans[index].start - 1, spans[index].start),
            Command::InsertThematicBreak {
                at: spans[previous].end,
                before: false,
            },
        ),
        None => (
            Span::new(0, 1),
            Command::InsertThematicBreak {
                at: 0,
                before: true,
            },
        ),
    };
    document.blocks_mut().remove(index);
    *selection = selection.map_through_delete(separator);
    Ok(Applied::changed(inverse))
}
