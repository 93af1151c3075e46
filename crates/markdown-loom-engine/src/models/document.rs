use super::runs::Runs;
use super::span::{Position, Span};
use crate::error::EditorError;

/// Placeholder char an image occupies in the flattened text.
pub const IMAGE_CHAR: char = '\u{FFFC}';
/// Char a hard line break occupies in the flattened text.
pub const HARD_BREAK_CHAR: char = '\u{2028}';

/// Index path from the document root to a block.
///
/// At each level a step picks a block; after a list, the next step picks an
/// item and the one after that a block inside the item.
pub type BlockPath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock { language: Option<String>, text: String },
    BlockQuote(Vec<Block>),
    List(List),
    ThematicBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// Reserved for task lists; always `None` for now.
    pub checked: Option<bool>,
    pub blocks: Vec<Block>,
}

impl ListItem {
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            checked: None,
            blocks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Code(String),
    Link {
        url: String,
        title: Option<String>,
        content: Vec<Inline>,
    },
    Image {
        url: String,
        alt: String,
        title: Option<String>,
    },
    SoftBreak,
    HardBreak,
}

impl Inline {
    #[must_use]
    pub fn text_len(&self) -> usize {
        match self {
            Inline::Text(text) | Inline::Code(text) => text.chars().count(),
            Inline::Emphasis(children) | Inline::Strong(children) => inlines_len(children),
            Inline::Link { content, .. } => inlines_len(content),
            Inline::Image { .. } | Inline::SoftBreak | Inline::HardBreak => 1,
        }
    }

    pub fn push_text(&self, out: &mut String) {
        match self {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children) | Inline::Strong(children) => {
                children.iter().for_each(|child| child.push_text(out))
            }
            Inline::Link { content, .. } => content.iter().for_each(|child| child.push_text(out)),
            Inline::Image { .. } => out.push(IMAGE_CHAR),
            Inline::SoftBreak => out.push('\n'),
            Inline::HardBreak => out.push(HARD_BREAK_CHAR),
        }
    }
}

fn inlines_len(inlines: &[Inline]) -> usize {
    inlines.iter().map(Inline::text_len).sum()
}

/// Length of blocks joined by one separator char each.
pub(crate) fn blocks_len(blocks: &[Block]) -> usize {
    joined_len(blocks.iter().map(Block::text_len))
}

fn joined_len(lengths: impl Iterator<Item = usize>) -> usize {
    let (total, count) = lengths.fold((0usize, 0usize), |(total, count), len| {
        (total + len, count + 1)
    });
    total + count.saturating_sub(1)
}

impl Block {
    #[must_use]
    pub fn text_len(&self) -> usize {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => inlines_len(content),
            Block::CodeBlock { text, .. } => text.chars().count(),
            Block::BlockQuote(children) => blocks_len(children),
            Block::List(list) => list.text_len(),
            Block::ThematicBreak => 0,
        }
    }

    pub fn push_text(&self, out: &mut String) {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => {
                content.iter().for_each(|inline| inline.push_text(out))
            }
            Block::CodeBlock { text, .. } => out.push_str(text),
            Block::BlockQuote(children) => push_joined(children, out),
            Block::List(list) => {
                for (index, item) in list.items.iter().enumerate() {
                    if index > 0 {
                        out.push('\n');
                    }
                    push_joined(&item.blocks, out);
                }
            }
            Block::ThematicBreak => {}
        }
    }

    /// Inline content of paragraphs and headings.
    #[must_use]
    pub fn inlines(&self) -> Option<&Vec<Inline>> {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn inlines_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Block::BlockQuote(_) | Block::List(_))
    }

    #[must_use]
    pub fn empty_paragraph() -> Self {
        Block::Paragraph(Vec::new())
    }
}

impl List {
    /// Ordered list markers take at most nine digits.
    pub const MAX_NUMBER: u64 = 999_999_999;

    #[must_use]
    pub fn text_len(&self) -> usize {
        joined_len(self.items.iter().map(|item| blocks_len(&item.blocks)))
    }
}

fn push_joined(blocks: &[Block], out: &mut String) {
    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        block.push_text(out);
    }
}

/// Where a position landed: the leaf block holding it and that block's
/// extent in the flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafLocation {
    pub path: BlockPath,
    pub start: Position,
    pub len: usize,
}

impl LeafLocation {
    #[must_use]
    pub fn end(&self) -> Position {
        self.start + self.len
    }

    #[must_use]
    pub fn local(&self, pos: Position) -> usize {
        pos.saturating_sub(self.start)
    }
}

/// Content taken out of a leaf block by [`Document::splice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Raw text from a code block.
    Plain(String),
    /// Formatted inline content from a paragraph or heading.
    Inline(Runs),
}

impl Fragment {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Fragment::Plain(text) => text.chars().count(),
            Fragment::Inline(runs) => runs.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Fragment::Plain(text) => text.clone(),
            Fragment::Inline(runs) => runs.text(),
        }
    }
}

/// The document tree. Blocks are owned by value and addressed by
/// [`BlockPath`]s or by char positions into the flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            return Self::empty();
        }
        Self { blocks }
    }

    /// A document holding one empty paragraph.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::empty_paragraph()],
        }
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    #[must_use]
    pub fn text_len(&self) -> usize {
        blocks_len(&self.blocks)
    }

    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        push_joined(&self.blocks, &mut out);
        out
    }

    pub fn check_position(&self, position: Position) -> Result<(), EditorError> {
        let len = self.text_len();
        if position > len {
            return Err(EditorError::InvalidPosition { position, len });
        }
        Ok(())
    }

    /// Rejects inverted spans and spans reaching past the end.
    pub fn check_span(&self, span: Span) -> Result<(), EditorError> {
        if span.is_inverted() {
            return Err(EditorError::InvalidSpan {
                start: span.start,
                end: span.end,
            });
        }
        self.check_position(span.end)
    }

    pub fn slice(&self, span: Span) -> Result<String, EditorError> {
        self.check_span(span)?;
        Ok(self
            .text()
            .chars()
            .skip(span.start)
            .take(span.len())
            .collect())
    }

    #[must_use]
    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        resolve(&self.blocks, path)
    }

    pub(crate) fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        resolve_mut(&mut self.blocks, path)
    }

    /// Maps a position to the leaf block holding it: the first leaf whose
    /// closed interval `[start, start + len]` contains the position.
    pub fn locate(&self, position: Position) -> Result<LeafLocation, EditorError> {
        self.check_position(position)?;
        let mut path = Vec::new();
        let (start, len) = locate_in(&self.blocks, position, 0, &mut path).ok_or(
            EditorError::InvalidPosition {
                position,
                len: self.text_len(),
            },
        )?;
        Ok(LeafLocation { path, start, len })
    }

    /// Locates the single leaf block containing all of `span`.
    pub fn locate_span(&self, span: Span) -> Result<LeafLocation, EditorError> {
        self.check_span(span)?;
        let location = self.locate(span.start)?;
        if span.end > location.end() {
            return Err(EditorError::InvalidSpan {
                start: span.start,
                end: span.end,
            });
        }
        Ok(location)
    }

    /// Flattened-text offset at which the block at `path` starts.
    #[must_use]
    pub fn block_start(&self, path: &[usize]) -> Option<Position> {
        start_in(&self.blocks, path, 0)
    }

    /// Reverse of [`Document::locate`]: the position `local` chars into the
    /// block at `path`.
    #[must_use]
    pub fn position_of(&self, path: &[usize], local: usize) -> Option<Position> {
        let block = self.block(path)?;
        if local > block.text_len() {
            return None;
        }
        Some(self.block_start(path)? + local)
    }

    /// Extent of each top-level block in the flattened text.
    #[must_use]
    pub fn top_level_spans(&self) -> Vec<Span> {
        let mut spans = Vec::with_capacity(self.blocks.len());
        let mut offset = 0;
        for block in &self.blocks {
            let len = block.text_len();
            spans.push(Span::new(offset, offset + len));
            offset += len + 1;
        }
        spans
    }

    /// Index of the top-level block holding `position`.
    pub fn top_level_index(&self, position: Position) -> Result<usize, EditorError> {
        self.check_position(position)?;
        let spans = self.top_level_spans();
        spans
            .iter()
            .position(|span| position <= span.end)
            .ok_or(EditorError::InvalidPosition {
                position,
                len: self.text_len(),
            })
    }

    /// Replaces `span` (which must sit inside one leaf block) with `text` and
    /// returns what was removed.
    pub(crate) fn splice(&mut self, span: Span, text: &str) -> Result<Fragment, EditorError> {
        let location = self.locate_span(span)?;
        let local = span.relative_to(location.start);
        let block = self
            .block_mut(&location.path)
            .ok_or_else(|| EditorError::unsupported("position is not inside a text block"))?;
        match block {
            Block::CodeBlock { text: code, .. } => {
                let removed = splice_string(code, local, text);
                Ok(Fragment::Plain(removed))
            }
            Block::Paragraph(content) | Block::Heading { content, .. } => {
                let mut runs = Runs::from_inlines(content);
                let removed = runs.remove(local);
                if !text.is_empty() {
                    runs.insert_text(local.start, text);
                }
                *content = runs.to_inlines();
                Ok(Fragment::Inline(removed))
            }
            Block::ThematicBreak => Err(EditorError::unsupported(
                "cannot edit text inside a thematic break",
            )),
            Block::BlockQuote(_) | Block::List(_) => Err(EditorError::unsupported(
                "cannot edit text inside an empty container",
            )),
        }
    }
}

fn splice_string(target: &mut String, span: Span, text: &str) -> String {
    let byte_at = |target: &String, offset: usize| {
        target
            .char_indices()
            .nth(offset)
            .map_or(target.len(), |(index, _)| index)
    };
    let start = byte_at(target, span.start);
    let end = byte_at(target, span.end);
    let removed = target[start..end].to_string();
    target.replace_range(start..end, text);
    removed
}

fn resolve<'a>(blocks: &'a [Block], path: &[usize]) -> Option<&'a Block> {
    let (&first, rest) = path.split_first()?;
    let block = blocks.get(first)?;
    if rest.is_empty() {
        return Some(block);
    }
    match block {
        Block::BlockQuote(children) => resolve(children, rest),
        Block::List(list) => {
            let (&item, rest) = rest.split_first()?;
            resolve(&list.items.get(item)?.blocks, rest)
        }
        _ => None,
    }
}

fn resolve_mut<'a>(blocks: &'a mut [Block], path: &[usize]) -> Option<&'a mut Block> {
    let (&first, rest) = path.split_first()?;
    let block = blocks.get_mut(first)?;
    if rest.is_empty() {
        return Some(block);
    }
    match block {
        Block::BlockQuote(children) => resolve_mut(children, rest),
        Block::List(list) => {
            let (&item, rest) = rest.split_first()?;
            resolve_mut(&mut list.items.get_mut(item)?.blocks, rest)
        }
        _ => None,
    }
}

fn locate_in(
    blocks: &[Block],
    position: Position,
    base: Position,
    path: &mut BlockPath,
) -> Option<(Position, usize)> {
    let mut offset = base;
    for (index, block) in blocks.iter().enumerate() {
        let len = block.text_len();
        if position <= offset + len {
            path.push(index);
            return match block {
                Block::BlockQuote(children) if !children.is_empty() => {
                    locate_in(children, position, offset, path)
                }
                Block::List(list) if !list.items.is_empty() => {
                    locate_in_items(list, position, offset, path)
                }
                _ => Some((offset, len)),
            };
        }
        offset += len + 1;
    }
    None
}

fn locate_in_items(
    list: &List,
    position: Position,
    base: Position,
    path: &mut BlockPath,
) -> Option<(Position, usize)> {
    let mut offset = base;
    for (index, item) in list.items.iter().enumerate() {
        let len = blocks_len(&item.blocks);
        if position <= offset + len {
            if item.blocks.is_empty() {
                // The list itself is the closest addressable block.
                return Some((offset, len));
            }
            path.push(index);
            return locate_in(&item.blocks, position, offset, path);
        }
        offset += len + 1;
    }
    None
}

fn start_in(blocks: &[Block], path: &[usize], base: Position) -> Option<Position> {
    let (&index, rest) = path.split_first()?;
    let block = blocks.get(index)?;
    let offset = base
        + blocks[..index]
            .iter()
            .map(|block| block.text_len() + 1)
            .sum::<usize>();
    if rest.is_empty() {
        return Some(offset);
    }
    match block {
        Block::BlockQuote(children) => start_in(children, rest, offset),
        Block::List(list) => {
            let (&item, rest) = rest.split_first()?;
            let item_offset = offset
                + list.items.get(..item)?
                    .iter()
                    .map(|item| blocks_len(&item.blocks) + 1)
                    .sum::<usize>();
            start_in(&list.items.get(item)?.blocks, rest, item_offset)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn para(text: &str) -> Block {
        Block::Paragraph(vec![Inline::Text(text.to_string())])
    }

    /// "ab" / quote["cd", list["ef", "gh"]] / rule / "ij"
    fn sample() -> Document {
        Document::new(vec![
            para("ab"),
            Block::BlockQuote(vec![
                para("cd"),
                Block::List(List {
                    ordered: false,
                    start: None,
                    items: vec![
                        ListItem::new(vec![para("ef")]),
                        ListItem::new(vec![para("gh")]),
                    ],
                }),
            ]),
            Block::ThematicBreak,
            para("ij"),
        ])
    }

    #[test]
    fn test_flattened_text() {
        let doc = sample();
        assert_eq!(doc.text(), "ab\ncd\nef\ngh\n\nij");
        assert_eq!(doc.text_len(), 15);
    }

    #[rstest]
    #[case(0, vec![0], 0)]
    #[case(2, vec![0], 0)]
    #[case(3, vec![1, 0], 3)]
    #[case(6, vec![1, 1, 0, 0], 6)]
    #[case(9, vec![1, 1, 1, 0], 9)]
    #[case(12, vec![2], 12)]
    #[case(13, vec![3], 13)]
    #[case(15, vec![3], 13)]
    fn test_locate(#[case] pos: Position, #[case] path: BlockPath, #[case] start: Position) {
        let location = sample().locate(pos).unwrap();
        assert_eq!(location.path, path);
        assert_eq!(location.start, start);
    }

    #[test]
    fn test_locate_out_of_range() {
        assert_eq!(
            sample().locate(16),
            Err(EditorError::InvalidPosition {
                position: 16,
                len: 15
            })
        );
    }

    #[rstest]
    #[case(vec![0], 1)]
    #[case(vec![1, 1, 1, 0], 10)]
    #[case(vec![3], 14)]
    fn test_position_of_reverses_locate(#[case] path: BlockPath, #[case] expected: Position) {
        let doc = sample();
        let pos = doc.position_of(&path, 1).unwrap();
        assert_eq!(pos, expected);
        assert_eq!(doc.locate(pos).unwrap().path, path);
    }

    #[test]
    fn test_span_across_blocks_is_rejected() {
        let doc = sample();
        assert_eq!(
            doc.locate_span(Span::new(1, 4)),
            Err(EditorError::InvalidSpan { start: 1, end: 4 })
        );
        assert!(doc.locate_span(Span::new(3, 5)).is_ok());
    }

    #[test]
    fn test_splice_within_paragraph() {
        let mut doc = sample();
        let removed = doc.splice(Span::new(6, 7), "XY").unwrap();
        assert_eq!(removed.text(), "e");
        assert_eq!(doc.text(), "ab\ncd\nXYf\ngh\n\nij");
    }

    #[test]
    fn test_splice_into_thematic_break_fails() {
        let mut doc = sample();
        assert!(matches!(
            doc.splice(Span::caret(12), "x"),
            Err(EditorError::UnsupportedOperation(_))
        ));
        assert_eq!(doc, sample());
    }

    #[test]
    fn test_slice_and_top_level_spans() {
        let doc = sample();
        assert_eq!(doc.slice(Span::new(1, 4)).unwrap(), "b\nc");
        assert_eq!(
            doc.top_level_spans(),
            vec![
                Span::new(0, 2),
                Span::new(3, 11),
                Span::new(12, 12),
                Span::new(13, 15)
            ]
        );
        assert_eq!(doc.top_level_index(11).unwrap(), 1);
        assert_eq!(doc.top_level_index(12).unwrap(), 2);
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec![4], 4)]
    #[case(vec![0, 0], 1)]
    #[case(vec![2, 3, 1], 8)]
    fn test_joined_len_counts_separators(#[case] lengths: Vec<usize>, #[case] expected: usize) {
        assert_eq!(joined_len(lengths.into_iter()), expected);
    }

    #[test]
    fn test_empty_document_has_one_paragraph() {
        let doc = Document::new(Vec::new());
        assert_eq!(doc.blocks(), &[Block::empty_paragraph()]);
        assert_eq!(doc.text_len(), 0);
        assert_eq!(doc.locate(0).unwrap().path, vec![0]);
    }
}
