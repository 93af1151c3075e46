//! Markdown text → [`Document`].
//!
//! Parsing runs pulldown-cmark with CommonMark plus footnotes and folds its
//! event stream into the block tree. Constructs the document model has no
//! node for (raw HTML, footnotes, unused link reference definitions, empty
//! links, math, task markers) are kept as literal text so nothing in the
//! source is dropped on the floor.

use std::collections::{HashSet, VecDeque};
use std::ops::Range;

use log::debug;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, RefDefs, Tag, TagEnd};

use crate::error::ParseError;
use crate::models::{Block, Document, Inline, List, ListItem, Marks, Runs};
use crate::serializing::escape::{link_destination, link_title};

/// Parses markdown text. Every string is valid markdown, so this cannot fail.
pub fn parse(text: &str) -> Document {
    let mut parser = Parser::new_ext(text, Options::ENABLE_FOOTNOTES).into_offset_iter();
    let events: Vec<(Event, Range<usize>)> = parser.by_ref().collect();
    let mut processor = MarkdownProcessor {
        definitions: unused_definitions(&events, parser.reference_definitions()),
        ..MarkdownProcessor::default()
    };
    for (event, range) in events {
        processor.process(event, range);
    }
    let document = processor.finish();
    debug!(
        "parsed {} top-level blocks from {} bytes",
        document.blocks().len(),
        text.len()
    );
    document
}

/// Reference definitions no link or image resolved to, in source order,
/// as the literal text each one is kept as.
fn unused_definitions(
    events: &[(Event, Range<usize>)],
    definitions: &RefDefs,
) -> VecDeque<(usize, String)> {
    let used: HashSet<usize> = events
        .iter()
        .filter_map(|(event, _)| match event {
            Event::Start(
                Tag::Link { link_type, id, .. } | Tag::Image { link_type, id, .. },
            ) if matches!(
                link_type,
                LinkType::Reference | LinkType::Collapsed | LinkType::Shortcut
            ) =>
            {
                definitions.get(&**id).map(|definition| definition.span.start)
            }
            _ => None,
        })
        .collect();
    let mut unused: Vec<(usize, String)> = definitions
        .iter()
        .filter(|(_, definition)| !used.contains(&definition.span.start))
        .map(|(label, definition)| {
            let target = destination_literal(&definition.dest, definition.title.as_deref());
            (definition.span.start, format!("[{label}]: {target}"))
        })
        .collect();
    unused.sort_by_key(|(start, _)| *start);
    unused.into()
}

/// `dest` or `dest "title"` as written inside link syntax.
fn destination_literal(url: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{} {}", link_destination(url), link_title(title)),
        None => link_destination(url),
    }
}

/// Parses raw bytes, rejecting input that is not UTF-8.
pub fn parse_bytes(bytes: &[u8]) -> Result<Document, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(parse(text))
}

enum Container {
    Quote(Vec<Block>),
    List(List),
    Item(Vec<Block>),
}

/// The leaf block currently being filled. Paragraphs and headings collect
/// their content in [`MarkdownProcessor::inlines`].
enum OpenLeaf {
    Paragraph,
    Heading(u8),
    Code { language: Option<String>, text: String },
    Html(String),
}

enum InlineFrame {
    Emphasis,
    Strong,
    Link { url: String, title: Option<String> },
    Image { url: String, title: Option<String> },
}

#[derive(Default)]
struct InlineBuilder {
    root: Vec<Inline>,
    open: Vec<(InlineFrame, Vec<Inline>)>,
}

impl InlineBuilder {
    fn push(&mut self, inline: Inline) {
        match self.open.last_mut() {
            Some((_, children)) => children.push(inline),
            None => self.root.push(inline),
        }
    }

    fn open(&mut self, frame: InlineFrame) {
        self.open.push((frame, Vec::new()));
    }

    fn close(&mut self) {
        let Some((frame, children)) = self.open.pop() else {
            return;
        };
        let inline = match frame {
            InlineFrame::Emphasis => Inline::Emphasis(children),
            InlineFrame::Strong => Inline::Strong(children),
            // Markdown has no way to write a link with nothing to click.
            InlineFrame::Link { url, title } if Runs::from_inlines(&children).is_empty() => {
                Inline::Text(format!("[]({})", destination_literal(&url, title.as_deref())))
            }
            InlineFrame::Link { url, title } => Inline::Link {
                url,
                title,
                content: children,
            },
            InlineFrame::Image { url, title } => {
                let mut alt = String::new();
                children.iter().for_each(|child| child.push_text(&mut alt));
                Inline::Image { url, alt, title }
            }
        };
        self.push(inline);
    }

    fn finish(mut self) -> Vec<Inline> {
        while !self.open.is_empty() {
            self.close();
        }
        let mut runs = Runs::from_inlines(&self.root);
        runs.detach_edge_whitespace();
        runs.drop_unflanked_marks();
        runs.to_inlines()
    }
}

#[derive(Default)]
struct MarkdownProcessor {
    blocks: Vec<Block>,
    containers: Vec<Container>,
    leaf: Option<OpenLeaf>,
    inlines: InlineBuilder,
    /// Label of a footnote definition whose first block has not started.
    footnote: Option<String>,
    definitions: VecDeque<(usize, String)>,
}

impl MarkdownProcessor {
    fn process(&mut self, event: Event, range: Range<usize>) {
        let offset = match event {
            Event::End(_) => range.end,
            _ => range.start,
        };
        self.flush_definitions(offset);
        self.process_event(event);
    }

    /// Emits unused reference definitions starting before `offset` as
    /// paragraphs.
    fn flush_definitions(&mut self, offset: usize) {
        while self
            .definitions
            .front()
            .is_some_and(|(start, _)| *start < offset)
        {
            let Some((_, literal)) = self.definitions.pop_front() else {
                break;
            };
            self.finish_leaf();
            self.push_block(Block::Paragraph(vec![Inline::Text(literal)]));
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(Tag::Paragraph) => {
                let footnote = self.footnote.take();
                self.finish_leaf();
                self.leaf = Some(OpenLeaf::Paragraph);
                if let Some(label) = footnote {
                    self.push_text(format!("[^{label}]: "));
                }
            }
            Event::Start(Tag::Heading { level, .. }) => {
                self.finish_leaf();
                self.leaf = Some(OpenLeaf::Heading(level as u8));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                self.finish_leaf();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let info = info.trim();
                        (!info.is_empty()).then(|| info.to_string())
                    }
                    CodeBlockKind::Indented => None,
                };
                self.leaf = Some(OpenLeaf::Code {
                    language,
                    text: String::new(),
                });
            }
            Event::Start(Tag::HtmlBlock) => {
                self.finish_leaf();
                self.leaf = Some(OpenLeaf::Html(String::new()));
            }
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::HtmlBlock,
            ) => self.finish_leaf(),

            Event::Start(Tag::BlockQuote(_)) => {
                self.finish_leaf();
                self.containers.push(Container::Quote(Vec::new()));
            }
            Event::Start(Tag::List(start)) => {
                self.finish_leaf();
                self.containers.push(Container::List(List {
                    ordered: start.is_some(),
                    start,
                    items: Vec::new(),
                }));
            }
            Event::Start(Tag::Item) => {
                self.finish_leaf();
                self.containers.push(Container::Item(Vec::new()));
            }
            Event::End(TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item) => {
                self.finish_leaf();
                self.close_container();
            }

            Event::Start(Tag::Emphasis) => self.inlines().open(InlineFrame::Emphasis),
            Event::Start(Tag::Strong) => self.inlines().open(InlineFrame::Strong),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) => {
                let url = match link_type {
                    LinkType::Email => format!("mailto:{dest_url}"),
                    _ => dest_url.into_string(),
                };
                self.inlines().open(InlineFrame::Link {
                    url,
                    title: non_empty(title.into_string()),
                });
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => self.inlines().open(InlineFrame::Image {
                url: dest_url.into_string(),
                title: non_empty(title.into_string()),
            }),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link | TagEnd::Image) => {
                self.inlines().close()
            }

            Event::Text(text) => match &mut self.leaf {
                Some(OpenLeaf::Code { text: buffer, .. } | OpenLeaf::Html(buffer)) => {
                    buffer.push_str(&text)
                }
                _ => self.push_text(text.into_string()),
            },
            Event::Html(html) => match &mut self.leaf {
                Some(OpenLeaf::Html(buffer)) => buffer.push_str(&html),
                _ => self.push_text(html.into_string()),
            },
            Event::InlineHtml(html) => self.push_text(html.into_string()),
            Event::Code(code) => self.inlines().push(Inline::Code(code.into_string())),
            Event::SoftBreak => self.inlines().push(Inline::SoftBreak),
            Event::HardBreak => self.inlines().push(Inline::HardBreak),
            Event::Rule => {
                self.finish_leaf();
                self.push_block(Block::ThematicBreak);
            }
            Event::Start(Tag::FootnoteDefinition(label)) => {
                self.finish_leaf();
                self.footnote = Some(label.into_string());
            }
            Event::End(TagEnd::FootnoteDefinition) => self.finish_leaf(),
            Event::FootnoteReference(label) => self.push_text(format!("[^{label}]")),
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " }.to_string())
            }
            Event::InlineMath(math) => self.push_text(format!("${math}$")),
            Event::DisplayMath(math) => self.push_text(format!("$${math}$$")),

            // Other extension tags are not enabled; their content, if any,
            // flows into the enclosing block.
            Event::Start(_) | Event::End(_) => {}
        }
    }

    fn push_text(&mut self, text: String) {
        if !text.is_empty() {
            self.inlines().push(Inline::Text(text));
        }
    }

    /// Inline builder of the open leaf, opening a paragraph when inline
    /// content arrives outside one (tight list items).
    fn inlines(&mut self) -> &mut InlineBuilder {
        if !matches!(self.leaf, Some(OpenLeaf::Paragraph | OpenLeaf::Heading(_))) {
            self.finish_leaf();
            self.leaf = Some(OpenLeaf::Paragraph);
        }
        &mut self.inlines
    }

    fn finish_leaf(&mut self) {
        if let Some(leaf) = self.leaf.take() {
            let block = self.close_leaf(leaf);
            self.push_block(block);
        }
        if let Some(label) = self.footnote.take() {
            self.push_block(Block::Paragraph(vec![Inline::Text(format!("[^{label}]:"))]));
        }
    }

    fn close_leaf(&mut self, leaf: OpenLeaf) -> Block {
        match leaf {
            OpenLeaf::Paragraph => Block::Paragraph(std::mem::take(&mut self.inlines).finish()),
            OpenLeaf::Heading(level) => Block::Heading {
                level,
                content: std::mem::take(&mut self.inlines).finish(),
            },
            OpenLeaf::Code { language, mut text } => {
                if text.ends_with('\n') {
                    text.pop();
                }
                Block::CodeBlock { language, text }
            }
            OpenLeaf::Html(mut html) => {
                if html.ends_with('\n') {
                    html.pop();
                }
                Block::Paragraph(Runs::from_text(&html, Marks::default()).to_inlines())
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Quote(children) | Container::Item(children)) => children.push(block),
            Some(Container::List(list)) => list.items.push(ListItem::new(vec![block])),
            None => self.blocks.push(block),
        }
    }

    fn close_container(&mut self) {
        match self.containers.pop() {
            Some(Container::Quote(children)) => {
                self.push_block(Block::BlockQuote(at_least_one(children)))
            }
            Some(Container::List(list)) => self.push_block(Block::List(list)),
            Some(Container::Item(blocks)) => {
                let item = ListItem::new(at_least_one(blocks));
                match self.containers.last_mut() {
                    Some(Container::List(list)) => list.items.push(item),
                    _ => item.blocks.into_iter().for_each(|b| self.push_block(b)),
                }
            }
            None => {}
        }
    }

    fn finish(mut self) -> Document {
        self.flush_definitions(usize::MAX);
        self.finish_leaf();
        while !self.containers.is_empty() {
            self.close_container();
        }
        Document::new(self.blocks)
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn at_least_one(blocks: Vec<Block>) -> Vec<Block> {
    if blocks.is_empty() {
        vec![Block::empty_paragraph()]
    } else {
        blocks
    }
}
