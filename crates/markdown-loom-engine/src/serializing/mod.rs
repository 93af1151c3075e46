//! [`Document`] → markdown text (and HTML).
//!
//! The markdown output is canonical: one blank line between blocks, ATX
//! headings, fenced code, `-`/`1.` list markers and `*`/`**` emphasis. Any
//! document the parser produces serializes to text that parses back to the
//! same document, and serializing is idempotent under repeated
//! parse/serialize cycles.
//!
//! ## Modules
//!
//! - **`escape`**: text, URL and title escaping plus per-line fixups
//! - **`kinds`**: delimiter-owning syntax kinds (fences, markers, spans)
//! - **`html`**: best-effort HTML rendering

pub(crate) mod escape;
mod html;
mod kinds;

pub use html::to_html;

use crate::models::{Block, Document, Inline, List, Runs};
use escape::{char_ref, escape_text, finish_line, link_destination, link_title};
use kinds::{BlockQuote, CodeFence, CodeSpan, Emphasis, ListMarker, Strong, ThematicBreak};

/// Serializes the document; an empty document serializes to `""`.
pub fn to_markdown(document: &Document) -> String {
    let body = render_sequence(document.blocks());
    if body.is_empty() {
        body
    } else {
        body + "\n"
    }
}

fn is_empty_paragraph(block: &Block) -> bool {
    matches!(block, Block::Paragraph(content) if content.is_empty())
}

/// Renders sibling blocks separated by blank lines. Empty paragraphs are
/// skipped, and a list directly following a list of the same kind switches
/// marker so the two stay separate lists.
fn render_sequence(blocks: &[Block]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(blocks.len());
    let mut previous_list: Option<(bool, usize)> = None;
    for block in blocks.iter().filter(|block| !is_empty_paragraph(block)) {
        let rendered = match block {
            Block::List(list) => {
                let variant = match previous_list {
                    Some((ordered, variant)) if ordered == list.ordered => 1 - variant,
                    _ => 0,
                };
                previous_list = Some((list.ordered, variant));
                render_list(list, variant)
            }
            other => {
                previous_list = None;
                render_block(other)
            }
        };
        parts.push(rendered);
    }
    parts.join("\n\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph(content) => render_inlines(content, false),
        Block::Heading { level, content } => {
            let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
            if content.is_empty() {
                hashes
            } else {
                format!("{hashes} {}", render_inlines(content, true))
            }
        }
        Block::CodeBlock { language, text } => {
            let fence = CodeFence::for_block(text, language.as_deref());
            let info = language.as_deref().map(escape_info).unwrap_or_default();
            format!("{fence}{info}\n{text}\n{fence}")
        }
        Block::BlockQuote(children) => {
            let inner = render_sequence(children);
            if inner.is_empty() {
                return BlockQuote::EMPTY_LINE.to_string();
            }
            inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        BlockQuote::EMPTY_LINE.to_string()
                    } else {
                        format!("{}{line}", BlockQuote::PREFIX)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::List(list) => render_list(list, 0),
        Block::ThematicBreak => ThematicBreak::RULE.to_string(),
    }
}

fn escape_info(info: &str) -> String {
    // Info strings take backslash escapes and entities like inline text.
    escape_text(info, false)
}

fn render_list(list: &List, variant: usize) -> String {
    list.items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let marker = ListMarker::marker(list.ordered, list.start, index, variant);
            let body = render_sequence(&item.blocks);
            if body.is_empty() {
                return marker;
            }
            let indent = " ".repeat(marker.len() + 1);
            let mut lines = body.lines();
            let first = match lines.next() {
                // A `---` rule right after a bullet would read as one rule line.
                Some(ThematicBreak::RULE) => ThematicBreak::IN_ITEM,
                Some(line) => line,
                None => "",
            };
            let mut out = format!("{marker} {first}");
            for line in lines {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_inlines(content: &[Inline], in_heading: bool) -> String {
    let mut runs = Runs::from_inlines(content);
    runs.detach_edge_whitespace();
    runs.drop_unflanked_marks();
    let mut writer = InlineWriter::new(runs.runs().len(), in_heading);
    writer.write_all(&runs.to_inlines());
    writer.finish()
}

/// Writes canonical inline trees as lines of markdown.
///
/// A line break becomes a real line break only between two pieces of
/// content; at either edge of the block, right after another break, or
/// anywhere in a heading, it is written as a character reference instead.
struct InlineWriter {
    lines: Vec<String>,
    current: String,
    in_heading: bool,
    leaf_count: usize,
    leaf_index: usize,
    after_break: bool,
}

impl InlineWriter {
    fn new(leaf_count: usize, in_heading: bool) -> Self {
        Self {
            lines: Vec::new(),
            current: String::new(),
            in_heading,
            leaf_count,
            leaf_index: 0,
            after_break: false,
        }
    }

    fn write_all(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.write(inline);
        }
    }

    fn write(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(text) => {
                self.current.push_str(&escape_text(text, self.in_heading));
                self.leaf_done(false);
            }
            Inline::Code(code) => {
                self.current.push_str(&CodeSpan::wrap(code));
                self.leaf_done(false);
            }
            Inline::Emphasis(children) => self.wrap(Emphasis::DELIM, children),
            Inline::Strong(children) => self.wrap(Strong::DELIM, children),
            Inline::Link {
                url,
                title,
                content,
            } => {
                // `![` would open an image.
                if self.current.ends_with('!') {
                    self.current.pop();
                    self.current.push_str("\\!");
                }
                self.current.push('[');
                self.write_all(content);
                self.current.push_str("](");
                self.push_destination(url, title.as_deref());
            }
            Inline::Image { url, alt, title } => {
                self.current.push_str("![");
                self.current.push_str(&escape_text(alt, self.in_heading));
                self.current.push_str("](");
                self.push_destination(url, title.as_deref());
                self.leaf_done(false);
            }
            Inline::SoftBreak | Inline::HardBreak => {
                let hard = matches!(inline, Inline::HardBreak);
                let interior = self.leaf_index > 0 && self.leaf_index + 1 < self.leaf_count;
                if !self.in_heading && interior && !self.after_break {
                    if hard {
                        self.current.push('\\');
                    }
                    self.lines.push(std::mem::take(&mut self.current));
                } else {
                    let ch = if hard {
                        crate::models::HARD_BREAK_CHAR
                    } else {
                        '\n'
                    };
                    self.current.push_str(&char_ref(ch));
                }
                self.leaf_done(true);
            }
        }
    }

    fn wrap(&mut self, delim: &str, children: &[Inline]) {
        self.current.push_str(delim);
        self.write_all(children);
        self.current.push_str(delim);
    }

    fn push_destination(&mut self, url: &str, title: Option<&str>) {
        self.current.push_str(&link_destination(url));
        if let Some(title) = title {
            self.current.push(' ');
            self.current.push_str(&link_title(title));
        }
        self.current.push(')');
    }

    fn leaf_done(&mut self, was_break: bool) {
        self.leaf_index += 1;
        self.after_break = was_break;
    }

    fn finish(mut self) -> String {
        self.lines.push(self.current);
        self.lines
            .iter()
            .map(|line| finish_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListItem, Mark, Marks, Span};
    use crate::parsing::parse;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn para(content: Vec<Inline>) -> Block {
        Block::Paragraph(content)
    }

    fn md(blocks: Vec<Block>) -> String {
        to_markdown(&Document::new(blocks))
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            to_markdown(&parse("# Hello\n\nWorld")),
            "# Hello\n\nWorld\n"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(to_markdown(&Document::empty()), "");
    }

    #[test]
    fn test_nested_containers() {
        let doc = parse("> quote\n> - one\n>   two\n> - three\n\n1. first\n\n   ```rs\n   code\n   ```\n2. second\n");
        assert_snapshot!(to_markdown(&doc).trim_end(), @r"
        > quote
        >
        > - one
        >   two
        > - three

        1. first

           ```rs
           code
           ```
        2. second
        ");
    }

    #[test]
    fn test_inline_formatting() {
        let doc = parse("a *b* **c** ***d*** `e` [f](g \"h\") ![i](j)");
        assert_snapshot!(to_markdown(&doc).trim_end(), @r#"a *b* **c** ***d*** `e` [f](g "h") ![i](j)"#);
    }

    #[test]
    fn test_whitespace_is_moved_outside_marks() {
        let content = vec![
            text("a"),
            Inline::Strong(vec![text(" b ")]),
            text("c"),
        ];
        assert_eq!(md(vec![para(content)]), "a **b** c\n");
    }

    #[test]
    fn test_adjacent_lists_alternate_markers() {
        let list = |ordered| {
            Block::List(List {
                ordered,
                start: ordered.then_some(1),
                items: vec![ListItem::new(vec![para(vec![text("x")])])],
            })
        };
        assert_eq!(
            md(vec![list(false), list(false), list(true), list(true)]),
            "- x\n\n* x\n\n1. x\n\n1) x\n"
        );
    }

    #[test]
    fn test_empty_paragraphs_are_skipped_except_as_only_content() {
        let doc = Document::new(vec![
            Block::empty_paragraph(),
            para(vec![text("a")]),
            Block::BlockQuote(vec![Block::empty_paragraph()]),
            Block::List(List {
                ordered: false,
                start: None,
                items: vec![
                    ListItem::new(vec![Block::empty_paragraph()]),
                    ListItem::new(vec![para(vec![text("b")])]),
                ],
            }),
        ]);
        assert_eq!(to_markdown(&doc), "a\n\n>\n\n-\n- b\n");
    }

    #[test]
    fn test_breaks_at_edges_use_references() {
        let content = vec![
            Inline::SoftBreak,
            text("a"),
            Inline::SoftBreak,
            Inline::SoftBreak,
            text("b"),
            Inline::HardBreak,
            text("c"),
            Inline::HardBreak,
        ];
        assert_eq!(
            md(vec![para(content)]),
            "&#10;a\n&#10;b\\\nc&#8232;\n"
        );
    }

    #[test]
    fn test_heading_breaks_and_hashes() {
        let content = vec![text("C# "), Inline::SoftBreak, text("x #")];
        assert_eq!(
            md(vec![Block::Heading { level: 2, content }]),
            "## C\\# &#10;x \\#\n"
        );
    }

    #[test]
    fn test_rule_inside_list_item() {
        let doc = Document::new(vec![Block::List(List {
            ordered: false,
            start: None,
            items: vec![ListItem::new(vec![Block::ThematicBreak])],
        })]);
        assert_eq!(to_markdown(&doc), "- ___\n");
        assert_eq!(parse(&to_markdown(&doc)), doc);
    }

    #[rstest]
    #[case("# Title\n\nBody text.\n")]
    #[case("- a\n- b\n\n* c\n")]
    #[case("> nested\n>\n> > deeper\n")]
    #[case("````\n```\n````\n")]
    #[case("a\\\nb\n")]
    #[case("3. three\n4. four\n")]
    #[case("---\n")]
    fn test_canonical_text_is_stable(#[case] input: &str) {
        assert_eq!(to_markdown(&parse(input)), input);
    }

    #[rstest]
    #[case("hi\\![x](u)", "hi\\![x](u)\n")]
    #[case("hi!", "hi!\n")]
    #[case("![x](u)", "![x](u)\n")]
    #[case("a\\\\\\![x](u)", "a\\\\\\![x](u)\n")]
    fn test_bang_before_link_stays_literal(#[case] input: &str, #[case] expected: &str) {
        let doc = parse(input);
        assert_eq!(to_markdown(&doc), expected);
        assert_eq!(parse(expected), doc);
    }

    #[test]
    fn test_bang_text_then_link_is_not_an_image() {
        let doc = Document::new(vec![para(vec![
            text("hi!"),
            Inline::Link {
                url: "u".to_string(),
                title: None,
                content: vec![text("x")],
            },
        ])]);
        assert_snapshot!(to_markdown(&doc).trim_end(), @r"hi\![x](u)");
        assert_eq!(parse(&to_markdown(&doc)), doc);
    }

    #[test]
    fn test_inserted_markup_characters_survive() {
        let mut runs = Runs::from_text("1. *not* <b>list</b> &amp; # x", Marks::default());
        runs.set_mark(Span::new(0, 2), Mark::Bold, true);
        let doc = Document::new(vec![para(runs.to_inlines())]);
        let serialized = to_markdown(&doc);
        assert_eq!(parse(&serialized), doc);
    }
}
