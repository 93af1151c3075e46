use crate::models::{Block, Document, Inline, List};
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Renders the document as an HTML fragment, one element per block.
///
/// Lists don't record tightness, so an item holding a single paragraph is
/// rendered without a `<p>`.
pub fn to_html(document: &Document) -> String {
    let mut out = String::new();
    for block in document.blocks() {
        write_block(block, &mut out);
    }
    out
}

fn write_block(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph(content) => {
            if content.is_empty() {
                return;
            }
            out.push_str("<p>");
            write_inlines(content, out);
            out.push_str("</p>\n");
        }
        Block::Heading { level, content } => {
            let level = (*level).clamp(1, 6);
            out.push_str(&format!("<h{level}>"));
            write_inlines(content, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::CodeBlock { language, text } => {
            out.push_str("<pre><code");
            if let Some(lang) = language
                .as_deref()
                .and_then(|info| info.split_whitespace().next())
            {
                out.push_str(" class=\"language-");
                out.push_str(&encode_double_quoted_attribute(lang));
                out.push('"');
            }
            out.push('>');
            out.push_str(&encode_text(text));
            if !text.is_empty() {
                out.push('\n');
            }
            out.push_str("</code></pre>\n");
        }
        Block::BlockQuote(children) => {
            out.push_str("<blockquote>\n");
            children.iter().for_each(|child| write_block(child, out));
            out.push_str("</blockquote>\n");
        }
        Block::List(list) => write_list(list, out),
        Block::ThematicBreak => out.push_str("<hr />\n"),
    }
}

fn write_list(list: &List, out: &mut String) {
    match (list.ordered, list.start) {
        (true, Some(start)) if start != 1 => out.push_str(&format!("<ol start=\"{start}\">\n")),
        (true, _) => out.push_str("<ol>\n"),
        (false, _) => out.push_str("<ul>\n"),
    }
    for item in &list.items {
        out.push_str("<li>");
        match item.blocks.as_slice() {
            [Block::Paragraph(content)] => write_inlines(content, out),
            blocks => {
                out.push('\n');
                blocks.iter().for_each(|block| write_block(block, out));
            }
        }
        out.push_str("</li>\n");
    }
    out.push_str(if list.ordered { "</ol>\n" } else { "</ul>\n" });
}

fn write_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&encode_text(text)),
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                write_inlines(children, out);
                out.push_str("</em>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                write_inlines(children, out);
                out.push_str("</strong>");
            }
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&encode_text(code));
                out.push_str("</code>");
            }
            Inline::Link {
                url,
                title,
                content,
            } => {
                out.push_str("<a href=\"");
                out.push_str(&encode_double_quoted_attribute(url));
                out.push('"');
                write_title(title.as_deref(), out);
                out.push('>');
                write_inlines(content, out);
                out.push_str("</a>");
            }
            Inline::Image { url, alt, title } => {
                out.push_str("<img src=\"");
                out.push_str(&encode_double_quoted_attribute(url));
                out.push_str("\" alt=\"");
                out.push_str(&encode_double_quoted_attribute(alt));
                out.push('"');
                write_title(title.as_deref(), out);
                out.push_str(" />");
            }
            Inline::SoftBreak => out.push('\n'),
            Inline::HardBreak => out.push_str("<br />\n"),
        }
    }
}

fn write_title(title: Option<&str>, out: &mut String) {
    if let Some(title) = title {
        out.push_str(" title=\"");
        out.push_str(&encode_double_quoted_attribute(title));
        out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use insta::assert_snapshot;

    #[test]
    fn test_blocks_render() {
        let doc = parse("# T\n\n> q\n\n3. a\n4. b\n\n```rust\nx < y\n```\n\n---\n");
        assert_snapshot!(to_html(&doc), @r#"
        <h1>T</h1>
        <blockquote>
        <p>q</p>
        </blockquote>
        <ol start="3">
        <li>a</li>
        <li>b</li>
        </ol>
        <pre><code class="language-rust">x &lt; y
        </code></pre>
        <hr />
        "#);
    }

    #[test]
    fn test_inlines_are_escaped() {
        let doc = parse("*a* **b** `<c>` [d](/e?f=1&g=2 \"t\") ![i](j.png)\\\nk & l");
        assert_snapshot!(to_html(&doc), @r#"
        <p><em>a</em> <strong>b</strong> <code>&lt;c&gt;</code> <a href="/e?f=1&amp;g=2" title="t">d</a> <img src="j.png" alt="i" /><br />
        k &amp; l</p>
        "#);
    }
}
