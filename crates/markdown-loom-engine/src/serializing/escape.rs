//! Escaping for text written back out as markdown.
//!
//! The goal is that text re-parses as the same text, not that the output is
//! minimal: anything that could start inline syntax is backslash-escaped, and
//! anything a parser would strip (edge whitespace, carriage returns) is written
//! as a numeric character reference.

use regex::Regex;
use std::sync::OnceLock;

/// Chars with inline meaning wherever they appear.
const ALWAYS_ESCAPED: [char; 7] = ['\\', '*', '_', '`', '[', ']', '<'];

/// Chars that open a block construct when they start a line.
const LINE_START_MARKERS: [char; 6] = ['#', '>', '-', '+', '=', '~'];

fn entity_regex() -> &'static Regex {
    static ENTITY_REGEX: OnceLock<Regex> = OnceLock::new();
    ENTITY_REGEX.get_or_init(|| {
        Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
            .expect("Invalid entity regex")
    })
}

fn starts_entity(rest: &str) -> bool {
    entity_regex().is_match(rest)
}

/// Numeric character reference for a char a parser would otherwise eat.
pub(crate) fn char_ref(ch: char) -> String {
    format!("&#{};", ch as u32)
}

/// Escapes inline text. In headings every `#` is escaped so trailing ones are
/// not taken for a closing sequence.
pub(crate) fn escape_text(text: &str, in_heading: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, ch) in text.char_indices() {
        match ch {
            '&' if starts_entity(&text[index..]) => out.push_str("\\&"),
            '#' if in_heading => out.push_str("\\#"),
            '\r' => out.push_str(&char_ref(ch)),
            c if ALWAYS_ESCAPED.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Fixes up one physical line of inline output: block markers at the start
/// are escaped, and a space or tab at either edge becomes a character
/// reference so it survives whitespace stripping.
pub(crate) fn finish_line(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let Some(last) = chars.len().checked_sub(1) else {
        return String::new();
    };
    let digits = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    let ordered_delim = (digits > 0 && matches!(chars.get(digits), Some('.' | ')')))
        .then_some(digits);

    let mut out = String::with_capacity(line.len() + 8);
    for (index, &ch) in chars.iter().enumerate() {
        match ch {
            ' ' | '\t' if index == 0 || index == last => out.push_str(&char_ref(ch)),
            c if index == 0 && LINE_START_MARKERS.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c if Some(index) == ordered_delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Link or image destination, in angle brackets when the bare form would
/// not survive.
pub(crate) fn link_destination(url: &str) -> String {
    let needs_angles = url.is_empty()
        || url
            .chars()
            .any(|c| matches!(c, ' ' | '(' | ')' | '<' | '>') || c.is_control());
    let mut out = String::with_capacity(url.len() + 2);
    if needs_angles {
        out.push('<');
    }
    for (index, ch) in url.char_indices() {
        match ch {
            '&' if starts_entity(&url[index..]) => out.push_str("\\&"),
            '\\' => out.push_str("\\\\"),
            '<' | '>' => {
                out.push('\\');
                out.push(ch);
            }
            c if c.is_control() => out.push_str(&format!("%{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    if needs_angles {
        out.push('>');
    }
    out
}

/// Link or image title, double-quoted.
pub(crate) fn link_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len() + 2);
    out.push('"');
    for (index, ch) in title.char_indices() {
        match ch {
            '&' if starts_entity(&title[index..]) => out.push_str("\\&"),
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
