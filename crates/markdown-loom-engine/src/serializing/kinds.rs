//! # Syntax Kinds
//!
//! Types that own the delimiters the serializer writes, so rendering code
//! never hardcodes `**` or ```` ``` ````.
//!
//! - **`CodeFence`**: backtick/tilde fences sized past any run inside the code
//! - **`CodeSpan`**: backtick fence sized past any run inside the span
//! - **`Emphasis`** / **`Strong`**: `*` and `**`
//! - **`BlockQuote`**: `> ` line prefix
//! - **`ListMarker`**: bullet and ordered markers with their alternates
//! - **`ThematicBreak`**: rule lines

use crate::models::List;

/// Length of the longest run of `ch` in `text`.
pub(crate) fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

pub struct CodeFence;

impl CodeFence {
    pub const BACKTICK: char = '`';
    pub const TILDE: char = '~';
    pub const MIN_LEN: usize = 3;

    /// Fence string for a code block. Backticks unless the info string
    /// contains one, which only a tilde fence allows.
    #[must_use]
    pub fn for_block(text: &str, info: Option<&str>) -> String {
        let ch = if info.is_some_and(|info| info.contains(Self::BACKTICK)) {
            Self::TILDE
        } else {
            Self::BACKTICK
        };
        let len = (longest_run(text, ch) + 1).max(Self::MIN_LEN);
        std::iter::repeat_n(ch, len).collect()
    }
}

pub struct CodeSpan;

impl CodeSpan {
    pub const TICK: char = '`';

    /// Wraps `content` so it parses back to exactly `content`.
    ///
    /// Parsers strip one space from each side of a span that has both, so
    /// content starting or ending with a tick, or wrapped in spaces, is
    /// padded with one extra space per side.
    #[must_use]
    pub fn wrap(content: &str) -> String {
        let fence: String = std::iter::repeat_n(Self::TICK, longest_run(content, Self::TICK) + 1)
            .collect();
        let all_spaces = content.chars().all(|c| c == ' ');
        let needs_padding = content.starts_with(Self::TICK)
            || content.ends_with(Self::TICK)
            || (!all_spaces && content.starts_with(' ') && content.ends_with(' '));
        if needs_padding {
            format!("{fence} {content} {fence}")
        } else {
            format!("{fence}{content}{fence}")
        }
    }
}

pub struct Emphasis;

impl Emphasis {
    pub const DELIM: &'static str = "*";
}

pub struct Strong;

impl Strong {
    pub const DELIM: &'static str = "**";
}

pub struct BlockQuote;

impl BlockQuote {
    pub const PREFIX: &'static str = "> ";
    pub const EMPTY_LINE: &'static str = ">";
}

pub struct ThematicBreak;

impl ThematicBreak {
    pub const RULE: &'static str = "---";
    /// Used where `---` would merge with a `-` bullet into one rule line.
    pub const IN_ITEM: &'static str = "___";
}

pub struct ListMarker;

impl ListMarker {
    pub const BULLETS: [&'static str; 2] = ["-", "*"];
    pub const ORDERED_DELIMS: [char; 2] = ['.', ')'];

    /// Marker for item `index` of a list using delimiter variant `variant`.
    ///
    /// Numbers stop at [`List::MAX_NUMBER`]; only the first item's number
    /// sets the list start, so later items may repeat it.
    #[must_use]
    pub fn marker(ordered: bool, start: Option<u64>, index: usize, variant: usize) -> String {
        if ordered {
            let number = u64::try_from(index)
                .ok()
                .and_then(|index| start.unwrap_or(1).checked_add(index))
                .map_or(List::MAX_NUMBER, |number| number.min(List::MAX_NUMBER));
            format!("{number}{}", Self::ORDERED_DELIMS[variant % 2])
        } else {
            Self::BULLETS[variant % 2].to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", "`a`")]
    #[case("a`b", "``a`b``")]
    #[case("`a", "`` `a ``")]
    #[case(" a ", "`  a  `")]
    #[case(" a", "` a`")]
    #[case("  ", "`  `")]
    fn test_code_span_wrap(#[case] content: &str, #[case] expected: &str) {
        assert_eq!(CodeSpan::wrap(content), expected);
    }

    #[rstest]
    #[case("plain", None, "```")]
    #[case("has ``` inside", None, "````")]
    #[case("x", Some("weird`info"), "~~~")]
    fn test_code_fence(#[case] text: &str, #[case] info: Option<&str>, #[case] expected: &str) {
        assert_eq!(CodeFence::for_block(text, info), expected);
    }

    #[test]
    fn test_list_markers_alternate() {
        assert_eq!(ListMarker::marker(false, None, 0, 0), "-");
        assert_eq!(ListMarker::marker(false, None, 3, 1), "*");
        assert_eq!(ListMarker::marker(true, Some(4), 1, 0), "5.");
        assert_eq!(ListMarker::marker(true, None, 0, 1), "1)");
    }

    #[rstest]
    #[case(Some(999_999_998), 1, "999999999.")]
    #[case(Some(999_999_999), 1, "999999999.")]
    #[case(Some(u64::MAX), 5, "999999999.")]
    #[case(Some(0), 0, "0.")]
    fn test_ordered_numbers_stay_nine_digits(
        #[case] start: Option<u64>,
        #[case] index: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(ListMarker::marker(true, start, index, 0), expected);
    }
}
