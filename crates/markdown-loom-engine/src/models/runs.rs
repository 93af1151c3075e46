//! Flat run representation of inline content.
//!
//! A block's inline tree is flattened into a sequence of [`Run`]s, each one
//! leaf (text, code, image or break) plus the marks that apply to it. All inline
//! edits work on runs and rebuild the tree with [`Runs::to_inlines`], which
//! always nests Link ⊃ Emphasis ⊃ Strong ⊃ leaf. Because the rebuilt tree
//! depends only on per-char attributes, two edits that restore the same
//! attributes restore the same tree.

use super::document::{HARD_BREAK_CHAR, IMAGE_CHAR, Inline};
use super::span::Span;
use serde::{Deserialize, Serialize};

/// Inline marks a command can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    Bold,
    Italic,
    Code,
}

impl Mark {
    pub const ALL: [Mark; 3] = [Mark::Bold, Mark::Italic, Mark::Code];
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTarget {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub strong: bool,
    pub emphasis: bool,
    pub link: Option<LinkTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    Text(String),
    Code(String),
    Image {
        url: String,
        alt: String,
        title: Option<String>,
    },
    SoftBreak,
    HardBreak,
}

impl Leaf {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Leaf::Text(text) | Leaf::Code(text) => text.chars().count(),
            Leaf::Image { .. } | Leaf::SoftBreak | Leaf::HardBreak => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Only textual leaves can be switched in and out of code.
    #[must_use]
    pub fn carries_code(&self) -> bool {
        matches!(self, Leaf::Text(_) | Leaf::Code(_))
    }

    pub fn push_text(&self, out: &mut String) {
        match self {
            Leaf::Text(text) | Leaf::Code(text) => out.push_str(text),
            Leaf::Image { .. } => out.push(IMAGE_CHAR),
            Leaf::SoftBreak => out.push('\n'),
            Leaf::HardBreak => out.push(HARD_BREAK_CHAR),
        }
    }

    /// Splits a textual leaf at char offset `at`, keeping the head in place.
    fn split_off(&mut self, at: usize) -> Option<Leaf> {
        match self {
            Leaf::Text(text) => Some(Leaf::Text(split_string(text, at))),
            Leaf::Code(text) => Some(Leaf::Code(split_string(text, at))),
            _ => None,
        }
    }

    fn to_inline(&self) -> Inline {
        match self {
            Leaf::Text(text) => Inline::Text(text.clone()),
            Leaf::Code(text) => Inline::Code(text.clone()),
            Leaf::Image { url, alt, title } => Inline::Image {
                url: url.clone(),
                alt: alt.clone(),
                title: title.clone(),
            },
            Leaf::SoftBreak => Inline::SoftBreak,
            Leaf::HardBreak => Inline::HardBreak,
        }
    }
}

fn split_string(text: &mut String, at: usize) -> String {
    let byte = text
        .char_indices()
        .nth(at)
        .map_or(text.len(), |(index, _)| index);
    text.split_off(byte)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub marks: Marks,
    pub leaf: Leaf,
}

impl Run {
    #[must_use]
    pub fn has_mark(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.marks.strong,
            Mark::Italic => self.marks.emphasis,
            Mark::Code => matches!(self.leaf, Leaf::Code(_)),
        }
    }

    fn set_mark(&mut self, mark: Mark, enabled: bool) {
        match mark {
            Mark::Bold => self.marks.strong = enabled,
            Mark::Italic => self.marks.emphasis = enabled,
            Mark::Code => {
                let leaf = std::mem::replace(&mut self.leaf, Leaf::SoftBreak);
                self.leaf = match leaf {
                    Leaf::Text(text) if enabled => Leaf::Code(text),
                    Leaf::Code(text) if !enabled => Leaf::Text(text),
                    other => other,
                };
            }
        }
    }

    /// Merges `next` into `self` when the two are indistinguishable once
    /// joined; hands `next` back otherwise.
    fn absorb(&mut self, next: Run) -> Option<Run> {
        if self.marks != next.marks {
            return Some(next);
        }
        match (&mut self.leaf, next.leaf) {
            (Leaf::Text(head), Leaf::Text(tail)) | (Leaf::Code(head), Leaf::Code(tail)) => {
                head.push_str(&tail);
                None
            }
            (_, leaf) => Some(Run {
                marks: next.marks,
                leaf,
            }),
        }
    }
}

/// Inline content of one leaf block as a flat, normalized run list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Runs(Vec<Run>);

impl Runs {
    #[must_use]
    pub fn from_inlines(inlines: &[Inline]) -> Self {
        let mut runs = Vec::new();
        flatten_into(inlines, &Marks::default(), &mut runs);
        let mut runs = Runs(runs);
        runs.normalize();
        runs
    }

    /// Plain text carrying `marks`; `'\n'` and `U+2028` become breaks.
    #[must_use]
    pub fn from_text(text: &str, marks: Marks) -> Self {
        let mut runs = Runs(vec![Run {
            marks,
            leaf: Leaf::Text(text.to_string()),
        }]);
        runs.normalize();
        runs
    }

    #[must_use]
    pub fn from_runs(runs: Vec<Run>) -> Self {
        let mut runs = Runs(runs);
        runs.normalize();
        runs
    }

    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.0
    }

    #[must_use]
    pub fn into_runs(self) -> Vec<Run> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.iter().map(|run| run.leaf.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.0 {
            run.leaf.push_text(&mut out);
        }
        out
    }

    /// Rebuilds the canonical inline tree.
    #[must_use]
    pub fn to_inlines(&self) -> Vec<Inline> {
        let mut out = Vec::new();
        for group in self.0.chunk_by(|a, b| a.marks.link == b.marks.link) {
            let content = build_emphasis(group);
            match group.first().and_then(|run| run.marks.link.as_ref()) {
                Some(link) => out.push(Inline::Link {
                    url: link.url.clone(),
                    title: link.title.clone(),
                    content,
                }),
                None => out.extend(content),
            }
        }
        out
    }

    /// The run holding the char at `offset`.
    #[must_use]
    pub fn run_at(&self, offset: usize) -> Option<&Run> {
        let mut pos = 0;
        for run in &self.0 {
            let len = run.leaf.len();
            if offset < pos + len {
                return Some(run);
            }
            pos += len;
        }
        None
    }

    /// Marks and code-ness that text inserted at `at` picks up.
    ///
    /// Strong and emphasis follow the char before the insertion point (the one
    /// after it at the very start). Code and link only continue when both
    /// neighbours carry the same one, so typing at the edge of a link or code
    /// span does not extend it.
    #[must_use]
    pub fn inherited_at(&self, at: usize) -> (Marks, bool) {
        let before = at.checked_sub(1).and_then(|offset| self.run_at(offset));
        let after = self.run_at(at);
        let mut marks = before
            .or(after)
            .map(|run| run.marks.clone())
            .unwrap_or_default();
        marks.link = match (before, after) {
            (Some(before), Some(after)) if before.marks.link == after.marks.link => {
                before.marks.link.clone()
            }
            _ => None,
        };
        let code = matches!(
            (before, after),
            (Some(before), Some(after)) if before.has_mark(Mark::Code) && after.has_mark(Mark::Code)
        );
        (marks, code)
    }

    /// Ensures a run boundary at `offset` and returns the index of the first
    /// run starting there.
    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for index in 0..self.0.len() {
            if pos == offset {
                return index;
            }
            let len = self.0[index].leaf.len();
            if offset < pos + len {
                let marks = self.0[index].marks.clone();
                if let Some(tail) = self.0[index].leaf.split_off(offset - pos) {
                    self.0.insert(index + 1, Run { marks, leaf: tail });
                }
                return index + 1;
            }
            pos += len;
        }
        self.0.len()
    }

    #[must_use]
    pub fn slice(&self, span: Span) -> Runs {
        let mut copy = self.clone();
        copy.remove(span)
    }

    /// Removes `[span.start, span.end)` and returns the removed content.
    pub fn remove(&mut self, span: Span) -> Runs {
        let start = self.split_at(span.start);
        let end = self.split_at(span.end);
        let removed: Vec<Run> = self.0.drain(start..end).collect();
        self.normalize();
        Runs::from_runs(removed)
    }

    pub fn insert(&mut self, at: usize, fragment: Runs) {
        let index = self.split_at(at);
        self.0.splice(index..index, fragment.0);
        self.normalize();
    }

    /// Inserts plain text, inheriting marks from its surroundings.
    pub fn insert_text(&mut self, at: usize, text: &str) {
        let (marks, code) = self.inherited_at(at);
        let mut fragment = Runs::from_text(text, marks);
        if code {
            let len = fragment.len();
            fragment.set_mark(Span::new(0, len), Mark::Code, true);
        }
        self.insert(at, fragment);
    }

    pub fn insert_leaf(&mut self, at: usize, leaf: Leaf) {
        let (marks, _) = self.inherited_at(at);
        self.insert(at, Runs(vec![Run { marks, leaf }]));
    }

    /// True when every char in `span` that can carry `mark` carries it.
    ///
    /// For code, only textual chars count; a span with no textual chars is
    /// never considered covered.
    #[must_use]
    pub fn covers(&self, span: Span, mark: Mark) -> bool {
        let mut applicable = false;
        let mut pos = 0;
        for run in &self.0 {
            let len = run.leaf.len();
            let overlaps = pos < span.end && span.start < pos + len;
            pos += len;
            if !overlaps || (mark == Mark::Code && !run.leaf.carries_code()) {
                continue;
            }
            if !run.has_mark(mark) {
                return false;
            }
            applicable = true;
        }
        applicable
    }

    pub fn set_mark(&mut self, span: Span, mark: Mark, enabled: bool) {
        let start = self.split_at(span.start);
        let end = self.split_at(span.end);
        for run in &mut self.0[start..end] {
            run.set_mark(mark, enabled);
        }
        self.normalize();
    }

    pub fn set_link(&mut self, span: Span, link: Option<LinkTarget>) {
        let start = self.split_at(span.start);
        let end = self.split_at(span.end);
        for run in &mut self.0[start..end] {
            run.marks.link = link.clone();
        }
        self.normalize();
    }

    /// Maximal sub-spans of `span` over which `mark` is uniformly on or off.
    #[must_use]
    pub fn mark_segments(&self, span: Span, mark: Mark) -> Vec<(Span, bool)> {
        self.segments(span, |run| run.has_mark(mark))
    }

    /// Maximal sub-spans of `span` sharing one link target (or none).
    #[must_use]
    pub fn link_segments(&self, span: Span) -> Vec<(Span, Option<LinkTarget>)> {
        self.segments(span, |run| run.marks.link.clone())
    }

    fn segments<T: PartialEq>(&self, span: Span, value: impl Fn(&Run) -> T) -> Vec<(Span, T)> {
        let mut segments: Vec<(Span, T)> = Vec::new();
        let mut pos = 0;
        for run in &self.0 {
            let len = run.leaf.len();
            let start = pos.max(span.start);
            let end = (pos + len).min(span.end);
            pos += len;
            if start >= end {
                continue;
            }
            let current = value(run);
            match segments.last_mut() {
                Some((segment, last)) if *last == current && segment.end == start => {
                    segment.end = end;
                }
                _ => segments.push((Span::new(start, end), current)),
            }
        }
        segments
    }

    /// Splits line breaks out of text, merges compatible neighbours and drops
    /// empty leaves.
    pub fn normalize(&mut self) {
        let mut out: Vec<Run> = Vec::with_capacity(self.0.len());
        for run in std::mem::take(&mut self.0) {
            for piece in split_breaks(run) {
                if piece.leaf.is_empty() {
                    continue;
                }
                let leftover = match out.last_mut() {
                    Some(last) => last.absorb(piece),
                    None => Some(piece),
                };
                if let Some(piece) = leftover {
                    out.push(piece);
                }
            }
        }
        self.0 = out;
    }

    /// Moves whitespace at the edges of emphasis and strong outside them, so
    /// every mark starts and ends on a visible char. `* a*` is not emphasis,
    /// so this is the only form markdown can express.
    pub fn detach_edge_whitespace(&mut self) {
        let mut pieces: Vec<Run> = std::mem::take(&mut self.0)
            .into_iter()
            .flat_map(split_edge_whitespace)
            .collect();
        // Emphasis nests outside strong, so strong groups also end where
        // emphasis changes.
        clear_blank_edges(&mut pieces, Mark::Italic, |a, b| a.link == b.link);
        clear_blank_edges(&mut pieces, Mark::Bold, |a, b| {
            a.link == b.link && a.emphasis == b.emphasis
        });
        self.0 = pieces;
        self.normalize();
    }

    /// Clears emphasis and strong wherever a `*` run could not open or
    /// close it. An opener needs a visible char after it, and when that char
    /// is punctuation, whitespace or punctuation before it; a closer mirrors
    /// this. Expects edge whitespace to be detached already.
    pub fn drop_unflanked_marks(&mut self) {
        drop_unflanked(&mut self.0, Mark::Italic, |a, b| a.link == b.link);
        drop_unflanked(&mut self.0, Mark::Bold, |a, b| {
            a.link == b.link && a.emphasis == b.emphasis
        });
        self.normalize();
    }
}

/// How a char next to a `*` run counts for flanking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Punct,
    Word,
}

impl CharClass {
    fn of(ch: char) -> Self {
        match ch {
            // Written as a character reference.
            '\r' => CharClass::Punct,
            c if c.is_whitespace() => CharClass::Space,
            c if c.is_alphanumeric() => CharClass::Word,
            _ => CharClass::Punct,
        }
    }
}

fn left_flanking(before: CharClass, after: CharClass) -> bool {
    after != CharClass::Space && (after != CharClass::Punct || before != CharClass::Word)
}

fn right_flanking(before: CharClass, after: CharClass) -> bool {
    before != CharClass::Space && (before != CharClass::Punct || after != CharClass::Word)
}

impl Leaf {
    /// Class of the first char this leaf writes, or the last with `last`.
    fn edge_class(&self, last: bool) -> CharClass {
        match self {
            Leaf::Text(text) => {
                let ch = if last {
                    text.chars().next_back()
                } else {
                    text.chars().next()
                };
                ch.map_or(CharClass::Space, CharClass::of)
            }
            Leaf::Code(_) | Leaf::Image { .. } => CharClass::Punct,
            Leaf::SoftBreak | Leaf::HardBreak => CharClass::Space,
        }
    }
}

fn drop_unflanked(runs: &mut [Run], mark: Mark, same_group: impl Fn(&Marks, &Marks) -> bool) {
    let mut start = 0;
    while start < runs.len() {
        if !runs[start].has_mark(mark) {
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < runs.len()
            && runs[end].has_mark(mark)
            && same_group(&runs[start].marks, &runs[end].marks)
        {
            end += 1;
        }
        // Other delimiters between two chars do not count; link brackets do.
        let before = match start.checked_sub(1).map(|index| &runs[index]) {
            Some(prev) if prev.marks.link == runs[start].marks.link => prev.leaf.edge_class(true),
            Some(_) => CharClass::Punct,
            None => CharClass::Space,
        };
        let after = match runs.get(end) {
            Some(next) if next.marks.link == runs[end - 1].marks.link => next.leaf.edge_class(false),
            Some(_) => CharClass::Punct,
            None => CharClass::Space,
        };
        let opens = left_flanking(before, runs[start].leaf.edge_class(false));
        let closes = right_flanking(runs[end - 1].leaf.edge_class(true), after);
        if !(opens && closes) {
            for run in &mut runs[start..end] {
                run.set_mark(mark, false);
            }
        }
        start = end;
    }
}

fn is_blank(run: &Run) -> bool {
    match &run.leaf {
        Leaf::Text(text) => text.chars().all(char::is_whitespace),
        Leaf::SoftBreak | Leaf::HardBreak => true,
        Leaf::Code(_) | Leaf::Image { .. } => false,
    }
}

fn clear_blank_edges(runs: &mut [Run], mark: Mark, same_group: impl Fn(&Marks, &Marks) -> bool) {
    let mut start = 0;
    while start < runs.len() {
        if !runs[start].has_mark(mark) {
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < runs.len()
            && runs[end].has_mark(mark)
            && same_group(&runs[start].marks, &runs[end].marks)
        {
            end += 1;
        }
        let group = &mut runs[start..end];
        for run in group.iter_mut().take_while(|run| is_blank(run)) {
            run.set_mark(mark, false);
        }
        for run in group.iter_mut().rev().take_while(|run| is_blank(run)) {
            run.set_mark(mark, false);
        }
        start = end;
    }
}

/// Splits leading and trailing whitespace off a text run.
fn split_edge_whitespace(run: Run) -> Vec<Run> {
    let Leaf::Text(text) = &run.leaf else {
        return vec![run];
    };
    let core = text.trim_matches(char::is_whitespace);
    if core.is_empty() || core.len() == text.len() {
        return vec![run];
    }
    let lead_len = text.len() - text.trim_start_matches(char::is_whitespace).len();
    let lead = &text[..lead_len];
    let trail = &text[lead_len + core.len()..];
    [lead, core, trail]
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| Run {
            marks: run.marks.clone(),
            leaf: Leaf::Text(piece.to_string()),
        })
        .collect()
}

fn split_breaks(run: Run) -> Vec<Run> {
    let Leaf::Text(text) = &run.leaf else {
        return vec![run];
    };
    if !text.contains(['\n', HARD_BREAK_CHAR]) {
        return vec![run];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let brk = match ch {
            '\n' => Leaf::SoftBreak,
            HARD_BREAK_CHAR => Leaf::HardBreak,
            _ => {
                current.push(ch);
                continue;
            }
        };
        pieces.push(Run {
            marks: run.marks.clone(),
            leaf: Leaf::Text(std::mem::take(&mut current)),
        });
        pieces.push(Run {
            marks: run.marks.clone(),
            leaf: brk,
        });
    }
    pieces.push(Run {
        marks: run.marks,
        leaf: Leaf::Text(current),
    });
    pieces
}

fn flatten_into(inlines: &[Inline], marks: &Marks, out: &mut Vec<Run>) {
    for inline in inlines {
        let leaf = match inline {
            Inline::Text(text) => Leaf::Text(text.clone()),
            Inline::Code(text) => Leaf::Code(text.clone()),
            Inline::Image { url, alt, title } => Leaf::Image {
                url: url.clone(),
                alt: alt.clone(),
                title: title.clone(),
            },
            Inline::SoftBreak => Leaf::SoftBreak,
            Inline::HardBreak => Leaf::HardBreak,
            Inline::Emphasis(children) => {
                let inner = Marks {
                    emphasis: true,
                    ..marks.clone()
                };
                flatten_into(children, &inner, out);
                continue;
            }
            Inline::Strong(children) => {
                let inner = Marks {
                    strong: true,
                    ..marks.clone()
                };
                flatten_into(children, &inner, out);
                continue;
            }
            Inline::Link {
                url,
                title,
                content,
            } => {
                let inner = Marks {
                    link: Some(LinkTarget {
                        url: url.clone(),
                        title: title.clone(),
                    }),
                    ..marks.clone()
                };
                flatten_into(content, &inner, out);
                continue;
            }
        };
        out.push(Run {
            marks: marks.clone(),
            leaf,
        });
    }
}

fn build_emphasis(runs: &[Run]) -> Vec<Inline> {
    let mut out = Vec::new();
    for group in runs.chunk_by(|a, b| a.marks.emphasis == b.marks.emphasis) {
        let content = build_strong(group);
        if group.first().is_some_and(|run| run.marks.emphasis) {
            out.push(Inline::Emphasis(content));
        } else {
            out.extend(content);
        }
    }
    out
}

fn build_strong(runs: &[Run]) -> Vec<Inline> {
    let mut out = Vec::new();
    for group in runs.chunk_by(|a, b| a.marks.strong == b.marks.strong) {
        let leaves = group.iter().map(|run| run.leaf.to_inline()).collect();
        if group.first().is_some_and(|run| run.marks.strong) {
            out.push(Inline::Strong(leaves));
        } else {
            out.extend(leaves);
        }
    }
    out
}
