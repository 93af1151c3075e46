use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::selection::Selection;
use super::structure;
use crate::error::EditorError;
use crate::models::{Document, Fragment, Leaf, LinkTarget, Mark, Position, Runs, Span};

/// Target of a block type change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Paragraph,
    Heading(u8),
    CodeBlock { language: Option<String> },
}

/// Every edit the engine can make. Positions and spans address the
/// flattened text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    InsertText {
        at: Position,
        text: String,
    },
    DeleteRange {
        span: Span,
    },
    ReplaceRange {
        span: Span,
        text: String,
    },
    ToggleMark {
        mark: Mark,
        span: Span,
    },
    SetMark {
        mark: Mark,
        span: Span,
        enabled: bool,
    },
    SetBlockType {
        at: Position,
        block_type: BlockType,
    },
    ToggleBlockType {
        at: Position,
        block_type: BlockType,
    },
    ToggleQuote {
        at: Position,
    },
    WrapInQuote {
        span: Span,
    },
    ToggleList {
        at: Position,
        ordered: bool,
    },
    WrapInList {
        span: Span,
        ordered: bool,
        start: Option<u64>,
        /// Positions of blocks that open a new item. Empty means one item
        /// per block.
        #[serde(default)]
        item_starts: Vec<Position>,
    },
    InsertLink {
        span: Span,
        url: String,
        title: Option<String>,
    },
    RemoveLink {
        span: Span,
    },
    InsertImage {
        at: Position,
        url: String,
        alt: String,
        title: Option<String>,
    },
    InsertThematicBreak {
        at: Position,
        #[serde(default)]
        before: bool,
    },
    RemoveBlock {
        at: Position,
    },
    InsertTable {
        rows: usize,
        columns: usize,
    },
    SetSelection {
        anchor: Position,
        focus: Position,
    },
    Batch(Vec<Command>),
}

impl Command {
    /// The command that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Command::Batch(Vec::new())
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Command::Batch(commands) if commands.iter().all(Command::is_noop))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertText { .. } => "InsertText",
            Command::DeleteRange { .. } => "DeleteRange",
            Command::ReplaceRange { .. } => "ReplaceRange",
            Command::ToggleMark { .. } => "ToggleMark",
            Command::SetMark { .. } => "SetMark",
            Command::SetBlockType { .. } => "SetBlockType",
            Command::ToggleBlockType { .. } => "ToggleBlockType",
            Command::ToggleQuote { .. } => "ToggleQuote",
            Command::WrapInQuote { .. } => "WrapInQuote",
            Command::ToggleList { .. } => "ToggleList",
            Command::WrapInList { .. } => "WrapInList",
            Command::InsertLink { .. } => "InsertLink",
            Command::RemoveLink { .. } => "RemoveLink",
            Command::InsertImage { .. } => "InsertImage",
            Command::InsertThematicBreak { .. } => "InsertThematicBreak",
            Command::RemoveBlock { .. } => "RemoveBlock",
            Command::InsertTable { .. } => "InsertTable",
            Command::SetSelection { .. } => "SetSelection",
            Command::Batch(_) => "Batch",
        }
    }
}

/// Outcome of a successful [`execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Applying this to the resulting state restores the prior state,
    /// selection included.
    pub inverse: Command,
    /// The new selection, when the command moved it.
    pub selection: Option<Selection>,
    /// Whether the document changed.
    pub changed: bool,
}

/// What a single application produced, before selection bookkeeping.
pub(crate) struct Applied {
    pub(crate) inverse: Command,
    pub(crate) changed: bool,
}

impl Applied {
    pub(crate) fn changed(inverse: Command) -> Self {
        Self {
            inverse,
            changed: true,
        }
    }

    pub(crate) fn unchanged() -> Self {
        Self {
            inverse: Command::noop(),
            changed: false,
        }
    }
}

/// Applies `command` to the document and selection.
///
/// On error neither is touched. On success the selection has been mapped
/// through the edit and clamped to the new text length.
pub fn execute(
    command: &Command,
    document: &mut Document,
    selection: &mut Selection,
) -> Result<CommandResult, EditorError> {
    let before = *selection;
    let Applied { inverse, changed } = apply(command, document, selection)?;
    *selection = selection.clamp(document.text_len());

    let moved = *selection != before;
    let inverse = if moved && !matches!(command, Command::SetSelection { .. }) {
        batch(vec![
            inverse,
            Command::SetSelection {
                anchor: before.anchor,
                focus: before.focus,
            },
        ])
    } else {
        inverse
    };

    debug!(
        "Executed {} (changed: {changed}, selection: {}..{})",
        command.name(),
        selection.anchor,
        selection.focus
    );
    trace!("Inverse: {inverse:?}");

    Ok(CommandResult {
        inverse,
        selection: moved.then_some(*selection),
        changed,
    })
}

/// Single application without the selection-restoring wrapper.
pub(crate) fn apply(
    command: &Command,
    document: &mut Document,
    selection: &mut Selection,
) -> Result<Applied, EditorError> {
    match command {
        Command::InsertText { at, text } => insert_text(document, selection, *at, text),
        Command::DeleteRange { span } => delete_range(document, selection, *span),
        Command::ReplaceRange { span, text } => replace_range(document, selection, *span, text),
        Command::ToggleMark { mark, span } => toggle_mark(document, *mark, *span),
        Command::SetMark {
            mark,
            span,
            enabled,
        } => set_mark(document, *mark, *span, *enabled),
        Command::SetBlockType { at, block_type } => {
            structure::set_block_type(document, *at, block_type)
        }
        Command::ToggleBlockType { at, block_type } => {
            structure::toggle_block_type(document, *at, block_type)
        }
        Command::ToggleQuote { at } => structure::toggle_quote(document, *at),
        Command::WrapInQuote { span } => structure::wrap_in_quote(document, *span),
        Command::ToggleList { at, ordered } => structure::toggle_list(document, *at, *ordered),
        Command::WrapInList {
            span,
            ordered,
            start,
            item_starts,
        } => structure::wrap_in_list(document, *span, *ordered, *start, item_starts),
        Command::InsertLink { span, url, title } => {
            let target = LinkTarget {
                url: url.clone(),
                title: title.clone(),
            };
            insert_link(document, selection, *span, target)
        }
        Command::RemoveLink { span } => remove_link(document, *span),
        Command::InsertImage {
            at,
            url,
            alt,
            title,
        } => {
            let image = Leaf::Image {
                url: url.clone(),
                alt: alt.clone(),
                title: title.clone(),
            };
            insert_image(document, selection, *at, image)
        }
        Command::InsertThematicBreak { at, before } => {
            structure::insert_thematic_break(document, selection, *at, *before)
        }
        Command::RemoveBlock { at } => structure::remove_block(document, selection, *at),
        Command::InsertTable { .. } => Err(EditorError::unsupported("tables are not supported")),
        Command::SetSelection { anchor, focus } => {
            document.check_position(*anchor)?;
            document.check_position(*focus)?;
            let previous = *selection;
            *selection = Selection::new(*anchor, *focus);
            Ok(Applied {
                inverse: Command::SetSelection {
                    anchor: previous.anchor,
                    focus: previous.focus,
                },
                changed: false,
            })
        }
        Command::Batch(commands) => apply_batch(commands, document, selection),
    }
}

/// Runs `commands` in order. If one fails, the document and selection are
/// put back as they were before the first.
fn apply_batch(
    commands: &[Command],
    document: &mut Document,
    selection: &mut Selection,
) -> Result<Applied, EditorError> {
    let saved_document = document.clone();
    let saved_selection = *selection;
    let mut inverses = Vec::with_capacity(commands.len());
    let mut changed = false;
    for command in commands {
        match apply(command, document, selection) {
            Ok(applied) => {
                *selection = selection.clamp(document.text_len());
                changed |= applied.changed;
                inverses.push(applied.inverse);
            }
            Err(err) => {
                *document = saved_document;
                *selection = saved_selection;
                debug!("Batch rolled back at {}: {err}", command.name());
                return Err(err);
            }
        }
    }
    inverses.reverse();
    inverses.retain(|inverse| !inverse.is_noop());
    Ok(Applied {
        inverse: batch(inverses),
        changed,
    })
}

/// Collapses a one-command batch into the command itself.
pub(crate) fn batch(mut commands: Vec<Command>) -> Command {
    if commands.len() == 1 {
        commands.remove(0)
    } else {
        Command::Batch(commands)
    }
}

fn insert_text(
    document: &mut Document,
    selection: &mut Selection,
    at: Position,
    text: &str,
) -> Result<Applied, EditorError> {
    let span = Span::caret(at);
    if text.is_empty() {
        document.locate(at)?;
        return Ok(Applied::unchanged());
    }
    document.splice(span, text)?;
    let len = text.chars().count();
    *selection = selection.map_through_insert(at, len);
    Ok(Applied::changed(Command::DeleteRange {
        span: Span::new(at, at + len),
    }))
}

fn delete_range(
    document: &mut Document,
    selection: &mut Selection,
    span: Span,
) -> Result<Applied, EditorError> {
    if span.is_empty() {
        document.locate_span(span)?;
        return Ok(Applied::unchanged());
    }
    let location = document.locate_span(span)?;
    let fragment = document.splice(span, "")?;
    *selection = selection.map_through_delete(span);

    let local = span.relative_to(location.start).start;
    let context = document
        .block(&location.path)
        .and_then(|block| block.inlines())
        .map(|content| Runs::from_inlines(content))
        .unwrap_or_default();
    Ok(Applied::changed(restore_fragment(
        span.start, &fragment, &context, local,
    )))
}

fn replace_range(
    document: &mut Document,
    selection: &mut Selection,
    span: Span,
    text: &str,
) -> Result<Applied, EditorError> {
    document.locate_span(span)?;
    let deleted = delete_range(document, selection, span)?;
    let inserted = insert_text(document, selection, span.start, text)?;
    let mut inverses: Vec<Command> = [inserted, deleted]
        .into_iter()
        .filter(|applied| applied.changed)
        .map(|applied| applied.inverse)
        .collect();
    if inverses.is_empty() {
        return Ok(Applied::unchanged());
    }
    Ok(Applied::changed(if inverses.len() == 1 {
        inverses.remove(0)
    } else {
        Command::Batch(inverses)
    }))
}

/// Commands that put `fragment` back at `at` with its exact formatting.
///
/// `context` is the block content the fragment goes back into and `local`
/// the insertion offset within it. Marks neither the fragment nor the
/// insertion point's neighbours carry need no restoring.
pub(crate) fn restore_fragment(
    at: Position,
    fragment: &Fragment,
    context: &Runs,
    local: usize,
) -> Command {
    let runs = match fragment {
        Fragment::Plain(text) => {
            return Command::InsertText {
                at,
                text: text.clone(),
            };
        }
        Fragment::Inline(runs) => runs,
    };

    let mut commands = Vec::new();
    let mut pending = String::new();
    let mut pending_at = at;
    let mut pos = at;
    for run in runs.runs() {
        if let Leaf::Image { url, alt, title } = &run.leaf {
            if !pending.is_empty() {
                commands.push(Command::InsertText {
                    at: pending_at,
                    text: std::mem::take(&mut pending),
                });
            }
            commands.push(Command::InsertImage {
                at: pos,
                url: url.clone(),
                alt: alt.clone(),
                title: title.clone(),
            });
            pos += 1;
            pending_at = pos;
        } else {
            run.leaf.push_text(&mut pending);
            pos += run.leaf.len();
        }
    }
    if !pending.is_empty() {
        commands.push(Command::InsertText {
            at: pending_at,
            text: pending,
        });
    }

    let whole = Span::new(0, runs.len());
    let before = local.checked_sub(1).and_then(|offset| context.run_at(offset));
    let after = context.run_at(local);
    let neighbours = [before, after];

    for mark in Mark::ALL {
        let segments = runs.mark_segments(whole, mark);
        let neighbour_has = neighbours.iter().flatten().any(|run| run.has_mark(mark));
        if neighbour_has || segments.iter().any(|(_, on)| *on) {
            commands.extend(segments.into_iter().map(|(segment, enabled)| {
                Command::SetMark {
                    mark,
                    span: segment.offset_by(at),
                    enabled,
                }
            }));
        }
    }

    let links = runs.link_segments(whole);
    let neighbour_linked = neighbours
        .iter()
        .flatten()
        .any(|run| run.marks.link.is_some());
    if neighbour_linked || links.iter().any(|(_, link)| link.is_some()) {
        commands.extend(links.into_iter().map(|(segment, link)| match link {
            Some(target) => Command::InsertLink {
                span: segment.offset_by(at),
                url: target.url,
                title: target.title,
            },
            None => Command::RemoveLink {
                span: segment.offset_by(at),
            },
        }));
    }

    batch(commands)
}

/// Runs `edit` over the inline content of the paragraph or heading holding
/// `span`, with `span` made local to it. Returns the closure's result, whether
/// the content changed, and the block's start position.
fn edit_inlines<T>(
    document: &mut Document,
    span: Span,
    edit: impl FnOnce(&mut Runs, Span) -> T,
) -> Result<(T, bool, Position), EditorError> {
    let location = document.locate_span(span)?;
    let local = span.relative_to(location.start);
    let content = document
        .block_mut(&location.path)
        .and_then(|block| block.inlines_mut())
        .ok_or_else(|| {
            EditorError::unsupported("inline formatting needs a paragraph or heading")
        })?;
    let mut runs = Runs::from_inlines(content);
    let result = edit(&mut runs, local);
    let rebuilt = runs.to_inlines();
    let changed = rebuilt != *content;
    *content = rebuilt;
    Ok((result, changed, location.start))
}

fn toggle_mark(document: &mut Document, mark: Mark, span: Span) -> Result<Applied, EditorError> {
    if span.is_empty() {
        document.locate_span(span)?;
        return Ok(Applied::unchanged());
    }
    let ((covered, segments), changed, base) = edit_inlines(document, span, |runs, local| {
        let segments = runs.mark_segments(local, mark);
        let covered = runs.covers(local, mark);
        runs.set_mark(local, mark, !covered);
        (covered, segments)
    })?;
    if !changed {
        return Ok(Applied::unchanged());
    }
    let uniform = covered || segments.iter().all(|(_, on)| !on);
    let inverse = if uniform {
        Command::ToggleMark { mark, span }
    } else {
        restore_mark(mark, segments, base)
    };
    Ok(Applied::changed(inverse))
}

fn set_mark(
    document: &mut Document,
    mark: Mark,
    span: Span,
    enabled: bool,
) -> Result<Applied, EditorError> {
    if span.is_empty() {
        document.locate_span(span)?;
        return Ok(Applied::unchanged());
    }
    let (segments, changed, base) = edit_inlines(document, span, |runs, local| {
        let segments = runs.mark_segments(local, mark);
        runs.set_mark(local, mark, enabled);
        segments
    })?;
    if !changed {
        return Ok(Applied::unchanged());
    }
    Ok(Applied::changed(restore_mark(mark, segments, base)))
}

fn restore_mark(mark: Mark, segments: Vec<(Span, bool)>, base: Position) -> Command {
    batch(
        segments
            .into_iter()
            .map(|(segment, enabled)| Command::SetMark {
                mark,
                span: segment.offset_by(base),
                enabled,
            })
            .collect(),
    )
}

fn restore_links(segments: Vec<(Span, Option<LinkTarget>)>, base: Position) -> Command {
    batch(
        segments
            .into_iter()
            .map(|(segment, link)| match link {
                Some(target) => Command::InsertLink {
                    span: segment.offset_by(base),
                    url: target.url,
                    title: target.title,
                },
                None => Command::RemoveLink {
                    span: segment.offset_by(base),
                },
            })
            .collect(),
    )
}

fn insert_link(
    document: &mut Document,
    selection: &mut Selection,
    span: Span,
    target: LinkTarget,
) -> Result<Applied, EditorError> {
    if span.is_empty() {
        if target.url.is_empty() {
            document.locate_span(span)?;
            return Ok(Applied::unchanged());
        }
        let len = target.url.chars().count();
        let url = target.url.clone();
        edit_inlines(document, span, |runs, local| {
            runs.insert_text(local.start, &url);
            runs.set_link(Span::new(local.start, local.start + len), Some(target));
        })?;
        *selection = selection.map_through_insert(span.start, len);
        return Ok(Applied::changed(Command::DeleteRange {
            span: Span::new(span.start, span.start + len),
        }));
    }

    let (segments, changed, base) = edit_inlines(document, span, |runs, local| {
        let segments = runs.link_segments(local);
        runs.set_link(local, Some(target));
        segments
    })?;
    if !changed {
        return Ok(Applied::unchanged());
    }
    Ok(Applied::changed(restore_links(segments, base)))
}

fn remove_link(document: &mut Document, span: Span) -> Result<Applied, EditorError> {
    if span.is_empty() {
        document.locate_span(span)?;
        return Ok(Applied::unchanged());
    }
    let (segments, changed, base) = edit_inlines(document, span, |runs, local| {
        let segments = runs.link_segments(local);
        runs.set_link(local, None);
        segments
    })?;
    if !changed {
        return Ok(Applied::unchanged());
    }
    let linked = segments
        .into_iter()
        .filter(|(_, link)| link.is_some())
        .collect();
    Ok(Applied::changed(restore_links(linked, base)))
}

fn insert_image(
    document: &mut Document,
    selection: &mut Selection,
    at: Position,
    image: Leaf,
) -> Result<Applied, EditorError> {
    let span = Span::caret(at);
    edit_inlines(document, span, |runs, local| {
        runs.insert_leaf(local.start, image);
    })?;
    *selection = selection.map_through_insert(at, 1);
    Ok(Applied::changed(Command::DeleteRange {
        span: Span::new(at, at + 1),
    }))
}
