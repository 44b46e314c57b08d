//! Incremental parse manager.
//!
//! Owns the syntax tree and the queue of pending edits. Edits are recorded
//! cheaply; the tree is brought up to date lazily by [`ParseManager::ensure_current`],
//! which batches every queued edit into one incremental reparse.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace, warn};
use tree_sitter::{InputEdit, Language, Parser, Point, Tree};

use crate::ExtractorError;
use crate::infra::buffer::{ContentChange, TextBuffer};

/// Grammar handle created once and passed to every extractor.
#[derive(Clone)]
pub struct Grammar
{
    language: Language,
}

impl std::fmt::Debug for Grammar
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.debug_struct("Grammar")
            .field("language", &"javascript")
            .finish()
    }
}

impl Grammar
{
    /// Load the JavaScript grammar and verify a parser accepts it.
    pub fn javascript() -> Result<Self, ExtractorError>
    {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();

        // Fail here, once, rather than on every parse
        let mut check = Parser::new();
        check.set_language(&language)?;

        Ok(Self { language })
    }

    pub fn language(&self) -> &Language
    {
        &self.language
    }

    /// Fresh parser bound to this grammar.
    pub fn parser(&self) -> Result<Parser, ExtractorError>
    {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

/// One queued buffer edit in tree coordinates.
///
/// `start`/`old_end` are pre-change, `new_end` is post-change. Rows and
/// columns are 0-based; columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingEdit
{
    pub start_index: usize,
    pub old_end_index: usize,
    pub new_end_index: usize,
    pub start_position: (usize, usize),
    pub old_end_position: (usize, usize),
    pub new_end_position: (usize, usize),
}

impl PendingEdit
{
    /// Normalize a host change event.
    pub fn from_change(change: &ContentChange) -> Self
    {
        let start = (
            change
                .range
                .start
                .line
                .saturating_sub(1),
            change
                .range
                .start
                .column
                .saturating_sub(1),
        );
        let old_end = (
            change
                .range
                .end
                .line
                .saturating_sub(1),
            change
                .range
                .end
                .column
                .saturating_sub(1),
        );

        Self {
            start_index: change.range_offset,
            old_end_index: change.range_offset + change.range_length,
            new_end_index: change.range_offset
                + change
                    .text
                    .len(),
            start_position: start,
            old_end_position: old_end,
            new_end_position: advance(start, &change.text),
        }
    }

    fn to_input_edit(self) -> InputEdit
    {
        let point = |(row, column): (usize, usize)| Point::new(row, column);

        InputEdit {
            start_byte: self.start_index,
            old_end_byte: self.old_end_index,
            new_end_byte: self.new_end_index,
            start_position: point(self.start_position),
            old_end_position: point(self.old_end_position),
            new_end_position: point(self.new_end_position),
        }
    }
}

/// Point reached after inserting `text` at `start`.
fn advance(
    start: (usize, usize),
    text: &str,
) -> (usize, usize)
{
    let normalized = text.replace("\r\n", "\n");
    let fragments: Vec<&str> = normalized
        .split('\n')
        .collect();
    let last = fragments
        .last()
        .map_or(0, |f| f.len());

    if fragments.len() == 1
    {
        (start.0, start.1 + last)
    }
    else
    {
        (start.0 + fragments.len() - 1, last)
    }
}

/// Snapshot of the manager's bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct TreeStatus
{
    pub is_dirty: bool,
    pub has_tree: bool,
    pub pending_edits_count: usize,
    pub last_parse_time: Option<DateTime<Utc>>,
}

/// Owns the tree, the parser and the edit queue.
pub struct ParseManager
{
    parser: Parser,
    tree: Option<Tree>,
    pending: Vec<PendingEdit>,
    dirty: bool,
    last_parse: Option<DateTime<Utc>>,
}

impl ParseManager
{
    /// A manager whose first `ensure_current` parses from scratch.
    pub fn new(grammar: &Grammar) -> Result<Self, ExtractorError>
    {
        Ok(Self::with_parser(grammar.parser()?))
    }

    pub(crate) fn with_parser(parser: Parser) -> Self
    {
        Self {
            parser,
            tree: None,
            pending: Vec::new(),
            dirty: true,
            last_parse: None,
        }
    }

    /// Queue one change; never parses.
    pub fn record_edit(
        &mut self,
        change: &ContentChange,
    )
    {
        let edit = PendingEdit::from_change(change);
        trace!(?edit, "queued edit");

        self.pending
            .push(edit);
        self.dirty = true;
    }

    /// Bring the tree up to date with `buffer`.
    pub fn ensure_current<B: TextBuffer + ?Sized>(
        &mut self,
        buffer: &B,
    )
    {
        if !self.dirty
        {
            return;
        }

        let text = buffer.value();
        let pending = std::mem::take(&mut self.pending);

        let next = match self
            .tree
            .take()
        {
            Some(mut old) if is_ascending(&pending) =>
            {
                for edit in &pending
                {
                    old.edit(&edit.to_input_edit());
                }
                debug!(edits = pending.len(), "incremental reparse");
                self.parser
                    .parse(text, Some(&old))
            }
            Some(_) =>
            {
                debug!(edits = pending.len(), "edits out of order; full reparse");
                self.parser
                    .parse(text, None)
            }
            None =>
            {
                debug!(bytes = text.len(), "initial parse");
                self.parser
                    .parse(text, None)
            }
        };

        if next.is_none()
        {
            warn!("parser produced no tree; extraction falls back to raw lines");
        }

        self.tree = next;
        self.dirty = false;
        self.last_parse = Some(Utc::now());
    }

    /// Current tree, if the last parse succeeded.
    pub fn tree(&self) -> Option<&Tree>
    {
        self.tree
            .as_ref()
    }

    pub fn status(&self) -> TreeStatus
    {
        TreeStatus {
            is_dirty: self.dirty,
            has_tree: self
                .tree
                .is_some(),
            pending_edits_count: self
                .pending
                .len(),
            last_parse_time: self.last_parse,
        }
    }
}

/// Edits already sorted by start offset keep their sequential meaning.
fn is_ascending(edits: &[PendingEdit]) -> bool
{
    edits
        .windows(2)
        .all(|w| w[0].start_index <= w[1].start_index)
}
