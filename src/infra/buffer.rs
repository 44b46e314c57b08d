//! Host text buffer boundary.
//!
//! The extractor only reads text through [`TextBuffer`]. Editors that own
//! their own model implement the trait; everything else can use
//! [`SourceBuffer`], which also produces the change events the extractor
//! consumes.

use serde::{Deserialize, Serialize};

use crate::infra::line_index::LineIndex;

/// 1-based editor position. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position
{
    pub line: usize,
    pub column: usize,
}

impl Position
{
    pub const fn new(
        line: usize,
        column: usize,
    ) -> Self
    {
        Self { line, column }
    }
}

/// Inclusive-start, exclusive-end editor range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range
{
    pub start: Position,
    pub end: Position,
}

impl Range
{
    pub const fn new(
        start: Position,
        end: Position,
    ) -> Self
    {
        Self { start, end }
    }

    /// Empty range at a position, used for pure insertions.
    pub const fn caret(at: Position) -> Self
    {
        Self { start: at, end: at }
    }
}

/// One edit as reported by the host, in pre-change coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange
{
    /// Replaced range (pre-change)
    pub range: Range,
    /// Byte offset of `range.start` (pre-change)
    pub range_offset: usize,
    /// Byte length of the replaced text
    pub range_length: usize,
    /// Inserted text
    pub text: String,
}

/// A batch of edits delivered by one change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent
{
    pub changes: Vec<ContentChange>,
}

impl From<ContentChange> for ChangeEvent
{
    fn from(change: ContentChange) -> Self
    {
        Self { changes: vec![change] }
    }
}

/// Read-only view of the host buffer.
pub trait TextBuffer
{
    /// Full buffer text.
    fn value(&self) -> &str;

    /// Byte offset of a position (clamped to the buffer).
    fn offset_at(
        &self,
        position: Position,
    ) -> usize;

    /// Position of a byte offset (clamped to the buffer).
    fn position_at(
        &self,
        offset: usize,
    ) -> Position;

    /// Number of lines (at least 1).
    fn line_count(&self) -> usize;

    /// Column one past the last character of `line`.
    fn line_max_column(
        &self,
        line: usize,
    ) -> usize;

    /// Text of `line` without its terminator.
    fn line_content(
        &self,
        line: usize,
    ) -> &str;

    /// Text covered by `range`.
    fn value_in_range(
        &self,
        range: Range,
    ) -> &str
    {
        let start = self.offset_at(range.start);
        let end = self
            .offset_at(range.end)
            .max(start);

        self.value()
            .get(start..end)
            .unwrap_or("")
    }
}

/// Owned in-memory buffer with a newline index.
#[derive(Debug, Clone, Default)]
pub struct SourceBuffer
{
    text: String,
    index: LineIndex,
}

impl SourceBuffer
{
    pub fn new(text: impl Into<String>) -> Self
    {
        let text = text.into();
        let index = LineIndex::build(text.as_bytes());

        Self { text, index }
    }

    /// Replace `range` with `text` and describe the edit as a change event.
    pub fn replace(
        &mut self,
        range: Range,
        text: &str,
    ) -> ContentChange
    {
        // Normalize a backwards range before measuring it
        let (start, end) = if range.end < range.start
        {
            (range.end, range.start)
        }
        else
        {
            (range.start, range.end)
        };

        let start_offset = self.offset_at(start);
        let end_offset = self
            .offset_at(end)
            .max(start_offset);

        let change = ContentChange {
            range: Range::new(self.position_at(start_offset), self.position_at(end_offset)),
            range_offset: start_offset,
            range_length: end_offset - start_offset,
            text: text.to_string(),
        };

        self.apply(&change);
        change
    }

    /// Insert `text` at `at`.
    pub fn insert(
        &mut self,
        at: Position,
        text: &str,
    ) -> ContentChange
    {
        self.replace(Range::caret(at), text)
    }

    /// Apply a change produced elsewhere (e.g. replayed from a host log).
    pub fn apply(
        &mut self,
        change: &ContentChange,
    )
    {
        let start = floor_char_boundary(
            &self.text,
            change
                .range_offset
                .min(self.text.len()),
        );
        let end = floor_char_boundary(
            &self.text,
            (start + change.range_length).min(
                self.text
                    .len(),
            ),
        );

        self.text
            .replace_range(start..end, &change.text);
        self.index = LineIndex::build(
            self.text
                .as_bytes(),
        );
    }
}

impl TextBuffer for SourceBuffer
{
    fn value(&self) -> &str
    {
        &self.text
    }

    fn offset_at(
        &self,
        position: Position,
    ) -> usize
    {
        let raw = self
            .index
            .offset_of(
                position.line,
                position.column,
                self.text
                    .as_bytes(),
            );

        floor_char_boundary(&self.text, raw)
    }

    fn position_at(
        &self,
        offset: usize,
    ) -> Position
    {
        let offset = floor_char_boundary(
            &self.text,
            offset.min(
                self.text
                    .len(),
            ),
        );
        let (line, column) = self
            .index
            .position_of(offset);

        Position::new(line, column)
    }

    fn line_count(&self) -> usize
    {
        self.index
            .line_count()
    }

    fn line_max_column(
        &self,
        line: usize,
    ) -> usize
    {
        let bytes = self
            .text
            .as_bytes();

        self.index
            .line_end(line, bytes)
            - self
                .index
                .line_start(line)
            + 1
    }

    fn line_content(
        &self,
        line: usize,
    ) -> &str
    {
        let start = self
            .index
            .line_start(line);
        let end = self
            .index
            .line_end(
                line,
                self.text
                    .as_bytes(),
            );

        self.text
            .get(start..end)
            .unwrap_or("")
    }
}

/// Largest char boundary at or below `offset`.
pub(crate) fn floor_char_boundary(
    text: &str,
    offset: usize,
) -> usize
{
    let mut at = offset.min(text.len());
    while at > 0 && !text.is_char_boundary(at)
    {
        at -= 1;
    }
    at
}
