//! Byte spans and full-line snapping.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::infra::buffer::{Position, TextBuffer};

/// Half-open byte range `[start, end)` into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span
{
    pub start: usize,
    pub end: usize,
}

impl Span
{
    pub const fn new(
        start: usize,
        end: usize,
    ) -> Self
    {
        Self { start, end }
    }

    pub fn len(&self) -> usize
    {
        self.end
            .saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Overlap test used by every reservation and dedupe step.
    pub fn overlaps(
        &self,
        other: &Span,
    ) -> bool
    {
        !(self.end <= other.start || self.start >= other.end)
    }

    /// Smallest span covering both.
    pub fn union(
        &self,
        other: &Span,
    ) -> Span
    {
        Span::new(
            self.start
                .min(other.start),
            self.end
                .max(other.end),
        )
    }

    /// Text slice for this span (empty when out of range).
    pub fn slice<'a>(
        &self,
        text: &'a str,
    ) -> &'a str
    {
        text.get(self.start..self.end)
            .unwrap_or("")
    }
}

/// Offset of column 1 on `line`.
pub fn line_start<B: TextBuffer + ?Sized>(
    buf: &B,
    line: usize,
) -> usize
{
    buf.offset_at(Position::new(line, 1))
}

/// Offset of the last column on `line` (before its terminator).
pub fn line_end<B: TextBuffer + ?Sized>(
    buf: &B,
    line: usize,
) -> usize
{
    buf.offset_at(Position::new(line, buf.line_max_column(line)))
}

/// Span covering lines `start_line..=end_line` in full, clamped to the buffer.
pub fn full_lines<B: TextBuffer + ?Sized>(
    buf: &B,
    start_line: usize,
    end_line: usize,
) -> Span
{
    let last = buf.line_count();
    let start_line = start_line.clamp(1, last);
    let end_line = end_line.clamp(start_line, last);

    Span::new(line_start(buf, start_line), line_end(buf, end_line))
}

/// Snap an arbitrary span outward to full lines.
pub fn snap_to_lines<B: TextBuffer + ?Sized>(
    buf: &B,
    span: Span,
) -> Span
{
    let first = buf
        .position_at(span.start)
        .line;
    let last = buf
        .position_at(span.end)
        .line;

    full_lines(buf, first, last.max(first))
}

/// 1-based inclusive line span of a node.
///
/// A node ending at column 0 of a row actually ends on the row before.
pub fn node_lines(node: Node) -> (usize, usize)
{
    let start = node
        .start_position()
        .row;
    let end = node.end_position();

    let end_row = if end.column == 0 && end.row > start
    {
        end.row - 1
    }
    else
    {
        end.row
    };

    (start + 1, end_row + 1)
}

/// 1-based line of a byte offset.
pub fn line_of<B: TextBuffer + ?Sized>(
    buf: &B,
    offset: usize,
) -> usize
{
    buf.position_at(offset)
        .line
}
