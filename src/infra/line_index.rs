//! Newline index for O(1) line→offset and O(log n) offset→line mapping.
//!
//! Conventions
//! - Lines and columns are 1-based (editor convention).
//! - Columns count bytes, matching tree-sitter points.
//! - A buffer always has at least one line, even when empty.
//! - Line ends exclude the '\n' and a preceding '\r'.

/// Byte positions of every '\n' plus the total length.
#[derive(Debug, Clone, Default)]
pub struct LineIndex
{
    /// Offsets of each '\n' in ascending order
    newlines: Vec<usize>,
    /// Total byte length of the indexed text
    len: usize,
}

impl LineIndex
{
    /// Scan `bytes` once and record newline offsets.
    pub fn build(bytes: &[u8]) -> Self
    {
        let newlines: Vec<usize> = memchr::memchr_iter(b'\n', bytes).collect();

        Self { newlines, len: bytes.len() }
    }

    /// Number of lines; an empty buffer has one empty line.
    pub fn line_count(&self) -> usize
    {
        self.newlines
            .len()
            + 1
    }

    /// Byte length of the indexed text.
    pub fn len(&self) -> usize
    {
        self.len
    }

    /// True when the indexed text is empty.
    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    /// Clamp a 1-based line into `[1, line_count]`.
    pub fn clamp_line(
        &self,
        line: usize,
    ) -> usize
    {
        line.clamp(1, self.line_count())
    }

    /// Start offset (inclusive) of a 1-based line, clamped.
    pub fn line_start(
        &self,
        line: usize,
    ) -> usize
    {
        let line = self.clamp_line(line);
        if line == 1
        {
            return 0;
        }

        // One past the previous newline
        self.newlines[line - 2] + 1
    }

    /// End offset (exclusive, before "\n" or "\r\n") of a 1-based line, clamped.
    pub fn line_end(
        &self,
        line: usize,
        bytes: &[u8],
    ) -> usize
    {
        let line = self.clamp_line(line);

        match self
            .newlines
            .get(line - 1)
        {
            Some(&nl) if nl > 0 && bytes.get(nl - 1) == Some(&b'\r') => nl - 1,
            Some(&nl) => nl,
            None => self.len,
        }
    }

    /// 1-based line holding `offset`; a '\n' belongs to the line it ends.
    pub fn line_of(
        &self,
        offset: usize,
    ) -> usize
    {
        let offset = offset.min(self.len);

        // Count newlines strictly before `offset`
        self.newlines
            .partition_point(|&nl| nl < offset)
            + 1
    }

    /// 1-based `(line, column)` for a byte offset.
    pub fn position_of(
        &self,
        offset: usize,
    ) -> (usize, usize)
    {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);

        (line, offset - self.line_start(line) + 1)
    }

    /// Byte offset for a 1-based `(line, column)`, clamped to the line.
    pub fn offset_of(
        &self,
        line: usize,
        column: usize,
        bytes: &[u8],
    ) -> usize
    {
        let start = self.line_start(line);
        let end = self.line_end(line, bytes);

        (start + column.saturating_sub(1)).min(end)
    }
}
