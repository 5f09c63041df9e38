//! Line index for offset ↔ position lookups

use crate::types::{Location, Range};
use serde::{Deserialize, Serialize};

/// Line index for one file.
///
/// Stores the byte offset at which every line starts so that offset to
/// (row, column) conversion is a binary search. Columns are reported in
/// UTF-16 code units; for pure ASCII files this is the byte distance from the
/// line start and the file content is never rescanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offset of the first character of each line. Always starts with 0.
    line_starts: Vec<usize>,

    /// Total length of the file in bytes
    total_length: usize,

    /// Whether the content is pure ASCII (columns equal byte distances)
    ascii: bool,
}

impl FileInformation {
    /// Build the line index for `content`.
    pub fn new(content: &str) -> Self {
        let mut line_starts = Vec::with_capacity(content.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(
            content
                .bytes()
                .enumerate()
                .filter_map(|(idx, b)| (b == b'\n').then_some(idx + 1)),
        );

        FileInformation {
            line_starts,
            total_length: content.len(),
            ascii: content.is_ascii(),
        }
    }

    /// Row containing `offset`. Offsets past the end map to the last row.
    fn row_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(row) => row,
            Err(next) => next.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a [`Location`].
    ///
    /// `content` must be the text this index was built from. Offsets inside a
    /// multi-byte character are moved back to the character start. Returns
    /// `None` if the offset is out of bounds.
    pub fn offset_to_location(&self, content: &str, offset: usize) -> Option<Location> {
        if offset > self.total_length || content.len() != self.total_length {
            return None;
        }

        let mut offset = offset;
        while !content.is_char_boundary(offset) {
            offset -= 1;
        }

        let row = self.row_of(offset);
        let line_start = self.line_starts[row];
        let column = if self.ascii {
            offset - line_start
        } else {
            content[line_start..offset].encode_utf16().count()
        };

        Some(Location {
            offset,
            row,
            column,
        })
    }

    /// Convert a pair of byte offsets to a [`Range`].
    pub fn range(&self, content: &str, start: usize, end: usize) -> Option<Range> {
        if start > end {
            return None;
        }
        Some(Range {
            start: self.offset_to_location(content, start)?,
            end: self.offset_to_location(content, end)?,
        })
    }

    /// Convert a (row, UTF-16 column) pair back to a byte offset.
    ///
    /// Returns `None` when the row does not exist or the column lies past the
    /// end of that line.
    pub fn location_to_offset(&self, content: &str, row: usize, column: usize) -> Option<usize> {
        let start = self.line_start(row)?;
        let end = self.line_end(content, row)?;

        if self.ascii {
            return (start + column <= end).then_some(start + column);
        }

        let mut units = 0;
        for (idx, ch) in content[start..end].char_indices() {
            if units == column {
                return Some(start + idx);
            }
            units += ch.len_utf16();
            if units > column {
                return None;
            }
        }
        (units == column).then_some(end)
    }

    /// Byte offset at which `row` starts.
    pub fn line_start(&self, row: usize) -> Option<usize> {
        self.line_starts.get(row).copied()
    }

    /// Byte offset at which `row` ends, excluding the line terminator.
    pub fn line_end(&self, content: &str, row: usize) -> Option<usize> {
        let next = match self.line_starts.get(row + 1) {
            Some(next) => next - 1,
            None if row < self.line_starts.len() => self.total_length,
            None => return None,
        };
        let bytes = content.as_bytes();
        if next > self.line_starts[row] && bytes.get(next - 1) == Some(&b'\r') {
            Some(next - 1)
        } else {
            Some(next)
        }
    }

    /// Get the total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
