//! Utility functions for working with source positions.

use crate::types::{Location, Range};

/// Convert a byte offset to a Location with line and column info.
///
/// Offsets past the end of the source are clamped to the end, so positions
/// reported by a parser that has consumed the whole input stay usable.
pub fn offset_to_location(source: &str, offset: usize) -> Location {
    let offset = offset.min(source.len());
    let mut row = 0;
    let mut column = 0;
    let mut current_offset = 0;

    for ch in source.chars() {
        if current_offset >= offset {
            break;
        }

        if ch == '\n' {
            row += 1;
            column = 0;
        } else {
            column += 1;
        }

        current_offset += ch.len_utf8();
    }

    Location {
        offset,
        row,
        column,
    }
}

/// Create a Range from start and end byte offsets, resolving rows and
/// columns against the source text.
pub fn range_from_offsets(source: &str, start: usize, end: usize) -> Range {
    Range {
        start: offset_to_location(source, start),
        end: offset_to_location(source, end),
    }
}

/// Extract the source line containing the start of `range`.
///
/// Used by diagnostics to quote the offending line next to its position.
pub fn excerpt_at(source: &str, range: &Range) -> String {
    let offset = range.start.offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    source[line_start..line_end].to_string()
}
