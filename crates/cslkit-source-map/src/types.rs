//! Core types for source positions.

use serde::{Deserialize, Serialize};

/// A location in source text (0-indexed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset from start of source.
    pub offset: usize,
    /// Row number (0-indexed).
    pub row: usize,
    /// Column number (0-indexed, in characters not bytes).
    pub column: usize,
}

/// A range in source text from start to end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Start location (inclusive).
    pub start: Location,
    /// End location (exclusive).
    pub end: Location,
}

impl Range {
    /// Create a range from two locations.
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    /// Whether the range covers zero bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ordering() {
        let loc1 = Location {
            offset: 0,
            row: 0,
            column: 0,
        };
        let loc2 = Location {
            offset: 5,
            row: 0,
            column: 5,
        };
        let loc3 = Location {
            offset: 10,
            row: 1,
            column: 0,
        };

        assert!(loc1 < loc2);
        assert!(loc2 < loc3);
    }

    #[test]
    fn test_range_len() {
        let range = Range::new(
            Location {
                offset: 3,
                row: 0,
                column: 3,
            },
            Location {
                offset: 8,
                row: 0,
                column: 8,
            },
        );
        assert_eq!(range.len(), 5);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let range = Range::new(
            Location {
                offset: 0,
                row: 0,
                column: 0,
            },
            Location {
                offset: 50,
                row: 2,
                column: 10,
            },
        );
        let json = serde_json::to_string(&range).unwrap();
        let deserialized: Range = serde_json::from_str(&json).unwrap();
        assert_eq!(range, deserialized);
    }
}
