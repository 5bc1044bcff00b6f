//! Source position tracking for cslkit parsers.
//!
//! Every parser in cslkit (XML, style, locale) reports positions using the
//! types in this crate so that diagnostics can point at the exact byte,
//! line, and column of a problem.

pub mod types;
pub mod utils;

pub use types::{Location, Range};
pub use utils::{excerpt_at, offset_to_location, range_from_offsets};
