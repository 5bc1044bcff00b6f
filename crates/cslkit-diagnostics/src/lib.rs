//! Structured diagnostic messages for cslkit.
//!
//! Parsers and validators in cslkit do not stop at the first problem; they
//! accumulate [`DiagnosticMessage`]s that carry an error code, a source
//! position, the offending source line, and optional hints. A style is
//! rejected only when at least one diagnostic has error severity.
//!
//! # Example
//!
//! ```
//! use cslkit_diagnostics::DiagnosticMessageBuilder;
//!
//! let msg = DiagnosticMessageBuilder::error("Invalid Attribute Value")
//!     .with_code("CK-2-3")
//!     .problem("Invalid value 'sideways' for attribute 'form'")
//!     .add_detail("Expected: long, short, verb, verb-short, or symbol")
//!     .build();
//! assert!(msg.is_error());
//! ```

pub mod builder;
pub mod diagnostic;

pub use builder::DiagnosticMessageBuilder;
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
