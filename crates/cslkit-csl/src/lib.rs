//! CSL style and locale semantics for cslkit.
//!
//! This crate turns source-tracked XML from [`cslkit_xml`] into semantic
//! types: [`Style`] (the parsed citation style), [`Locale`] (language-tagged
//! term bundles), and [`Lang`] (language tags with fallback chains). Parsing
//! and validation happen in a single traversal that accumulates positioned
//! [`DiagnosticMessage`](cslkit_diagnostics::DiagnosticMessage)s rather than
//! stopping at the first problem.
//!
//! # Example
//!
//! ```rust
//! use cslkit_csl::validate_style;
//!
//! let csl = r#"<?xml version="1.0" encoding="utf-8"?>
//! <style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
//!   <info><title>Test Style</title></info>
//!   <citation><layout><text variable="title"/></layout></citation>
//! </style>"#;
//!
//! let outcome = validate_style(csl);
//! assert!(outcome.is_usable());
//! let style = outcome.style.unwrap();
//! assert_eq!(style.version, "1.0");
//! ```

pub mod lang;
pub mod locale;
pub mod parser;
pub mod types;

pub use lang::Lang;
pub use locale::{Locale, Term, validate_locale, validate_module};
pub use parser::{StyleValidation, validate_style};
pub use types::*;
