//! Source-tracked XML parsing for cslkit.
//!
//! This crate wraps [`quick-xml`] to provide a tree of [`XmlElement`]s where
//! each element, attribute, and text node tracks its position in the
//! original source. Style and locale validation build on these positions to
//! report diagnostics against the exact byte, line, and column.
//!
//! # Example
//!
//! ```rust
//! use cslkit_xml::parse;
//!
//! let xml = parse(r#"<style version="1.0">
//!   <macro name="author">
//!     <text variable="author"/>
//!   </macro>
//! </style>"#).unwrap();
//!
//! assert_eq!(xml.root.name, "style");
//! assert_eq!(xml.root.get_attribute("version"), Some("1.0"));
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use cslkit_source_map::Range;
pub use error::{Error, Result};
pub use parser::parse;
pub use types::{XmlAttribute, XmlChild, XmlChildren, XmlDocument, XmlElement};
