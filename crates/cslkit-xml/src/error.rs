//! Error types for XML parsing with source locations.

use cslkit_diagnostics::{DiagnosticMessage, DiagnosticMessageBuilder};
use cslkit_source_map::Range;
use std::fmt;

/// Result type alias for cslkit-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during XML parsing.
#[derive(Debug, Clone)]
pub enum Error {
    /// XML syntax error from quick-xml.
    Syntax {
        message: String,
        /// Byte offset where the error occurred.
        offset: Option<usize>,
    },

    /// Unexpected end of input.
    UnexpectedEof {
        /// What was expected when EOF was encountered.
        expected: String,
        location: Option<Range>,
    },

    /// Mismatched end tag.
    MismatchedEndTag {
        expected: String,
        found: String,
        location: Option<Range>,
    },

    /// A closing tag with no matching open element.
    UnexpectedEndTag { found: String },

    /// Empty document (no root element).
    EmptyDocument,

    /// Multiple root elements.
    MultipleRoots { location: Option<Range> },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax { message, offset } => {
                write!(f, "XML syntax error: {}", message)?;
                if let Some(pos) = offset {
                    write!(f, " at byte {}", pos)?;
                }
                Ok(())
            }
            Error::UnexpectedEof { expected, .. } => {
                write!(f, "Unexpected end of input, expected {}", expected)
            }
            Error::MismatchedEndTag {
                expected, found, ..
            } => {
                write!(
                    f,
                    "Mismatched end tag: expected </{}>, found </{}>",
                    expected, found
                )
            }
            Error::UnexpectedEndTag { found } => {
                write!(f, "Unexpected closing tag </{}>", found)
            }
            Error::EmptyDocument => {
                write!(f, "Empty XML document: no root element found")
            }
            Error::MultipleRoots { .. } => {
                write!(f, "Invalid XML: multiple root elements")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Convert this error to a DiagnosticMessage with the appropriate CK-1-* code.
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        match self {
            Error::Syntax { message, offset } => {
                let mut builder = DiagnosticMessageBuilder::error("XML Syntax Error")
                    .with_code("CK-1-1")
                    .problem(message.clone());

                if let Some(pos) = offset {
                    builder = builder.add_detail(format!("Error at byte offset {}", pos));
                }

                builder.build()
            }

            Error::UnexpectedEof { expected, location } => {
                let mut builder = DiagnosticMessageBuilder::error("Unexpected End of XML Input")
                    .with_code("CK-1-2")
                    .problem(format!(
                        "The XML document ended unexpectedly; expected {}",
                        expected
                    ));

                if let Some(loc) = location {
                    builder = builder.with_location(loc.clone());
                }

                builder.build()
            }

            Error::MismatchedEndTag {
                expected,
                found,
                location,
            } => {
                let mut builder = DiagnosticMessageBuilder::error("Mismatched XML End Tag")
                    .with_code("CK-1-3")
                    .problem(format!(
                        "End tag </{}> does not match start tag <{}>",
                        found, expected
                    ))
                    .add_hint("Check that all opening tags have matching closing tags?");

                if let Some(loc) = location {
                    builder = builder.with_location(loc.clone());
                }

                builder.build()
            }

            Error::UnexpectedEndTag { found } => {
                DiagnosticMessageBuilder::error("Unexpected XML End Tag")
                    .with_code("CK-1-4")
                    .problem(format!("Closing tag </{}> has no matching open tag", found))
                    .build()
            }

            Error::EmptyDocument => DiagnosticMessageBuilder::error("Empty XML Document")
                .with_code("CK-1-5")
                .problem("The XML document contains no root element")
                .build(),

            Error::MultipleRoots { location } => {
                let mut builder = DiagnosticMessageBuilder::error("Multiple XML Root Elements")
                    .with_code("CK-1-6")
                    .problem("The XML document contains multiple root elements")
                    .add_hint("Wrap multiple elements in a single container element?");

                if let Some(loc) = location {
                    builder = builder.with_location(loc.clone());
                }

                builder.build()
            }
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Syntax {
            message: err.to_string(),
            offset: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Syntax {
            message: format!("Attribute error: {}", err),
            offset: None,
        }
    }
}
