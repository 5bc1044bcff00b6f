//! Builder API for diagnostic messages.

use crate::diagnostic::{
    DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent,
};
use cslkit_source_map::Range;

/// Fluent builder for [`DiagnosticMessage`].
///
/// # Example
///
/// ```
/// use cslkit_diagnostics::DiagnosticMessageBuilder;
///
/// let msg = DiagnosticMessageBuilder::error("Missing Required Attribute")
///     .with_code("CK-2-2")
///     .problem("Element <text> requires one of: variable, term, value, macro")
///     .add_hint("Add variable=\"...\" to the element?")
///     .build();
/// ```
#[derive(Debug)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    /// Start building an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(DiagnosticKind::Error, title),
        }
    }

    /// Start building a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(DiagnosticKind::Warning, title),
        }
    }

    /// Start building an info diagnostic.
    pub fn info(title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(DiagnosticKind::Info, title),
        }
    }

    /// Set the stable error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    /// Set the source location.
    pub fn with_location(mut self, location: Range) -> Self {
        self.message.location = Some(location);
        self
    }

    /// Set the quoted source excerpt.
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.message.excerpt = Some(excerpt.into());
        self
    }

    /// Set the problem statement.
    pub fn problem(mut self, problem: impl Into<MessageContent>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    /// Add an error-kind detail bullet.
    pub fn add_detail(mut self, content: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind: DetailKind::Error,
            content: content.into(),
            location: None,
        });
        self
    }

    /// Add an info-kind detail bullet.
    pub fn add_info(mut self, content: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind: DetailKind::Info,
            content: content.into(),
            location: None,
        });
        self
    }

    /// Add a fix hint.
    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.message.hints.push(hint.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> DiagnosticMessage {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assembles_fields() {
        let msg = DiagnosticMessageBuilder::error("Bad value")
            .with_code("CK-2-3")
            .problem("Invalid value 'x'")
            .add_detail("Expected a number")
            .add_hint("Use digits only?")
            .build();

        assert_eq!(msg.kind, DiagnosticKind::Error);
        assert_eq!(msg.code.as_deref(), Some("CK-2-3"));
        assert_eq!(msg.details.len(), 1);
        assert_eq!(msg.hints.len(), 1);
        assert!(msg.is_error());
    }

    #[test]
    fn test_warning_is_not_error() {
        let msg = DiagnosticMessageBuilder::warning("Unknown element").build();
        assert!(!msg.is_error());
    }
}
