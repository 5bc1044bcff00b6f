//! Core diagnostic message types.

use cslkit_source_map::Range;
use serde::{Deserialize, Serialize};

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// An error that prevents the input from being used
    Error,
    /// A problem that does not prevent use but should be fixed
    Warning,
    /// Informational message
    Info,
    /// A note providing additional context
    Note,
}

/// How detail items should be presented (tidyverse x/i bullet style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    /// Error detail (✖ bullet)
    Error,
    /// Info detail (ℹ bullet)
    Info,
    /// Note detail (plain bullet)
    Note,
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text content
    Plain(String),
    /// Markdown content
    Markdown(String),
}

impl MessageContent {
    /// Get the raw string content for display.
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) => s,
            MessageContent::Markdown(s) => s,
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Plain(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Plain(s.to_string())
    }
}

/// A detail item in a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    /// The kind of detail (error, info, note)
    pub kind: DetailKind,
    /// The content of the detail
    pub content: MessageContent,
    /// Optional source location for this detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Range>,
}

/// A diagnostic message produced by a parser or validator.
///
/// Structure:
/// 1. **Code**: stable `CK-<subsystem>-<number>` code for searchability
/// 2. **Title**: brief message
/// 3. **Kind**: Error, Warning, Info, Note
/// 4. **Problem**: what went wrong
/// 5. **Details**: specific information (bulleted)
/// 6. **Hints**: optional guidance for fixing
/// 7. **Location / excerpt**: where in the source, and the offending line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Optional error code (e.g., "CK-2-1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Brief title for the diagnostic
    pub title: String,

    /// The kind of diagnostic
    pub kind: DiagnosticKind,

    /// The problem statement
    pub problem: Option<MessageContent>,

    /// Specific details (bulleted)
    pub details: Vec<DetailItem>,

    /// Optional hints for fixing
    pub hints: Vec<MessageContent>,

    /// Source location for this diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Range>,

    /// The source line at `location`, quoted verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl DiagnosticMessage {
    /// Create a new diagnostic message with just a title and kind.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
            excerpt: None,
        }
    }

    /// Whether this diagnostic has error severity.
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// Render this diagnostic as text following tidyverse style.
    ///
    /// Format:
    /// ```text
    /// Error: title (CK-2-1) at 3:14
    /// Problem statement here
    /// > offending source line
    /// ✖ Error detail
    /// ℹ Info detail
    /// ? Hint
    /// ```
    pub fn to_text(&self) -> String {
        use std::fmt::Write;

        let mut result = String::new();

        let kind_str = match self.kind {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
            DiagnosticKind::Note => "Note",
        };
        write!(result, "{}: {}", kind_str, self.title).unwrap();
        if let Some(code) = &self.code {
            write!(result, " ({})", code).unwrap();
        }
        if let Some(loc) = &self.location {
            // 1-indexed for humans
            write!(result, " at {}:{}", loc.start.row + 1, loc.start.column + 1).unwrap();
        }
        result.push('\n');

        if let Some(problem) = &self.problem {
            writeln!(result, "{}", problem.as_str()).unwrap();
        }

        if let Some(excerpt) = &self.excerpt {
            writeln!(result, "> {}", excerpt).unwrap();
        }

        for detail in &self.details {
            let bullet = match detail.kind {
                DetailKind::Error => "✖",
                DetailKind::Info => "ℹ",
                DetailKind::Note => "•",
            };
            writeln!(result, "{} {}", bullet, detail.content.as_str()).unwrap();
        }

        for hint in &self.hints {
            writeln!(result, "? {}", hint.as_str()).unwrap();
        }

        result
    }
}
