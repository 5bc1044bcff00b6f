//! Error types for the citation driver.

use cslkit_diagnostics::DiagnosticMessage;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors surfaced to the host.
///
/// Only [`DriverError::InvalidStyle`] is fatal to the driver as a whole;
/// everything else rejects a single call and leaves state unchanged.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The style failed validation; the driver cannot be constructed.
    #[error("style validation failed with {} diagnostic(s)", .diagnostics.len())]
    InvalidStyle {
        /// Every diagnostic found, warnings included.
        diagnostics: Vec<DiagnosticMessage>,
    },

    /// A fetch batch is already in flight; no new requests were issued.
    #[error("a fetch batch is already in flight")]
    FetchInProgress,

    /// `set_cluster_order` was given note numbers that go backwards or
    /// repeat; the store was left unchanged.
    #[error("cluster note numbers out of order for: {}", .ids.join(", "))]
    NonMonotonicOrder {
        /// Ids of the offending order entries.
        ids: Vec<String>,
    },

    /// The named cluster is not in the document.
    #[error("unknown cluster '{0}'")]
    UnknownCluster(String),

    /// The output format string is not recognized.
    #[error("unknown output format '{0}'")]
    UnknownOutputFormat(String),
}

/// A failure fetching a single resource.
///
/// Fetch failures are never thrown: they are collected into the batch
/// outcome and rendering degrades through the locale fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The host capability reported a failure.
    #[error("host fetch failed: {0}")]
    Host(String),

    /// The host had no data for this resource.
    #[error("resource not available")]
    Missing,

    /// The fetched payload failed validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
