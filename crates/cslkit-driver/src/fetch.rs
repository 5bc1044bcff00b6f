//! The host fetch capability and batch fetch outcomes.
//!
//! The driver never reaches out to the network or filesystem itself; the
//! host supplies a [`LocaleFetcher`] capability at construction. The
//! capability is an explicitly passed value, not ambient state, so one
//! driver build runs against any host. The only asynchronous boundary in
//! the driver's lifecycle is the fetch batch built on this trait.

use crate::error::FetchError;
use async_trait::async_trait;
use cslkit_csl::Lang;
use std::fmt;

/// Identity of a fetchable resource: kind plus tag or name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceId {
    /// A locale file for a language tag.
    Locale(Lang),
    /// A style module by name.
    Module(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Locale(lang) => write!(f, "locale:{}", lang),
            ResourceId::Module(name) => write!(f, "module:{}", name),
        }
    }
}

/// Host-supplied asynchronous fetch capability.
///
/// `Ok(None)` means the host has no data for the resource; it is recorded
/// as a failure and the locale fallback chain covers the gap at render
/// time. The driver imposes no timeout of its own; bounding latency is the
/// host's responsibility, and an externally cancelled fetch should
/// surface here as an `Err`.
#[async_trait(?Send)]
pub trait LocaleFetcher {
    /// Fetch locale XML for a language tag.
    async fn fetch_locale(&self, lang: &Lang) -> Result<Option<String>, FetchError>;

    /// Fetch a style module by name. Hosts without module support can
    /// keep the default, which reports every module as unavailable.
    async fn fetch_module(&self, _name: &str) -> Result<Option<String>, FetchError> {
        Ok(None)
    }
}

/// Result of one fetch batch.
///
/// Failures are data, not errors: the batch always runs to completion and
/// the caller decides what a partial outcome means.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Resources fetched and cached by this batch.
    pub fetched: Vec<ResourceId>,
    /// Resources that failed, with the reason.
    pub failures: Vec<(ResourceId, FetchError)>,
}

impl FetchOutcome {
    /// Whether every requested resource was fetched.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_display() {
        let lang: Lang = "fr-FR".parse().unwrap();
        assert_eq!(ResourceId::Locale(lang).to_string(), "locale:fr-FR");
        assert_eq!(
            ResourceId::Module("base-style".to_string()).to_string(),
            "module:base-style"
        );
    }
}
