//! Citation rendering driver.
//!
//! This crate orchestrates everything between a parsed citation style and
//! rendered cluster text:
//!
//! - analyze which locale/module resources a style needs before any
//!   rendering can happen ([`analyzer`]),
//! - drive one concurrent batch fetch of those resources through a
//!   host-supplied [`LocaleFetcher`] capability ([`fetch`]),
//! - maintain editable stores of references ([`reference`]) and citation
//!   clusters ([`cluster`]),
//! - render synchronously with per-cluster change tracking ([`render`]).
//!
//! Processing is single-threaded and synchronous; the fetch batch is the
//! only asynchronous boundary, initiated and awaited entirely by the
//! caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use cslkit_driver::{Driver, InitOptions, OutputFormat};
//! use std::sync::Arc;
//!
//! let driver = Driver::new(InitOptions {
//!     style: style_xml,
//!     fetcher: Arc::new(my_fetcher),
//!     format: OutputFormat::Plain,
//! })?;
//!
//! driver.insert_references(refs);
//! driver.init_clusters(clusters)?;
//! driver.fetch_all()?.await;
//! let text = driver.built_cluster("cluster-1")?;
//! ```

pub mod analyzer;
pub mod cluster;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod locales;
pub mod output;
pub mod reference;
pub mod render;

pub use cluster::{Cite, Cluster, ClusterPosition, Locator, NoteNumber};
pub use driver::{Driver, InitOptions};
pub use error::{DriverError, FetchError, Result};
pub use fetch::{FetchOutcome, LocaleFetcher, ResourceId};
pub use output::OutputFormat;
pub use reference::{Name, Reference};
pub use render::RenderedDocument;

// The language type appears throughout the fetch API.
pub use cslkit_csl::Lang;
