//! The driver: orchestration of validation, dependency analysis, batch
//! fetching, store mutation, and rendering.
//!
//! Everything except the fetch batch is synchronous. The driver uses
//! interior mutability so host-facing methods take `&self`, which keeps
//! reference and cluster mutation legal while a fetch batch is
//! outstanding. The driver is single-threaded and not `Send`.

use crate::analyzer::required_resources;
use crate::cluster::{Cluster, ClusterPosition, ClusterStore};
use crate::error::{DriverError, FetchError, Result};
use crate::fetch::{FetchOutcome, LocaleFetcher, ResourceId};
use crate::locales::LocaleCache;
use crate::output::OutputFormat;
use crate::reference::{Reference, ReferenceStore};
use crate::render::{self, RenderedDocument};
use cslkit_csl::{Style, validate_locale, validate_module, validate_style};
use futures::future::join_all;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options for constructing a [`Driver`].
pub struct InitOptions<'a> {
    /// Raw CSL style XML. Independent styles only.
    pub style: &'a str,
    /// Host capability used to fetch locales and modules.
    pub fetcher: Arc<dyn LocaleFetcher>,
    /// Output format for rendered text.
    pub format: OutputFormat,
}

/// The citation driver.
///
/// Construct one per style; the style is immutable for the driver's
/// lifetime, and a style change means constructing a new driver.
pub struct Driver {
    engine: RefCell<Engine>,
    fetcher: Arc<dyn LocaleFetcher>,
    fetch_in_flight: Cell<bool>,
}

/// The synchronous processing state behind the driver facade.
struct Engine {
    style: Style,
    format: OutputFormat,
    cache: LocaleCache,
    references: ReferenceStore,
    clusters: ClusterStore,
    last_render: Option<RenderedDocument>,
}

/// Clears the in-flight flag when the batch future completes or is
/// dropped mid-flight.
struct InFlightGuard<'a>(&'a Cell<bool>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Driver {
    /// Create a new driver from style XML.
    ///
    /// Fails with [`DriverError::InvalidStyle`] carrying the full
    /// diagnostic list when the style has any error-severity diagnostic.
    /// The locale cache starts seeded with bundled en-US core terms, so a
    /// driver can render English before (or without) any fetch.
    pub fn new(options: InitOptions<'_>) -> Result<Driver> {
        let outcome = validate_style(options.style);
        let has_errors = outcome.diagnostics.iter().any(|d| d.is_error());
        let style = match (outcome.style, has_errors) {
            (Some(style), false) => style,
            _ => {
                return Err(DriverError::InvalidStyle {
                    diagnostics: outcome.diagnostics,
                });
            }
        };

        let cache = LocaleCache::new(style.default_lang(), style.locales.clone());
        debug!(default_locale = %style.default_lang(), "driver constructed");

        Ok(Driver {
            engine: RefCell::new(Engine {
                style,
                format: options.format,
                cache,
                references: ReferenceStore::new(),
                clusters: ClusterStore::new(),
                last_render: None,
            }),
            fetcher: options.fetcher,
            fetch_in_flight: Cell::new(false),
        })
    }

    // ─── references ────────────────────────────────────────────────────

    /// Insert or overwrite references as a batch. References not in the
    /// batch are untouched.
    pub fn insert_references(&self, refs: Vec<Reference>) {
        self.engine.borrow_mut().references.insert_references(refs);
    }

    /// Completely overwrite the references library.
    pub fn reset_references(&self, refs: Vec<Reference>) {
        self.engine.borrow_mut().references.reset_references(refs);
    }

    /// Insert or overwrite a single reference.
    pub fn insert_reference(&self, reference: Reference) {
        self.engine.borrow_mut().references.insert_reference(reference);
    }

    /// Remove a reference by id. Cites pointing at it become dangling and
    /// render a placeholder.
    pub fn remove_reference(&self, id: &str) {
        self.engine.borrow_mut().references.remove_reference(id);
    }

    // ─── clusters ──────────────────────────────────────────────────────

    /// Replace all clusters; insertion order becomes document order.
    pub fn init_clusters(&self, clusters: Vec<Cluster>) -> Result<()> {
        self.engine.borrow_mut().clusters.init_clusters(clusters)
    }

    /// Insert a cluster before `before_id`, or append when absent or
    /// unresolved.
    pub fn insert_cluster(&self, cluster: Cluster, before_id: Option<&str>) -> Result<()> {
        self.engine
            .borrow_mut()
            .clusters
            .insert_cluster(cluster, before_id)
    }

    /// Remove a cluster by id; no-op when absent.
    pub fn remove_cluster(&self, id: &str) {
        self.engine.borrow_mut().clusters.remove_cluster(id);
    }

    /// Identity-preserving update of a cluster by id.
    pub fn replace_cluster(&self, cluster: Cluster) -> Result<()> {
        self.engine.borrow_mut().clusters.replace_cluster(cluster)
    }

    /// Assign explicit external note numbering (all-or-nothing).
    pub fn set_cluster_order(&self, positions: &[ClusterPosition]) -> Result<()> {
        self.engine.borrow_mut().clusters.set_cluster_order(positions)
    }

    /// A cluster id guaranteed not to collide with any stored cluster.
    pub fn random_cluster_id(&self) -> String {
        let engine = self.engine.borrow();
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if !engine.clusters.contains(&id) {
                return id;
            }
        }
    }

    // ─── fetching ──────────────────────────────────────────────────────

    /// The resources a render pass could need that are not yet cached.
    pub fn to_fetch(&self) -> Vec<ResourceId> {
        let engine = self.engine.borrow();
        required_resources(&engine.style, &engine.references.langs_in_use())
            .into_iter()
            .filter(|resource| !engine.cache.has_resource(resource))
            .collect()
    }

    /// Issue one concurrent batch fetch for every pending resource.
    ///
    /// Fails fast with [`DriverError::FetchInProgress`] when a batch is
    /// already in flight, without issuing requests. Individual resource
    /// failures never fail the batch; they are collected into the
    /// [`FetchOutcome`]. Successful locale payloads are validated and
    /// cached for the driver's lifetime.
    pub fn fetch_all(&self) -> Result<impl Future<Output = FetchOutcome> + '_> {
        if self.fetch_in_flight.replace(true) {
            debug!("fetch batch rejected: one already in flight");
            return Err(DriverError::FetchInProgress);
        }
        let guard = InFlightGuard(&self.fetch_in_flight);

        let pending = self.to_fetch();
        debug!(count = pending.len(), "issuing fetch batch");

        Ok(async move {
            let _guard = guard;

            if pending.is_empty() {
                return FetchOutcome::default();
            }

            let results = join_all(
                pending
                    .iter()
                    .map(|resource| fetch_resource(self.fetcher.as_ref(), resource)),
            )
            .await;

            let mut outcome = FetchOutcome::default();
            let mut engine = self.engine.borrow_mut();
            for (resource, result) in pending.into_iter().zip(results) {
                match result {
                    Ok(payload) => match store_payload(&mut engine.cache, &resource, payload) {
                        Ok(()) => outcome.fetched.push(resource),
                        Err(err) => {
                            warn!(%resource, %err, "fetched payload failed validation");
                            outcome.failures.push((resource, err));
                        }
                    },
                    Err(err) => {
                        warn!(%resource, %err, "resource fetch failed, fallback chain applies");
                        outcome.failures.push((resource, err));
                    }
                }
            }

            debug!(
                fetched = outcome.fetched.len(),
                failed = outcome.failures.len(),
                "fetch batch complete"
            );
            outcome
        })
    }

    // ─── rendering ─────────────────────────────────────────────────────

    /// Rendered text for one cluster.
    ///
    /// Fails with [`DriverError::UnknownCluster`] when the id is not in
    /// the document. Does not advance the change-tracking snapshot.
    pub fn built_cluster(&self, id: &str) -> Result<String> {
        let engine = self.engine.borrow();
        if !engine.clusters.contains(id) {
            return Err(DriverError::UnknownCluster(id.to_string()));
        }
        let (_, built) = render::build_document(
            &engine.style,
            &engine.cache,
            &engine.references,
            &engine.clusters,
            engine.format,
        );
        built
            .get(id)
            .cloned()
            .ok_or_else(|| DriverError::UnknownCluster(id.to_string()))
    }

    /// Full-document render snapshot with per-cluster touched flags.
    ///
    /// Touched flags compare against the immediately preceding call of
    /// this method; two renders with no intervening mutation leave every
    /// flag false on the second.
    pub fn render_document(&self) -> RenderedDocument {
        let mut engine = self.engine.borrow_mut();
        let engine = &mut *engine;
        let rendered = render::render_document(
            &engine.style,
            &engine.cache,
            &engine.references,
            &engine.clusters,
            engine.format,
            engine.last_render.as_ref(),
        );
        engine.last_render = Some(rendered.clone());
        rendered
    }
}

/// Fetch one resource through the host capability.
async fn fetch_resource(
    fetcher: &dyn LocaleFetcher,
    resource: &ResourceId,
) -> std::result::Result<String, FetchError> {
    let payload = match resource {
        ResourceId::Locale(lang) => fetcher.fetch_locale(lang).await?,
        ResourceId::Module(name) => fetcher.fetch_module(name).await?,
    };
    payload.ok_or(FetchError::Missing)
}

/// Validate and cache one fetched payload.
fn store_payload(
    cache: &mut LocaleCache,
    resource: &ResourceId,
    payload: String,
) -> std::result::Result<(), FetchError> {
    match resource {
        ResourceId::Locale(lang) => {
            let outcome = validate_locale(&payload);
            let usable = outcome.is_usable();
            match (outcome.locale, usable) {
                (Some(locale), true) => {
                    cache.store_locale(lang.clone(), locale);
                    Ok(())
                }
                _ => Err(FetchError::InvalidPayload(
                    outcome
                        .diagnostics
                        .first()
                        .map(|d| d.title.clone())
                        .unwrap_or_else(|| "unparseable locale".to_string()),
                )),
            }
        }
        ResourceId::Module(name) => {
            let outcome = validate_module(&payload);
            if outcome.meta.is_some() && !outcome.diagnostics.iter().any(|d| d.is_error()) {
                cache.store_module(name.clone(), payload);
                Ok(())
            } else {
                Err(FetchError::InvalidPayload(
                    outcome
                        .diagnostics
                        .first()
                        .map(|d| d.title.clone())
                        .unwrap_or_else(|| "unparseable module".to_string()),
                ))
            }
        }
    }
}
