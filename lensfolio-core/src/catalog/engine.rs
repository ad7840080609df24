//! CatalogEngine - optimistic catalog over a local cache and a remote service
//!
//! Every operation runs in two phases:
//! - an optimistic phase that validates, updates memory and the local cache,
//!   logs a pending mutation and emits an event, all before returning
//! - a reconciliation job on the entity's lane that talks to the remote and
//!   either confirms or rolls back exactly what the optimistic phase did
//!
//! The state mutex is never held across an await.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::events::{CatalogEvent, RefreshReport};
use super::lanes::Lanes;
use super::outcome::{Optimistic, Pending};
use super::state::{CatalogState, MergeScope};
use crate::error::{CatalogError, Result, ValidationError};
use crate::ids::{EntityId, MutationId};
use crate::model::{Category, Entity, MediaRef};
use crate::normalize::Normalizer;
use crate::remote::{RemoteClient, RemoteError, RowFilter, RowOrder};
use crate::storage::{BlobStore, CacheFilter, CacheStore, CatalogTypes};
use crate::views::{self, Lightbox, Paginator, ViewFilter};

const EVENT_CAPACITY: usize = 256;

pub struct CatalogEngine<S: CatalogTypes> {
    pub(crate) inner: Arc<Inner<S>>,
}

impl<S: CatalogTypes> Clone for CatalogEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct Inner<S: CatalogTypes> {
    pub remote: Arc<S::Remote>,
    pub cache: Arc<S::Cache>,
    pub blobs: Arc<S::Blob>,
    pub config: EngineConfig,
    pub normalizer: Normalizer,
    state: Mutex<CatalogState>,
    pub lanes: Lanes,
    events: broadcast::Sender<CatalogEvent>,
}

impl<S: CatalogTypes> CatalogEngine<S> {
    pub fn new(
        remote: Arc<S::Remote>,
        cache: Arc<S::Cache>,
        blobs: Arc<S::Blob>,
        config: EngineConfig,
    ) -> Self {
        let normalizer = Normalizer::new(config.photo_bucket.clone())
            .with_placeholder(config.media_placeholder.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                remote,
                cache,
                blobs,
                config,
                normalizer,
                state: Mutex::new(CatalogState::default()),
                lanes: Lanes::default(),
                events,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn remote(&self) -> &Arc<S::Remote> {
        &self.inner.remote
    }

    pub fn cache(&self) -> &Arc<S::Cache> {
        &self.inner.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.inner.events.subscribe()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get(&self, id: &EntityId) -> Option<Entity> {
        self.inner.with_state(|s| s.get(id).cloned())
    }

    /// Every entity in memory, newest first
    pub fn snapshot(&self) -> Vec<Entity> {
        self.inner.with_state(|s| s.entities().to_vec())
    }

    pub fn filter_view(&self, filter: &ViewFilter) -> Vec<Entity> {
        self.inner
            .with_state(|s| views::filter_entities(s.entities(), filter))
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.inner.with_state(|s| views::all_tags(s.entities()))
    }

    /// Pages over the current snapshot, newest first.
    ///
    /// Demo filler is appended only when synthetic pagination is enabled and
    /// the last full refresh found the remote empty (or none has run yet).
    pub fn paginate(&self, page_size: usize) -> Result<Paginator> {
        if page_size == 0 {
            return Err(ValidationError::new("page_size", "must be positive").into());
        }
        let (entities, remote_has_data) = self
            .inner
            .with_state(|s| (s.entities().to_vec(), s.remote_has_data));
        let config = &self.inner.config;
        let cap = (config.synthetic_pagination && remote_has_data != Some(true))
            .then_some(config.synthetic_cap);
        Ok(Paginator::new(entities, page_size, cap))
    }

    /// Lightbox over `filter`'s view, opened at `start`
    pub fn lightbox(&self, filter: &ViewFilter, start: &EntityId) -> Option<Lightbox> {
        let ids = self
            .filter_view(filter)
            .into_iter()
            .map(|e| e.id)
            .collect();
        Lightbox::new(ids, start)
    }

    /// Public URL for an entity's media, if it has one the remote can serve.
    pub fn media_url(&self, entity: &Entity) -> Option<String> {
        match &entity.media {
            MediaRef::Stored(durable) => Some(self.inner.remote.public_url(durable)),
            MediaRef::External { url, .. } => Some(url.clone()),
            MediaRef::Local { .. } => None,
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Current view of `category` (or everything), refreshed in the background.
    pub async fn load_catalog(
        &self,
        category: Option<Category>,
    ) -> Result<Optimistic<Vec<Entity>, RefreshReport>> {
        self.inner.hydrate().await?;
        let view = self.inner.with_state(|s| s.view(category.as_ref()));
        debug!(count = view.len(), "serving catalog view");

        let inner = Arc::clone(&self.inner);
        let outcome = Pending::spawn(async move { inner.refresh(category).await });
        Ok(Optimistic {
            value: view,
            outcome,
        })
    }

    /// Run `job` after every earlier job on `lane`.
    pub(crate) fn spawn_on_lane<T, F>(&self, lane: &EntityId, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut ticket = self.inner.lanes.enter(lane);
        let inner = Arc::clone(&self.inner);
        Pending::spawn(async move {
            ticket.wait_turn().await;
            let result = job.await;
            inner.lanes.leave(ticket);
            result
        })
    }
}

impl<S: CatalogTypes> Inner<S> {
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut CatalogState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn emit(&self, event: CatalogEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Bound a remote request by the configured timeout.
    pub(crate) async fn call<T>(
        &self,
        op: &'static str,
        request: impl Future<Output = std::result::Result<T, RemoteError>>,
    ) -> Result<T> {
        match timeout(self.config.remote_timeout, request).await {
            Ok(result) => result.map_err(|e| CatalogError::from_remote(op, e)),
            Err(_) => {
                warn!(op, after = ?self.config.remote_timeout, "remote call timed out");
                Err(CatalogError::Timeout {
                    op,
                    after: self.config.remote_timeout,
                })
            }
        }
    }

    /// Load the cache into memory on first use.
    pub(crate) async fn hydrate(&self) -> Result<()> {
        if self.with_state(|s| s.hydrated) {
            return Ok(());
        }
        let cached = self
            .cache
            .list(&CacheFilter::all())
            .await
            .map_err(CatalogError::storage)?;
        let added = self.with_state(|s| {
            if s.hydrated {
                return 0;
            }
            s.hydrated = true;
            s.absorb(cached)
        });
        debug!(added, "hydrated catalog from cache");
        Ok(())
    }

    /// Pull every table in scope and merge it into memory and the cache.
    pub(crate) async fn refresh(&self, category: Option<Category>) -> Result<RefreshReport> {
        let since = self.with_state(|s| s.epoch());
        let scope = MergeScope { category, since };
        let mut report = RefreshReport::default();
        let mut fetched = Vec::new();

        // Categories are filtered locally so legacy slugs still match
        for kind in scope.kinds() {
            let rows = self
                .call(
                    "query_rows",
                    self.remote.query_rows(
                        self.config.table(kind),
                        &RowFilter::all(),
                        &RowOrder::newest_first(),
                    ),
                )
                .await?;
            let batch = self.normalizer.normalize_batch(Some(kind), rows);
            report.quarantined += batch.quarantined.len();
            fetched.extend(batch.entities);
        }
        report.fetched = fetched.len();

        let full_scope = scope.category.is_none();
        let merged = self.with_state(|s| {
            let merged = s.merge_remote(fetched, &scope);
            let has_data = report.fetched > 0 || merged.held > 0;
            if full_scope || has_data {
                s.remote_has_data = Some(has_data);
            }
            merged
        });

        for entity in &merged.upserted {
            if let Err(err) = self.cache.put(entity).await {
                warn!(entity_id = %entity.id, error = %err, "could not cache refreshed entity");
                report.cache_failures += 1;
            }
        }
        for id in &merged.removed {
            if let Err(err) = self.cache.remove(id).await {
                warn!(entity_id = %id, error = %err, "could not evict vanished entity");
            }
        }
        report.upserted = merged.upserted.len();
        report.removed = merged.removed.len();

        info!(
            fetched = report.fetched,
            quarantined = report.quarantined,
            upserted = report.upserted,
            removed = report.removed,
            "catalog refreshed"
        );
        self.emit(CatalogEvent::Refreshed(report));
        Ok(report)
    }

    /// Best-effort removal of an optimistic preview blob.
    pub(crate) async fn discard_local_blob(&self, media: &MediaRef) {
        let Some(hash) = media.local_hash() else {
            return;
        };
        if let Err(err) = self.blobs.delete(hash).await {
            warn!(blob = %hash, error = %err, "could not delete local media blob");
        }
    }

    pub(crate) async fn resolve(&self, mutation: &MutationId) {
        if let Err(err) = self.cache.resolve_pending(mutation).await {
            warn!(mutation = %mutation, error = %err, "could not clear pending mutation");
        }
    }
}
