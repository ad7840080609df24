//! CacheStore trait: durable local copy of the catalog

use anyhow::Result;
use async_trait::async_trait;

use crate::ids::{EntityId, MutationId};
use crate::model::Entity;
use crate::storage::types::{CacheFilter, CacheUsage, PendingMutation};

/// Local entity cache plus the pending-mutation log.
///
/// Every write is atomic per entity. A write that would exceed the byte
/// budget fails with [`crate::QuotaExceeded`] wrapped in the returned error;
/// nothing is evicted implicitly.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, id: &EntityId) -> Result<Option<Entity>>;

    /// Matching entities, newest first
    async fn list(&self, filter: &CacheFilter) -> Result<Vec<Entity>>;

    async fn put(&self, entity: &Entity) -> Result<()>;

    /// Returns Ok(true) if removed, Ok(false) if it wasn't cached
    async fn remove(&self, id: &EntityId) -> Result<bool>;

    async fn enqueue_pending(&self, mutation: &PendingMutation) -> Result<()>;

    /// Return every logged mutation in enqueue order and clear the log
    async fn drain_pending(&self) -> Result<Vec<PendingMutation>>;

    /// Drop one acknowledged mutation
    async fn resolve_pending(&self, id: &MutationId) -> Result<bool>;

    /// Logged mutations in enqueue order, without clearing
    async fn pending(&self) -> Result<Vec<PendingMutation>>;

    /// Evict up to `count` least recently used entities that no pending
    /// mutation refers to. Returns the evicted ids.
    async fn evict_lru(&self, count: usize) -> Result<Vec<EntityId>>;

    async fn usage(&self) -> Result<CacheUsage>;
}
