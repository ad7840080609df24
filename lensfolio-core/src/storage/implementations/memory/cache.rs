//! In-memory CacheStore implementation

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::QuotaExceeded;
use crate::ids::{EntityId, MutationId};
use crate::model::Entity;
use crate::storage::traits::CacheStore;
use crate::storage::types::{CacheFilter, CacheUsage, PendingMutation};

#[derive(Debug)]
struct CachedEntry {
    entity: Entity,
    size: u64,
    last_access: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<EntityId, CachedEntry>,
    pending: Vec<PendingMutation>,
    clock: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}

/// In-memory cache for tests, with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    quota: Option<u64>,
    inner: Mutex<CacheInner>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Bytes an entity occupies, measured as its serialized form.
    pub fn footprint(entity: &Entity) -> Result<u64> {
        Ok(serde_json::to_vec(entity)?.len() as u64)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, id: &EntityId) -> Result<Option<Entity>> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.tick();
        Ok(inner.entries.get_mut(id).map(|entry| {
            entry.last_access = now;
            entry.entity.clone()
        }))
    }

    async fn list(&self, filter: &CacheFilter) -> Result<Vec<Entity>> {
        let inner = self.inner.lock().unwrap();
        let mut entities: Vec<Entity> = inner
            .entries
            .values()
            .filter(|e| filter.matches(&e.entity))
            .map(|e| e.entity.clone())
            .collect();
        entities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entities)
    }

    async fn put(&self, entity: &Entity) -> Result<()> {
        let size = Self::footprint(entity)?;
        let mut inner = self.inner.lock().unwrap();

        if let Some(quota) = self.quota {
            let replaced = inner.entries.get(&entity.id).map(|e| e.size).unwrap_or(0);
            let used = inner.bytes() - replaced;
            if used + size > quota {
                return Err(QuotaExceeded {
                    needed: size,
                    available: quota.saturating_sub(used),
                }
                .into());
            }
        }

        let now = inner.tick();
        inner.entries.insert(
            entity.id.clone(),
            CachedEntry {
                entity: entity.clone(),
                size,
                last_access: now,
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &EntityId) -> Result<bool> {
        Ok(self.inner.lock().unwrap().entries.remove(id).is_some())
    }

    async fn enqueue_pending(&self, mutation: &PendingMutation) -> Result<()> {
        self.inner.lock().unwrap().pending.push(mutation.clone());
        Ok(())
    }

    async fn drain_pending(&self) -> Result<Vec<PendingMutation>> {
        Ok(std::mem::take(&mut self.inner.lock().unwrap().pending))
    }

    async fn resolve_pending(&self, id: &MutationId) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.pending.len();
        inner.pending.retain(|m| &m.id != id);
        Ok(inner.pending.len() != before)
    }

    async fn pending(&self) -> Result<Vec<PendingMutation>> {
        Ok(self.inner.lock().unwrap().pending.clone())
    }

    async fn evict_lru(&self, count: usize) -> Result<Vec<EntityId>> {
        let mut inner = self.inner.lock().unwrap();
        let protected: HashSet<&EntityId> =
            inner.pending.iter().filter_map(|m| m.protects()).collect();

        let mut candidates: Vec<(u64, EntityId)> = inner
            .entries
            .iter()
            .filter(|(id, _)| !protected.contains(id))
            .map(|(id, e)| (e.last_access, id.clone()))
            .collect();
        candidates.sort();

        let evicted: Vec<EntityId> = candidates.into_iter().take(count).map(|(_, id)| id).collect();
        for id in &evicted {
            inner.entries.remove(id);
        }
        Ok(evicted)
    }

    async fn usage(&self) -> Result<CacheUsage> {
        let inner = self.inner.lock().unwrap();
        Ok(CacheUsage {
            entities: inner.entries.len(),
            bytes: inner.bytes(),
            quota: self.quota,
            pending: inner.pending.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, EntityDraft, MediaRef, PhotoCategory};
    use crate::storage::types::PendingOp;
    use chrono::{Duration, Utc};

    fn entity(id: &str, age_minutes: i64) -> Entity {
        Entity::from_draft(
            EntityId::from_string(id),
            &EntityDraft::photo(format!("photo {id}"), Category::Photo(PhotoCategory::Urban)),
            MediaRef::external(format!("https://cdn.example.com/{id}.jpg")),
            None,
            Utc::now() - Duration::minutes(age_minutes),
        )
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let cache = MemoryCacheStore::new();
        cache.put(&entity("old", 10)).await.unwrap();
        cache.put(&entity("new", 1)).await.unwrap();

        let ids: Vec<_> = cache
            .list(&CacheFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id.into_string())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_quota_rejects_without_dropping() {
        let first = entity("1", 0);
        let quota = MemoryCacheStore::footprint(&first).unwrap() + 5;
        let cache = MemoryCacheStore::with_quota(quota);

        cache.put(&first).await.unwrap();
        let err = cache.put(&entity("2", 0)).await.unwrap_err();
        assert!(err.downcast_ref::<QuotaExceeded>().is_some());

        // Nothing already cached was sacrificed
        assert!(cache.get(&first.id).await.unwrap().is_some());
        assert_eq!(cache.usage().await.unwrap().entities, 1);
    }

    #[tokio::test]
    async fn test_overwrite_counts_once_against_quota() {
        let mut e = entity("1", 0);
        let quota = MemoryCacheStore::footprint(&e).unwrap() + 2;
        let cache = MemoryCacheStore::with_quota(quota);
        cache.put(&e).await.unwrap();
        e.likes = 7;
        cache.put(&e).await.unwrap();
    }

    #[tokio::test]
    async fn test_lru_skips_entities_with_pending_work() {
        let cache = MemoryCacheStore::new();
        let a = entity("a", 3);
        let b = entity("b", 2);
        let c = entity("c", 1);
        for e in [&a, &b, &c] {
            cache.put(e).await.unwrap();
        }
        cache
            .enqueue_pending(&PendingMutation::new(
                a.id.clone(),
                PendingOp::Create {
                    entity: a.clone(),
                    file_name: None,
                },
            ))
            .await
            .unwrap();
        // Touch b so c becomes the least recently used unprotected entry
        cache.get(&b.id).await.unwrap();

        let evicted = cache.evict_lru(1).await.unwrap();
        assert_eq!(evicted, vec![c.id.clone()]);
        assert!(cache.get(&a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pending_log_resolve_and_drain() {
        let cache = MemoryCacheStore::new();
        let first = PendingMutation::new(
            EntityId::from_string("1"),
            PendingOp::Delete {
                entity: entity("1", 0),
            },
        );
        let second = PendingMutation::new(
            EntityId::from_string("2"),
            PendingOp::Delete {
                entity: entity("2", 0),
            },
        );
        cache.enqueue_pending(&first).await.unwrap();
        cache.enqueue_pending(&second).await.unwrap();

        assert!(cache.resolve_pending(&first.id).await.unwrap());
        assert!(!cache.resolve_pending(&first.id).await.unwrap());

        let drained = cache.drain_pending().await.unwrap();
        assert_eq!(drained, vec![second]);
        assert!(cache.pending().await.unwrap().is_empty());
    }
}
