//! SQLite implementation of CacheStore

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::atomic::Ordering;

use super::SqliteCacheStore;
use crate::error::QuotaExceeded;
use crate::ids::{EntityId, MutationId};
use crate::model::Entity;
use crate::storage::traits::CacheStore;
use crate::storage::types::{CacheFilter, CacheUsage, PendingMutation};

/// Initialize cache schema (entities and pending_mutations tables)
pub(crate) fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Cached entities, stored whole as JSON
        CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            category TEXT NOT NULL,
            created_at TEXT NOT NULL,
            body TEXT NOT NULL,
            last_access INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entities_created ON entities(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_entities_access ON entities(last_access);

        -- Mutations not yet acknowledged by the remote, in enqueue order
        CREATE TABLE IF NOT EXISTS pending_mutations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            lane TEXT NOT NULL,
            op TEXT NOT NULL,
            body TEXT NOT NULL,
            enqueued_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn load_pending(conn: &Connection) -> Result<Vec<PendingMutation>> {
    let mut stmt = conn.prepare("SELECT body FROM pending_mutations ORDER BY seq")?;
    let bodies = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    bodies
        .iter()
        .map(|body| Ok(serde_json::from_str(body)?))
        .collect()
}

// ============================================================================
// CacheStore Implementation
// ============================================================================

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, id: &EntityId) -> Result<Option<Entity>> {
        let conn = self.conn().lock().unwrap();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM entities WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(None);
        };
        conn.execute(
            "UPDATE entities SET last_access = ?1 WHERE id = ?2",
            params![self.tick(), id],
        )?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn list(&self, filter: &CacheFilter) -> Result<Vec<Entity>> {
        let conn = self.conn().lock().unwrap();
        let mut stmt = conn.prepare("SELECT body FROM entities ORDER BY created_at DESC")?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut entities = Vec::with_capacity(bodies.len());
        for body in bodies {
            let entity: Entity = serde_json::from_str(&body)?;
            if filter.matches(&entity) {
                entities.push(entity);
            }
        }
        // RFC 3339 strings with mixed offsets do not sort lexically
        entities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entities)
    }

    async fn put(&self, entity: &Entity) -> Result<()> {
        let body = serde_json::to_string(entity)?;
        let size = body.len() as u64;

        let mut conn = self.conn().lock().unwrap();
        let tx = conn.transaction()?;

        if let Some(quota) = self.quota {
            let used: i64 = tx.query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(body AS BLOB))), 0) FROM entities WHERE id != ?1",
                params![&entity.id],
                |row| row.get(0),
            )?;
            let used = used.max(0) as u64;
            if used + size > quota {
                return Err(QuotaExceeded {
                    needed: size,
                    available: quota.saturating_sub(used),
                }
                .into());
            }
        }

        tx.execute(
            "INSERT INTO entities (id, kind, category, created_at, body, last_access)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                category = excluded.category,
                created_at = excluded.created_at,
                body = excluded.body,
                last_access = excluded.last_access",
            params![
                &entity.id,
                entity.kind.as_str(),
                entity.category.slug(),
                entity.created_at.to_rfc3339(),
                body,
                self.tick(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, id: &EntityId) -> Result<bool> {
        let conn = self.conn().lock().unwrap();
        let removed = conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    async fn enqueue_pending(&self, mutation: &PendingMutation) -> Result<()> {
        let body = serde_json::to_string(mutation)?;
        let conn = self.conn().lock().unwrap();
        conn.execute(
            "INSERT INTO pending_mutations (id, lane, op, body, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &mutation.id,
                &mutation.lane,
                mutation.op.name(),
                body,
                mutation.enqueued_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn drain_pending(&self) -> Result<Vec<PendingMutation>> {
        let mut conn = self.conn().lock().unwrap();
        let tx = conn.transaction()?;
        let drained = load_pending(&tx)?;
        tx.execute("DELETE FROM pending_mutations", [])?;
        tx.commit()?;
        Ok(drained)
    }

    async fn resolve_pending(&self, id: &MutationId) -> Result<bool> {
        let conn = self.conn().lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM pending_mutations WHERE id = ?1",
            params![id],
        )?;
        Ok(removed > 0)
    }

    async fn pending(&self) -> Result<Vec<PendingMutation>> {
        let conn = self.conn().lock().unwrap();
        load_pending(&conn)
    }

    async fn evict_lru(&self, count: usize) -> Result<Vec<EntityId>> {
        let mut conn = self.conn().lock().unwrap();
        let tx = conn.transaction()?;

        let pending = load_pending(&tx)?;
        let protected: HashSet<&EntityId> = pending.iter().filter_map(|m| m.protects()).collect();

        let candidates = {
            let mut stmt = tx.prepare("SELECT id FROM entities ORDER BY last_access ASC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, EntityId>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };

        let mut evicted = Vec::new();
        for id in candidates {
            if evicted.len() == count {
                break;
            }
            if protected.contains(&id) {
                continue;
            }
            tx.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
            evicted.push(id);
        }
        tx.commit()?;
        Ok(evicted)
    }

    async fn usage(&self) -> Result<CacheUsage> {
        let conn = self.conn().lock().unwrap();
        let (entities, bytes): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(body AS BLOB))), 0) FROM entities",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let pending: i64 =
            conn.query_row("SELECT COUNT(*) FROM pending_mutations", [], |row| row.get(0))?;
        Ok(CacheUsage {
            entities: entities.max(0) as usize,
            bytes: bytes.max(0) as u64,
            quota: self.quota,
            pending: pending.max(0) as usize,
        })
    }
}

impl SqliteCacheStore {
    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, EntityDraft, FieldPatch, MediaRef, PhotoCategory};
    use crate::storage::types::PendingOp;
    use chrono::Utc;

    fn entity(id: &str) -> Entity {
        Entity::from_draft(
            EntityId::from_string(id),
            &EntityDraft::photo(format!("photo {id}"), Category::Photo(PhotoCategory::Aviation))
                .with_tags(["planes"]),
            MediaRef::external(format!("https://cdn.example.com/{id}.jpg")),
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let cache = SqliteCacheStore::in_memory().unwrap();
        let e = entity("7");
        cache.put(&e).await.unwrap();
        assert_eq!(cache.get(&e.id).await.unwrap(), Some(e.clone()));
        assert!(cache.remove(&e.id).await.unwrap());
        assert_eq!(cache.get(&e.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ids_bind_and_read_as_text() {
        let cache = SqliteCacheStore::in_memory().unwrap();
        let e = entity("tmp-3f2a");
        cache.put(&e).await.unwrap();

        let conn = cache.conn().lock().unwrap();
        let (typed, raw, column): (EntityId, String, String) = conn
            .query_row(
                "SELECT id, id, typeof(id) FROM entities WHERE id = ?1",
                params![&e.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(typed, e.id);
        assert_eq!(raw, "tmp-3f2a");
        assert_eq!(column, "text");
    }

    #[tokio::test]
    async fn test_pending_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        let mutation = PendingMutation::new(
            EntityId::from_string("7"),
            PendingOp::Update {
                entity_id: EntityId::from_string("7"),
                patch: FieldPatch::title("Runway"),
                previous: FieldPatch::title("Taxiway"),
            },
        );
        {
            let cache = SqliteCacheStore::open(&path).unwrap();
            cache.put(&entity("7")).await.unwrap();
            cache.enqueue_pending(&mutation).await.unwrap();
        }

        let reopened = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(reopened.pending().await.unwrap(), vec![mutation.clone()]);
        assert_eq!(reopened.drain_pending().await.unwrap(), vec![mutation]);
        assert!(reopened.pending().await.unwrap().is_empty());
        assert_eq!(reopened.usage().await.unwrap().entities, 1);
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_typed() {
        let cache = SqliteCacheStore::in_memory().unwrap().with_quota(64);
        let err = cache.put(&entity("1")).await.unwrap_err();
        assert!(err.downcast_ref::<QuotaExceeded>().is_some());
        assert_eq!(cache.usage().await.unwrap().entities, 0);
    }

    #[tokio::test]
    async fn test_evict_lru_protects_pending() {
        let cache = SqliteCacheStore::in_memory().unwrap();
        let a = entity("a");
        let b = entity("b");
        cache.put(&a).await.unwrap();
        cache.put(&b).await.unwrap();
        cache
            .enqueue_pending(&PendingMutation::new(
                a.id.clone(),
                PendingOp::Update {
                    entity_id: a.id.clone(),
                    patch: FieldPatch::title("x"),
                    previous: FieldPatch::title("y"),
                },
            ))
            .await
            .unwrap();

        assert_eq!(cache.evict_lru(5).await.unwrap(), vec![b.id.clone()]);
        assert!(cache.get(&a.id).await.unwrap().is_some());
    }
}
