//! Optimistic deletion and orphaned media

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::engine::{CatalogEngine, Inner};
use super::events::CatalogEvent;
use super::outcome::Optimistic;
use super::state::Orphan;
use crate::error::{CatalogError, Result};
use crate::ids::{EntityId, MutationId};
use crate::model::{DurableRef, Entity, MediaRef};
use crate::remote::RemoteClient;
use crate::storage::{CacheStore, CatalogTypes, PendingMutation, PendingOp};

/// How a delete ended remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The id was unknown; nothing happened
    Absent,
    /// The entity never reached the remote; only local data was removed
    LocalOnly,
    Deleted,
    /// The row is gone but its media object is still stored
    DeletedWithOrphan(DurableRef),
}

impl<S: CatalogTypes> CatalogEngine<S> {
    /// Remove an entity now and delete its row and media in the background.
    ///
    /// Deleting an unknown id succeeds without doing anything. Only the
    /// owner may delete; the check happens before anything is removed.
    pub async fn delete_entity(
        &self,
        id: &EntityId,
    ) -> Result<Optimistic<Option<Entity>, DeleteOutcome>> {
        let inner = &self.inner;
        inner.hydrate().await?;
        let principal = inner.remote.current_principal().await;
        let policy = inner.config.ownership;

        let removed = inner.with_state(|s| -> Result<Option<(Entity, EntityId)>> {
            let Some(entity) = s.get(id) else {
                return Ok(None);
            };
            principal.authorize(entity.owner.as_ref(), policy)?;
            let lane = s.lane_of(id);
            let entity = s.remove(id);
            s.deleting.insert(lane.clone());
            Ok(entity.map(|e| (e, lane)))
        })?;
        let Some((entity, lane)) = removed else {
            debug!(entity_id = %id, "delete of unknown entity ignored");
            return Ok(Optimistic::settled(None, Ok(DeleteOutcome::Absent)));
        };

        let mutation = PendingMutation::new(
            lane.clone(),
            PendingOp::Delete {
                entity: entity.clone(),
            },
        );
        if let Err(err) = inner.persist_removal(&entity, &mutation).await {
            inner.with_state(|s| {
                s.deleting.remove(&lane);
                s.put(entity.clone());
            });
            return Err(err);
        }
        debug!(entity_id = %id, lane = %lane, "optimistic delete");
        inner.emit(CatalogEvent::Removed { id: id.clone() });

        let job = {
            let inner = Arc::clone(inner);
            let lane = lane.clone();
            let entity = entity.clone();
            let mutation = mutation.id.clone();
            async move { inner.run_delete(lane, entity, mutation).await }
        };
        let outcome = self.spawn_on_lane(&lane, job);
        Ok(Optimistic {
            value: Some(entity),
            outcome,
        })
    }

    /// Media objects left behind by deletes whose media removal failed
    pub fn orphans(&self) -> Vec<Orphan> {
        self.inner.with_state(|s| s.orphans.clone())
    }

    /// Try again to delete every orphaned media object. Returns how many
    /// were purged.
    pub async fn retry_orphans(&self) -> Result<usize> {
        let inner = &self.inner;
        let orphans = inner.with_state(|s| s.orphans.clone());
        let mut purged = 0;
        for orphan in orphans {
            match inner
                .call("delete_blob", inner.remote.delete_blob(&orphan.media))
                .await
            {
                Ok(()) => {
                    inner.with_state(|s| s.orphans.retain(|o| o.mutation != orphan.mutation));
                    inner.resolve(&orphan.mutation).await;
                    info!(entity_id = %orphan.entity_id, media = %orphan.media, "orphaned media purged");
                    inner.emit(CatalogEvent::OrphanPurged {
                        media: orphan.media,
                    });
                    purged += 1;
                }
                Err(err) => {
                    warn!(media = %orphan.media, error = %err, "orphaned media still not deleted");
                }
            }
        }
        Ok(purged)
    }
}

impl<S: CatalogTypes> Inner<S> {
    async fn persist_removal(&self, entity: &Entity, mutation: &PendingMutation) -> Result<()> {
        self.cache
            .enqueue_pending(mutation)
            .await
            .map_err(CatalogError::storage)?;
        if let Err(err) = self.cache.remove(&entity.id).await {
            self.resolve(&mutation.id).await;
            return Err(CatalogError::storage(err));
        }
        Ok(())
    }

    pub(crate) async fn run_delete(
        &self,
        lane: EntityId,
        entity: Entity,
        mutation: MutationId,
    ) -> Result<DeleteOutcome> {
        let (target, late_media) =
            self.with_state(|s| (s.current_id(&lane), s.late_media.remove(&lane)));
        let media = late_media.unwrap_or_else(|| entity.media.clone());

        if target.is_temporary() {
            self.with_state(|s| {
                s.deleting.remove(&lane);
                s.in_flight.remove(&lane);
                s.local_overlays.remove(&lane);
            });
            self.discard_local_blob(&media).await;
            self.resolve(&mutation).await;
            debug!(entity_id = %target, "deleted entity that never reached the remote");
            self.emit(CatalogEvent::DeleteCommitted { id: target });
            return Ok(DeleteOutcome::LocalOnly);
        }

        let table = self.config.table(entity.kind);
        if let Err(err) = self
            .call("delete_row", self.remote.delete_row(table, &target))
            .await
        {
            let restored = Entity {
                id: target.clone(),
                media,
                ..entity
            };
            self.with_state(|s| {
                s.deleting.remove(&lane);
                s.settle(&lane);
                s.put(restored.clone());
            });
            if let Err(cache_err) = self.cache.put(&restored).await {
                warn!(entity_id = %target, error = %cache_err, "could not re-cache restored entity");
            }
            self.resolve(&mutation).await;
            warn!(entity_id = %target, error = %err, "delete rejected, entity restored");
            self.emit(CatalogEvent::DeleteFailed {
                id: target,
                error: err.to_string(),
            });
            return Err(err);
        }

        self.with_state(|s| {
            s.deleting.remove(&lane);
            s.settle(&lane);
            s.in_flight.remove(&lane);
            s.local_overlays.remove(&lane);
        });
        let outcome = match &media {
            MediaRef::Stored(durable) => {
                match self.call("delete_blob", self.remote.delete_blob(durable)).await {
                    Ok(()) => DeleteOutcome::Deleted,
                    Err(err) => {
                        self.record_orphan(&target, durable.clone(), &err).await;
                        DeleteOutcome::DeletedWithOrphan(durable.clone())
                    }
                }
            }
            MediaRef::Local { .. } => {
                self.discard_local_blob(&media).await;
                DeleteOutcome::Deleted
            }
            MediaRef::External { .. } => DeleteOutcome::Deleted,
        };
        self.resolve(&mutation).await;
        info!(entity_id = %target, "delete committed");
        self.emit(CatalogEvent::DeleteCommitted { id: target });
        Ok(outcome)
    }

    /// Remember a media object that outlived its row.
    pub(crate) async fn record_orphan(
        &self,
        entity_id: &EntityId,
        media: DurableRef,
        error: &CatalogError,
    ) {
        let mutation = PendingMutation::new(
            entity_id.clone(),
            PendingOp::PurgeMedia {
                entity_id: entity_id.clone(),
                media: media.clone(),
            },
        );
        if let Err(err) = self.cache.enqueue_pending(&mutation).await {
            warn!(media = %media, error = %err, "could not log orphaned media");
        }
        self.with_state(|s| {
            s.orphans.push(Orphan {
                mutation: mutation.id.clone(),
                entity_id: entity_id.clone(),
                media: media.clone(),
            })
        });
        warn!(entity_id = %entity_id, media = %media, error = %error, "media orphaned");
        self.emit(CatalogEvent::MediaOrphaned {
            id: entity_id.clone(),
            media,
        });
    }
}
