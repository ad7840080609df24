//! Optimistic creation with deferred upload and insert

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::engine::{CatalogEngine, Inner};
use super::events::CatalogEvent;
use super::outcome::Optimistic;
use crate::error::{CatalogError, Result};
use crate::helper::now;
use crate::ids::{EntityId, MutationId};
use crate::model::{
    storage_path, upload_extension, DurableRef, Entity, EntityDraft, MediaRef, MediaSource,
    Principal, RetryableCreate,
};
use crate::normalize::insert_record;
use crate::remote::RemoteClient;
use crate::storage::{BlobStore, CacheStore, CatalogTypes, PendingMutation, PendingOp};

impl<S: CatalogTypes> CatalogEngine<S> {
    /// Add an entity under a temporary id, then upload and insert it.
    ///
    /// The returned entity is already visible in memory and in the cache.
    /// The outcome resolves to the confirmed entity, or to
    /// [`CatalogError::UploadFailed`] carrying the draft for a retry.
    pub async fn create_entity(
        &self,
        draft: EntityDraft,
        media: MediaSource,
    ) -> Result<Optimistic<Entity>> {
        draft.validate()?;
        media.validate(draft.kind)?;

        let inner = &self.inner;
        let owner = match inner.remote.current_principal().await {
            Principal::Known(id) => id,
            Principal::Anonymous => {
                return Err(CatalogError::NotAuthorized("sign in to upload".to_string()));
            }
        };
        inner.hydrate().await?;

        let temporary = EntityId::temporary();
        let (media_ref, file_name) = match &media {
            MediaSource::Upload(blob) => {
                let hash = inner
                    .blobs
                    .store(&blob.bytes)
                    .await
                    .map_err(CatalogError::storage)?;
                let media_ref = MediaRef::Local {
                    hash,
                    content_type: blob.content_type.clone(),
                };
                (media_ref, blob.file_name.clone())
            }
            MediaSource::Link(url) => (MediaRef::external(url.trim()), None),
        };
        let mut entity = Entity::from_draft(temporary.clone(), &draft, media_ref, Some(owner), now());
        if let MediaSource::Upload(blob) = &media {
            entity.media_info = blob.media_info();
        }
        let mutation = PendingMutation::new(
            temporary.clone(),
            PendingOp::Create {
                entity: entity.clone(),
                file_name,
            },
        );

        if let Err(err) = inner.persist_created(&entity, &mutation).await {
            inner.discard_local_blob(&entity.media).await;
            return Err(err);
        }
        inner.with_state(|s| {
            s.put(entity.clone());
            s.creating.insert(temporary.clone());
        });
        debug!(entity_id = %temporary, kind = %entity.kind, "optimistic create");
        inner.emit(CatalogEvent::Created {
            entity: entity.clone(),
        });

        let retry = RetryableCreate { draft, media };
        let job = {
            let inner = Arc::clone(inner);
            let lane = temporary.clone();
            let mutation = mutation.id.clone();
            async move { inner.run_create(lane, retry, mutation).await }
        };
        let outcome = self.spawn_on_lane(&temporary, job);
        Ok(Optimistic {
            value: entity,
            outcome,
        })
    }
}

impl<S: CatalogTypes> Inner<S> {
    async fn persist_created(&self, entity: &Entity, mutation: &PendingMutation) -> Result<()> {
        self.cache.put(entity).await.map_err(CatalogError::storage)?;
        if let Err(err) = self.cache.enqueue_pending(mutation).await {
            let _ = self.cache.remove(&entity.id).await;
            return Err(CatalogError::storage(err));
        }
        Ok(())
    }

    pub(crate) async fn run_create(
        &self,
        lane: EntityId,
        retry: RetryableCreate,
        mutation: MutationId,
    ) -> Result<Entity> {
        let snapshot = self.with_state(|s| s.get(&s.current_id(&lane)).cloned());
        let Some(snapshot) = snapshot else {
            // Deleted before the upload started; the queued delete cleans up locally
            debug!(lane = %lane, "create abandoned, entity already deleted");
            self.with_state(|s| s.creating.remove(&lane));
            self.resolve(&mutation).await;
            return Err(CatalogError::NotFound(lane));
        };

        match self.push_create(&snapshot, &retry.media).await {
            Ok((confirmed, media)) => {
                Ok(self
                    .confirm_create(&lane, snapshot, confirmed, media, &mutation)
                    .await)
            }
            Err(error) => {
                self.rollback_create(&lane, &snapshot, &mutation, &error).await;
                Err(CatalogError::UploadFailed {
                    retry: Box::new(retry),
                    source: Box::new(error),
                })
            }
        }
    }

    /// Upload the media (if any) and insert the row. Returns the remote id
    /// and the durable media reference.
    async fn push_create(
        &self,
        entity: &Entity,
        media: &MediaSource,
    ) -> Result<(EntityId, MediaRef)> {
        let kind = entity.kind;
        let (uploaded, media_ref) = match media {
            MediaSource::Upload(blob) => {
                let owner = entity.owner.as_ref().ok_or_else(|| {
                    CatalogError::NotAuthorized("upload has no owner".to_string())
                })?;
                let extension = upload_extension(blob.file_name.as_deref(), &blob.content_type);
                let path = storage_path(kind, owner, &extension);
                let durable = self
                    .call(
                        "upload_blob",
                        self.remote.upload_blob(
                            self.config.bucket(kind),
                            &path,
                            &blob.bytes,
                            &blob.content_type,
                        ),
                    )
                    .await?;
                debug!(entity_id = %entity.id, media = %durable, "media uploaded");
                (Some(durable.clone()), MediaRef::Stored(durable))
            }
            MediaSource::Link(_) => (None, entity.media.clone()),
        };

        let mut record = entity.clone();
        record.media = media_ref.clone();
        let inserted = self
            .call(
                "insert_row",
                self.remote
                    .insert_row(self.config.table(kind), insert_record(&record)),
            )
            .await
            .and_then(|row| {
                row_id(&row).ok_or_else(|| CatalogError::RemoteRejected {
                    op: "insert_row",
                    status: None,
                    message: "inserted row carries no id".to_string(),
                })
            });

        match inserted {
            Ok(id) => Ok((id, media_ref)),
            Err(err) => {
                if let Some(durable) = uploaded {
                    self.discard_upload(&entity.id, durable).await;
                }
                Err(err)
            }
        }
    }

    /// Delete an object uploaded for a row that never got inserted.
    async fn discard_upload(&self, entity_id: &EntityId, durable: DurableRef) {
        match self
            .call("delete_blob", self.remote.delete_blob(&durable))
            .await
        {
            Ok(()) => debug!(entity_id = %entity_id, media = %durable, "discarded uploaded media"),
            Err(err) => self.record_orphan(entity_id, durable, &err).await,
        }
    }

    async fn confirm_create(
        &self,
        lane: &EntityId,
        snapshot: Entity,
        confirmed: EntityId,
        media: MediaRef,
        mutation: &MutationId,
    ) -> Entity {
        let live = self.with_state(|s| s.confirm(lane, &confirmed, media.clone()));

        if let Err(err) = self.cache.remove(&snapshot.id).await {
            warn!(entity_id = %snapshot.id, error = %err, "could not drop temporary cache entry");
        }
        if let Some(entity) = &live {
            if let Err(err) = self.cache.put(entity).await {
                warn!(entity_id = %confirmed, error = %err, "could not cache confirmed entity");
            }
        }
        self.resolve(mutation).await;
        self.discard_local_blob(&snapshot.media).await;

        info!(temporary = %snapshot.id, entity_id = %confirmed, "create confirmed");
        self.emit(CatalogEvent::Confirmed {
            temporary: snapshot.id.clone(),
            confirmed: confirmed.clone(),
        });

        live.unwrap_or_else(|| Entity {
            id: confirmed,
            media,
            ..snapshot
        })
    }

    async fn rollback_create(
        &self,
        lane: &EntityId,
        snapshot: &Entity,
        mutation: &MutationId,
        error: &CatalogError,
    ) {
        self.with_state(|s| {
            s.creating.remove(lane);
            s.remove(&snapshot.id);
        });
        if let Err(err) = self.cache.remove(&snapshot.id).await {
            warn!(entity_id = %snapshot.id, error = %err, "could not drop failed create from cache");
        }
        self.resolve(mutation).await;
        self.discard_local_blob(&snapshot.media).await;

        warn!(entity_id = %snapshot.id, error = %error, "create failed, optimistic entity removed");
        self.emit(CatalogEvent::CreateFailed {
            temporary: snapshot.id.clone(),
            error: error.to_string(),
        });
    }
}

fn row_id(row: &Value) -> Option<EntityId> {
    match row.get("id")? {
        Value::String(s) if !s.is_empty() => Some(EntityId::from_string(s.clone())),
        Value::Number(n) => Some(EntityId::from_string(n.to_string())),
        _ => None,
    }
}
