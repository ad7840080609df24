//! Field updates, reactions, likes and comments

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::engine::{CatalogEngine, Inner};
use super::events::CatalogEvent;
use super::outcome::Optimistic;
use super::state::InFlight;
use crate::error::{CatalogError, Result};
use crate::helper::now;
use crate::ids::{EntityId, MutationId};
use crate::model::{AnonymousPolicy, Entity, FieldPatch, ReactionKind};
use crate::normalize::patch_row;
use crate::remote::RemoteClient;
use crate::social::{comment_patch, like_patch, new_comment, reaction_patch, with_avatar};
use crate::storage::{CacheStore, CatalogTypes, PendingMutation, PendingOp};

/// An optimistic patch as applied to memory
struct Applied {
    lane: EntityId,
    patch: FieldPatch,
    previous: FieldPatch,
    entity: Entity,
    mutation: MutationId,
}

impl<S: CatalogTypes> CatalogEngine<S> {
    /// Merge `patch` into an entity now and persist it in the background.
    ///
    /// If the remote rejects the change, exactly the fields it wrote are
    /// reverted, and only while they still hold the written value.
    pub async fn update_fields(&self, id: &EntityId, patch: FieldPatch) -> Result<Optimistic<Entity>> {
        self.update_with(id, move |_| Ok(patch)).await
    }

    /// Toggle the viewer's reaction of `kind`.
    pub async fn toggle_reaction(&self, id: &EntityId, kind: ReactionKind) -> Result<Optimistic<Entity>> {
        self.update_with(id, move |entity| Ok(reaction_patch(entity, kind)))
            .await
    }

    /// Like or unlike; the shared counter moves with the viewer's flag.
    pub async fn toggle_like(&self, id: &EntityId) -> Result<Optimistic<Entity>> {
        self.update_with(id, |entity| Ok(like_patch(entity))).await
    }

    pub async fn add_comment(&self, id: &EntityId, author: &str, text: &str) -> Result<Optimistic<Entity>> {
        self.add_comment_with_avatar(id, author, None, text).await
    }

    pub async fn add_comment_with_avatar(
        &self,
        id: &EntityId,
        author: &str,
        avatar: Option<&str>,
        text: &str,
    ) -> Result<Optimistic<Entity>> {
        let comment = with_avatar(new_comment(author, text)?, avatar);
        self.update_with(id, move |_| Ok(comment_patch(comment)))
            .await
    }

    /// Build the patch from the entity's current state under the state lock,
    /// so concurrent toggles never read a stale value.
    async fn update_with<F>(&self, id: &EntityId, build: F) -> Result<Optimistic<Entity>>
    where
        F: FnOnce(&Entity) -> Result<FieldPatch>,
    {
        let inner = &self.inner;
        inner.hydrate().await?;
        let principal = inner.remote.current_principal().await;
        let local_only = principal.is_anonymous() && inner.config.anonymous == AnonymousPolicy::LocalOnly;
        let policy = inner.config.ownership;

        let applied = inner.with_state(|s| -> Result<Applied> {
            let lane = s.lane_of(id);
            let entity = s
                .get_mut(id)
                .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
            let patch = build(&*entity)?;
            patch.validate(entity.kind)?;
            if patch.touches_content() {
                principal.authorize(entity.owner.as_ref(), policy)?;
            }
            let previous = patch.capture(entity);
            patch.apply(entity);
            let entity = entity.clone();

            let mutation = MutationId::new();
            if local_only {
                s.local_overlays
                    .entry(lane.clone())
                    .or_default()
                    .push(patch.clone());
            } else {
                s.in_flight.entry(lane.clone()).or_default().push(InFlight {
                    mutation: mutation.clone(),
                    patch: patch.clone(),
                });
            }
            Ok(Applied {
                lane,
                patch,
                previous,
                entity,
                mutation,
            })
        })?;

        if let Err(err) = inner.cache.put(&applied.entity).await {
            inner.undo_local(&applied);
            return Err(CatalogError::storage(err));
        }
        inner.emit(CatalogEvent::Updated { id: id.clone() });

        if local_only {
            debug!(entity_id = %id, fields = ?applied.patch.fields(), "anonymous update kept local");
            let entity = applied.entity.clone();
            return Ok(Optimistic::settled(applied.entity, Ok(entity)));
        }

        let pending = PendingMutation {
            id: applied.mutation.clone(),
            lane: applied.lane.clone(),
            op: PendingOp::Update {
                entity_id: id.clone(),
                patch: applied.patch.clone(),
                previous: applied.previous.clone(),
            },
            enqueued_at: now(),
        };
        if let Err(err) = inner.cache.enqueue_pending(&pending).await {
            let reverted = inner.undo_local(&applied);
            if let Some(entity) = reverted {
                let _ = inner.cache.put(&entity).await;
            }
            return Err(CatalogError::storage(err));
        }
        debug!(entity_id = %id, fields = ?applied.patch.fields(), "optimistic update");

        let Applied {
            lane,
            patch,
            previous,
            entity,
            mutation,
        } = applied;
        let job = {
            let inner = Arc::clone(inner);
            let lane = lane.clone();
            async move { inner.run_update(lane, patch, previous, mutation).await }
        };
        let outcome = self.spawn_on_lane(&lane, job);
        Ok(Optimistic {
            value: entity,
            outcome,
        })
    }
}

impl<S: CatalogTypes> Inner<S> {
    /// Roll back an optimistic patch that never got logged.
    fn undo_local(&self, applied: &Applied) -> Option<Entity> {
        self.with_state(|s| {
            s.drop_in_flight(&applied.lane, &applied.mutation);
            if let Some(overlays) = s.local_overlays.get_mut(&applied.lane) {
                if let Some(pos) = overlays.iter().rposition(|p| *p == applied.patch) {
                    overlays.remove(pos);
                }
            }
            let target = s.current_id(&applied.lane);
            let entity = s.get_mut(&target)?;
            applied.patch.revert(&applied.previous, entity);
            Some(entity.clone())
        })
    }

    pub(crate) async fn run_update(
        &self,
        lane: EntityId,
        patch: FieldPatch,
        previous: FieldPatch,
        mutation: MutationId,
    ) -> Result<Entity> {
        let (target, current) = self.with_state(|s| {
            let target = s.current_id(&lane);
            let current = s.get(&target).cloned();
            (target, current)
        });
        let current = match current {
            Some(entity) if entity.is_confirmed() => entity,
            _ => {
                // The create failed or the entity was deleted meanwhile
                debug!(entity_id = %target, "update dropped, entity no longer exists remotely");
                self.with_state(|s| s.drop_in_flight(&lane, &mutation));
                self.resolve(&mutation).await;
                return Err(CatalogError::NotFound(target));
            }
        };

        let table = self.config.table(current.kind);
        let fields = patch_row(&patch, &current);
        match self
            .call("update_row", self.remote.update_row(table, &target, fields))
            .await
        {
            Ok(()) => {
                let entity = self.with_state(|s| {
                    s.drop_in_flight(&lane, &mutation);
                    s.settle(&lane);
                    s.get(&target).cloned()
                });
                self.resolve(&mutation).await;
                info!(entity_id = %target, fields = ?patch.fields(), "update confirmed");
                self.emit(CatalogEvent::UpdateConfirmed { id: target });
                Ok(entity.unwrap_or(current))
            }
            Err(err) => {
                let reverted = self.with_state(|s| {
                    s.drop_in_flight(&lane, &mutation);
                    s.settle(&lane);
                    let entity = s.get_mut(&target)?;
                    let fields = patch.revert(&previous, entity);
                    Some((entity.clone(), fields))
                });
                let fields = match reverted {
                    Some((entity, fields)) => {
                        if let Err(cache_err) = self.cache.put(&entity).await {
                            warn!(entity_id = %target, error = %cache_err, "could not cache reverted entity");
                        }
                        fields
                    }
                    None => Vec::new(),
                };
                self.resolve(&mutation).await;
                warn!(entity_id = %target, fields = ?fields, error = %err, "update rejected, reverted");
                self.emit(CatalogEvent::UpdateReverted {
                    id: target,
                    fields,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}
