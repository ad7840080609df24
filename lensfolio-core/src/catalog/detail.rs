//! Detail views guarded against stale responses
//!
//! A handle names a slot and the generation it was issued for. Retargeting a
//! slot bumps its generation, so a refresh started for the old target is
//! discarded when it lands.

use tracing::{debug, warn};

use super::engine::CatalogEngine;
use super::state::DetailSlot;
use crate::error::Result;
use crate::ids::EntityId;
use crate::model::Entity;
use crate::remote::{RemoteClient, RowFilter, RowOrder};
use crate::storage::{CacheStore, CatalogTypes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetailHandle {
    slot: u64,
    generation: u64,
}

impl<S: CatalogTypes> CatalogEngine<S> {
    pub fn open_detail(&self, id: &EntityId) -> Option<DetailHandle> {
        self.inner.with_state(|s| {
            s.get(id)?;
            let lane = s.lane_of(id);
            s.next_detail += 1;
            let slot = s.next_detail;
            s.details.insert(slot, DetailSlot { lane, generation: 0 });
            Some(DetailHandle { slot, generation: 0 })
        })
    }

    /// Point an open detail view at another entity. The old handle goes stale.
    pub fn retarget_detail(&self, handle: DetailHandle, id: &EntityId) -> Option<DetailHandle> {
        self.inner.with_state(|s| {
            s.get(id)?;
            let lane = s.lane_of(id);
            let slot = s.details.get_mut(&handle.slot)?;
            if slot.generation != handle.generation {
                return None;
            }
            slot.generation += 1;
            slot.lane = lane;
            Some(DetailHandle {
                slot: handle.slot,
                generation: slot.generation,
            })
        })
    }

    /// The entity shown by `handle`, following id confirmation.
    pub fn detail(&self, handle: DetailHandle) -> Option<Entity> {
        self.inner.with_state(|s| {
            let slot = s.details.get(&handle.slot)?;
            if slot.generation != handle.generation {
                return None;
            }
            let id = s.current_id(&slot.lane);
            s.get(&id).cloned()
        })
    }

    /// Re-fetch the entity behind `handle`.
    ///
    /// Returns `Ok(None)` when the handle went stale while the request was in
    /// flight; the response is then dropped without touching state.
    pub async fn refresh_detail(&self, handle: DetailHandle) -> Result<Option<Entity>> {
        let inner = &self.inner;
        let Some(current) = self.detail(handle) else {
            return Ok(None);
        };
        if !current.is_confirmed() {
            return Ok(Some(current));
        }

        let since = inner.with_state(|s| s.epoch());
        let rows = inner
            .call(
                "query_rows",
                inner.remote.query_rows(
                    inner.config.table(current.kind),
                    &RowFilter::all().eq("id", current.id.as_str()),
                    &RowOrder::newest_first(),
                ),
            )
            .await?;
        let fresh = rows
            .first()
            .map(|row| inner.normalizer.normalize_as(Some(current.kind), row))
            .transpose()?;

        let merged = inner.with_state(|s| {
            let live = s
                .details
                .get(&handle.slot)
                .is_some_and(|slot| slot.generation == handle.generation);
            if !live {
                return None;
            }
            let lane = s.lane_of(&current.id);
            let changed = fresh
                .filter(|_| !s.settled_since(&lane, since))
                .and_then(|entity| s.merge_one(entity));
            Some((changed, s.get(&current.id).cloned()))
        });
        let Some((changed, shown)) = merged else {
            debug!(entity_id = %current.id, "discarding stale detail response");
            return Ok(None);
        };
        if let Some(entity) = changed {
            if let Err(err) = inner.cache.put(&entity).await {
                warn!(entity_id = %entity.id, error = %err, "could not cache detail refresh");
            }
        }
        Ok(shown)
    }

    pub fn close_detail(&self, handle: DetailHandle) {
        self.inner.with_state(|s| {
            if s
                .details
                .get(&handle.slot)
                .is_some_and(|slot| slot.generation == handle.generation)
            {
                s.details.remove(&handle.slot);
            }
        });
    }
}
