//! In-memory catalog owned by the engine
//!
//! Entities are addressed by their current id; serialization lanes are keyed
//! by the first id an entity was known by, so a lane survives the
//! temporary-to-confirmed replacement. Lane bookkeeping outlives the entity
//! itself because queued jobs still need to resolve their target.

use std::collections::{HashMap, HashSet};

use crate::ids::{EntityId, MutationId};
use crate::model::{Category, DurableRef, Entity, FieldPatch, MediaKind, MediaRef};

/// A media object whose row is gone but which could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub mutation: MutationId,
    pub entity_id: EntityId,
    pub media: DurableRef,
}

#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    pub mutation: MutationId,
    pub patch: FieldPatch,
}

#[derive(Debug, Clone)]
pub(crate) struct DetailSlot {
    pub lane: EntityId,
    pub generation: u64,
}

/// What part of the catalog a refresh covered, and the settle epoch it
/// started at. Lanes settled after `since` are newer than the snapshot.
#[derive(Debug, Clone)]
pub(crate) struct MergeScope {
    pub category: Option<Category>,
    pub since: u64,
}

impl MergeScope {
    pub fn kinds(&self) -> Vec<MediaKind> {
        match self.category.as_ref().and_then(Category::kind) {
            Some(kind) => vec![kind],
            None => vec![MediaKind::Photo, MediaKind::Video],
        }
    }

    pub fn contains(&self, entity: &Entity) -> bool {
        self.category.as_ref().is_none_or(|c| entity.category == *c)
    }
}

#[derive(Debug, Default)]
pub(crate) struct MergeOutcome {
    pub upserted: Vec<Entity>,
    pub removed: Vec<EntityId>,
    /// Confirmed entities in scope kept because they settled after the snapshot
    pub held: usize,
}

#[derive(Debug, Default)]
pub(crate) struct CatalogState {
    /// Newest first
    entities: Vec<Entity>,
    /// current id -> lane
    lanes: HashMap<EntityId, EntityId>,
    /// lane -> current id
    current: HashMap<EntityId, EntityId>,
    pub in_flight: HashMap<EntityId, Vec<InFlight>>,
    /// Patches applied locally that are never sent (anonymous viewers)
    pub local_overlays: HashMap<EntityId, Vec<FieldPatch>>,
    pub creating: HashSet<EntityId>,
    pub deleting: HashSet<EntityId>,
    /// Media of a create confirmed after its entity was deleted locally
    pub late_media: HashMap<EntityId, MediaRef>,
    pub orphans: Vec<Orphan>,
    pub hydrated: bool,
    pub remote_has_data: Option<bool>,
    pub details: HashMap<u64, DetailSlot>,
    pub next_detail: u64,
    /// Bumped whenever the remote confirms or rejects a write
    epoch: u64,
    /// lane -> epoch of its last settled write
    settled: HashMap<EntityId, u64>,
}

impl CatalogState {
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == *id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == *id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn view(&self, category: Option<&Category>) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|e| category.is_none_or(|c| e.category == *c))
            .cloned()
            .collect()
    }

    pub fn lane_of(&self, id: &EntityId) -> EntityId {
        self.lanes.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    pub fn current_id(&self, lane: &EntityId) -> EntityId {
        self.current.get(lane).cloned().unwrap_or_else(|| lane.clone())
    }

    /// Record that `lane` now addresses `id`.
    pub fn bind_lane(&mut self, lane: &EntityId, id: &EntityId) {
        self.lanes.insert(id.clone(), lane.clone());
        self.current.insert(lane.clone(), id.clone());
    }

    /// Insert or replace, keeping newest-first order.
    pub fn put(&mut self, entity: Entity) {
        if !self.lanes.contains_key(&entity.id) {
            self.lanes.insert(entity.id.clone(), entity.id.clone());
            self.current
                .entry(entity.id.clone())
                .or_insert_with(|| entity.id.clone());
        }
        self.entities.retain(|e| e.id != entity.id);
        let at = self
            .entities
            .partition_point(|e| e.created_at > entity.created_at);
        self.entities.insert(at, entity);
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let position = self.entities.iter().position(|e| e.id == *id)?;
        Some(self.entities.remove(position))
    }

    /// Whether anything on this lane is still waiting for the remote.
    pub fn has_pending_work(&self, lane: &EntityId) -> bool {
        self.creating.contains(lane)
            || self.deleting.contains(lane)
            || self.in_flight.get(lane).is_some_and(|p| !p.is_empty())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Stamp `lane` with a new epoch once the remote has answered a write.
    pub fn settle(&mut self, lane: &EntityId) {
        self.epoch += 1;
        self.settled.insert(lane.clone(), self.epoch);
    }

    pub fn settled_since(&self, lane: &EntityId, since: u64) -> bool {
        self.settled.get(lane).is_some_and(|epoch| *epoch > since)
    }

    pub fn drop_in_flight(&mut self, lane: &EntityId, mutation: &MutationId) {
        if let Some(patches) = self.in_flight.get_mut(lane) {
            patches.retain(|p| p.mutation != *mutation);
            if patches.is_empty() {
                self.in_flight.remove(lane);
            }
        }
    }

    /// Point the lane at its remote id. Returns the confirmed entity, or
    /// `None` if it was deleted locally while the create was in flight.
    pub fn confirm(&mut self, lane: &EntityId, confirmed: &EntityId, media: MediaRef) -> Option<Entity> {
        self.creating.remove(lane);
        self.settle(lane);
        let temporary = self.current_id(lane);
        self.lanes.remove(&temporary);
        self.lanes.insert(confirmed.clone(), lane.clone());
        self.current.insert(lane.clone(), confirmed.clone());

        // A refresh may already have pulled in the new row
        if *confirmed != temporary {
            self.entities.retain(|e| e.id != *confirmed);
        }
        let Some(entity) = self.get_mut(&temporary) else {
            self.late_media.insert(lane.clone(), media);
            return None;
        };
        entity.id = confirmed.clone();
        entity.media = media;
        Some(entity.clone())
    }

    /// Add cached entities that are not in memory yet. Returns how many.
    pub fn absorb(&mut self, cached: Vec<Entity>) -> usize {
        let mut added = 0;
        for entity in cached {
            if self.get(&entity.id).is_some() || self.deleting.contains(&self.lane_of(&entity.id)) {
                continue;
            }
            self.put(entity);
            added += 1;
        }
        added
    }

    /// Apply local-wins overlays (in-flight and local-only patches) to a
    /// record fresh from the remote.
    fn overlay(&self, lane: &EntityId, entity: &mut Entity) {
        if let Some(patches) = self.local_overlays.get(lane) {
            for patch in patches {
                patch.apply(entity);
            }
        }
        if let Some(patches) = self.in_flight.get(lane) {
            for pending in patches {
                pending.patch.apply(entity);
            }
        }
    }

    /// Merge one remote record. Returns the entity if local state changed.
    pub fn merge_one(&mut self, mut remote: Entity) -> Option<Entity> {
        let lane = self.lane_of(&remote.id);
        if self.deleting.contains(&lane) {
            return None;
        }
        self.overlay(&lane, &mut remote);
        if self.get(&remote.id) == Some(&remote) {
            return None;
        }
        self.put(remote.clone());
        Some(remote)
    }

    /// Remote-wins merge of a refresh over `scope`.
    ///
    /// Lanes settled after the snapshot was requested keep their local state:
    /// the snapshot neither overwrites nor removes them.
    pub fn merge_remote(&mut self, fetched: Vec<Entity>, scope: &MergeScope) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut seen = HashSet::new();
        for remote in fetched {
            if !scope.contains(&remote) {
                continue;
            }
            seen.insert(remote.id.clone());
            if self.settled_since(&self.lane_of(&remote.id), scope.since) {
                continue;
            }
            if let Some(changed) = self.merge_one(remote) {
                outcome.upserted.push(changed);
            }
        }

        let mut vanished = Vec::new();
        for entity in &self.entities {
            if !entity.is_confirmed() || !scope.contains(entity) || seen.contains(&entity.id) {
                continue;
            }
            let lane = self.lane_of(&entity.id);
            if self.settled_since(&lane, scope.since) {
                outcome.held += 1;
            } else if !self.has_pending_work(&lane) {
                vanished.push(entity.id.clone());
            }
        }
        for id in &vanished {
            self.remove(id);
        }
        outcome.removed = vanished;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDraft, PhotoCategory};
    use chrono::{Duration, Utc};

    fn entity(id: &str, age_secs: i64) -> Entity {
        Entity::from_draft(
            EntityId::from(id),
            &EntityDraft::photo(format!("Photo {id}"), Category::Photo(PhotoCategory::Urban)),
            MediaRef::external(format!("https://cdn.example.com/{id}.jpg")),
            None,
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    #[test]
    fn test_put_keeps_newest_first() {
        let mut state = CatalogState::default();
        state.put(entity("old", 100));
        state.put(entity("new", 1));
        state.put(entity("mid", 50));
        let ids: Vec<&str> = state.entities().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_merge_overlays_in_flight_patch() {
        let mut state = CatalogState::default();
        let mut local = entity("1", 10);
        local.title = "Local title".into();
        state.put(local.clone());
        state.in_flight.insert(
            EntityId::from("1"),
            vec![InFlight {
                mutation: MutationId::new(),
                patch: FieldPatch::title("Local title"),
            }],
        );

        let mut remote = local.clone();
        remote.title = "Remote title".into();
        remote.likes = 9;
        let outcome = state.merge_remote(vec![remote], &MergeScope { category: None, since: 0 });

        let merged = state.get(&EntityId::from("1")).unwrap();
        assert_eq!(merged.title, "Local title");
        assert_eq!(merged.likes, 9);
        assert_eq!(outcome.upserted.len(), 1);
    }

    #[test]
    fn test_merge_drops_vanished_but_keeps_pending() {
        let mut state = CatalogState::default();
        state.put(entity("gone", 10));
        state.put(entity("tmp-new", 1));
        state.put(entity("busy", 5));
        state.in_flight.insert(
            EntityId::from("busy"),
            vec![InFlight {
                mutation: MutationId::new(),
                patch: FieldPatch::title("x"),
            }],
        );

        let outcome = state.merge_remote(Vec::new(), &MergeScope { category: None, since: 0 });
        assert_eq!(outcome.removed, vec![EntityId::from("gone")]);
        assert!(state.get(&EntityId::from("tmp-new")).is_some());
        assert!(state.get(&EntityId::from("busy")).is_some());
    }

    #[test]
    fn test_deleting_entities_never_reappear() {
        let mut state = CatalogState::default();
        state.deleting.insert(EntityId::from("5"));
        let outcome = state.merge_remote(vec![entity("5", 1)], &MergeScope { category: None, since: 0 });
        assert!(outcome.upserted.is_empty());
        assert!(state.get(&EntityId::from("5")).is_none());
    }

    #[test]
    fn test_confirm_keeps_lane_and_replaces_duplicate() {
        let mut state = CatalogState::default();
        let temp = EntityId::from("tmp-1");
        let mut local = entity("tmp-1", 1);
        local.likes = 3;
        state.put(local);
        state.creating.insert(temp.clone());
        // Refresh already pulled the confirmed row
        state.put(entity("42", 1));

        let media = MediaRef::Stored(DurableRef::new("photos", "users/u1/a.jpg"));
        let confirmed = state.confirm(&temp, &EntityId::from("42"), media.clone()).unwrap();
        assert_eq!(confirmed.likes, 3);
        assert_eq!(confirmed.media, media);
        assert_eq!(state.entities().len(), 1);
        assert_eq!(state.lane_of(&EntityId::from("42")), temp);
        assert_eq!(state.current_id(&temp).as_str(), "42");
        assert!(!state.has_pending_work(&temp));
    }

    #[test]
    fn test_scope_limits_removal() {
        let mut state = CatalogState::default();
        state.put(entity("1", 1));
        let scope = MergeScope {
            category: Some(Category::Photo(PhotoCategory::Wildlife)),
            since: 0,
        };
        assert_eq!(scope.kinds(), vec![MediaKind::Photo]);
        let outcome = state.merge_remote(Vec::new(), &scope);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_snapshot_older_than_settled_lane_is_ignored() {
        let mut state = CatalogState::default();
        let mut liked = entity("7", 20);
        state.put(liked.clone());
        state.put(entity("42", 1));
        let scope = MergeScope {
            category: None,
            since: state.epoch(),
        };

        // Both writes land while the snapshot is in transit
        liked.likes = 1;
        state.put(liked.clone());
        state.settle(&EntityId::from("7"));
        state.settle(&EntityId::from("42"));

        let mut stale = liked.clone();
        stale.likes = 0;
        let outcome = state.merge_remote(vec![stale], &scope);
        assert!(outcome.upserted.is_empty());
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.held, 1);
        assert_eq!(state.get(&EntityId::from("7")).unwrap().likes, 1);
        assert!(state.get(&EntityId::from("42")).is_some());

        // A later snapshot is authoritative again
        let fresh = MergeScope {
            category: None,
            since: state.epoch(),
        };
        let outcome = state.merge_remote(vec![liked], &fresh);
        assert_eq!(outcome.removed, vec![EntityId::from("42")]);
    }
}
