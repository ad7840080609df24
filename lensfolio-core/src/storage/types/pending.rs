//! Durable log of mutations not yet acknowledged by the remote

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::helper::now;
use crate::ids::{EntityId, MutationId};
use crate::model::{DurableRef, Entity, FieldPatch};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
    /// Optimistic create; `entity.media` points at the local blob
    Create {
        entity: Entity,
        file_name: Option<String>,
    },
    Update {
        entity_id: EntityId,
        patch: FieldPatch,
        previous: FieldPatch,
    },
    Delete { entity: Entity },
    /// Row is gone but its media object could not be deleted
    PurgeMedia {
        entity_id: EntityId,
        media: DurableRef,
    },
}

impl PendingOp {
    pub fn name(&self) -> &'static str {
        match self {
            PendingOp::Create { .. } => "create",
            PendingOp::Update { .. } => "update",
            PendingOp::Delete { .. } => "delete",
            PendingOp::PurgeMedia { .. } => "purge_media",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub id: MutationId,
    /// Serialization lane; the first id the entity was known by
    pub lane: EntityId,
    pub op: PendingOp,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingMutation {
    pub fn new(lane: EntityId, op: PendingOp) -> Self {
        Self {
            id: MutationId::new(),
            lane,
            op,
            enqueued_at: now(),
        }
    }

    /// The cached entity this mutation keeps alive, if it still exists locally.
    pub fn protects(&self) -> Option<&EntityId> {
        match &self.op {
            PendingOp::Create { entity, .. } => Some(&entity.id),
            PendingOp::Update { entity_id, .. } => Some(entity_id),
            PendingOp::Delete { .. } | PendingOp::PurgeMedia { .. } => None,
        }
    }
}
