use crate::ids::EntityId;
use crate::model::{DurableRef, Entity};

/// Counts from one remote refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Records that normalized cleanly
    pub fetched: usize,
    /// Records skipped as malformed
    pub quarantined: usize,
    /// Entities added or changed locally
    pub upserted: usize,
    /// Confirmed entities dropped because the remote no longer has them
    pub removed: usize,
    /// Entities that could not be written to the local cache
    pub cache_failures: usize,
}

/// State transitions observed by views and by the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    Refreshed(RefreshReport),
    /// Optimistic entity added under a temporary id
    Created { entity: Entity },
    /// The temporary id was replaced by the remote one
    Confirmed {
        temporary: EntityId,
        confirmed: EntityId,
    },
    CreateFailed { temporary: EntityId, error: String },
    Updated { id: EntityId },
    UpdateConfirmed { id: EntityId },
    UpdateReverted {
        id: EntityId,
        fields: Vec<&'static str>,
        error: String,
    },
    /// Optimistically removed
    Removed { id: EntityId },
    DeleteCommitted { id: EntityId },
    /// The remote refused the delete; the entity is back
    DeleteFailed { id: EntityId, error: String },
    /// The row is gone but its media object is still stored
    MediaOrphaned { id: EntityId, media: DurableRef },
    OrphanPurged { media: DurableRef },
}
