//! Storage value types

mod blob;
mod pending;

pub use blob::BlobHash;
pub use pending::{PendingMutation, PendingOp};

use crate::model::{Category, Entity, MediaKind};

/// Selection for `CacheStore::list`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheFilter {
    pub kind: Option<MediaKind>,
    pub category: Option<Category>,
}

impl CacheFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.kind.is_none_or(|k| entity.kind == k)
            && self.category.as_ref().is_none_or(|c| &entity.category == c)
    }
}

/// Occupancy snapshot of a cache store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheUsage {
    pub entities: usize,
    pub bytes: u64,
    pub quota: Option<u64>,
    pub pending: usize,
}
