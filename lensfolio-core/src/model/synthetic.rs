//! Demo filler items for an empty remote
//!
//! Synthetic items reuse a persisted entity's presentation but carry their own
//! id type, so they can never be addressed by a persistence operation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::{Category, Entity, MediaRef, Tags};
use crate::ids::EntityId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SyntheticId {
    source: EntityId,
    position: usize,
}

impl SyntheticId {
    pub fn source(&self) -> &EntityId {
        &self.source
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for SyntheticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~demo-{}", self.source, self.position)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyntheticEntity {
    id: SyntheticId,
    template: Entity,
}

impl SyntheticEntity {
    /// Recombine `source` as the item at absolute sequence `position`.
    pub fn new(source: &Entity, position: usize) -> Self {
        Self {
            id: SyntheticId {
                source: source.id.clone(),
                position,
            },
            template: source.clone(),
        }
    }

    pub fn id(&self) -> &SyntheticId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.template.title
    }

    pub fn description(&self) -> &str {
        &self.template.description
    }

    pub fn category(&self) -> &Category {
        &self.template.category
    }

    pub fn tags(&self) -> &Tags {
        &self.template.tags
    }

    pub fn media(&self) -> &MediaRef {
        &self.template.media
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.template.created_at
    }
}

/// One item of a paginated view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CatalogItem {
    Persisted(Entity),
    Synthetic(SyntheticEntity),
}

impl CatalogItem {
    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Persisted(e) => &e.title,
            CatalogItem::Synthetic(s) => s.title(),
        }
    }

    pub fn media(&self) -> &MediaRef {
        match self {
            CatalogItem::Persisted(e) => &e.media,
            CatalogItem::Synthetic(s) => s.media(),
        }
    }

    pub fn as_persisted(&self) -> Option<&Entity> {
        match self {
            CatalogItem::Persisted(e) => Some(e),
            CatalogItem::Synthetic(_) => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, CatalogItem::Synthetic(_))
    }

    /// Display key, unique across persisted and synthetic items.
    pub fn key(&self) -> String {
        match self {
            CatalogItem::Persisted(e) => e.id.to_string(),
            CatalogItem::Synthetic(s) => s.id().to_string(),
        }
    }
}
