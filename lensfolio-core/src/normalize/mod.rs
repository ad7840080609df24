//! Entity normalizer
//!
//! Turns raw records of any historical shape into [`Entity`] values and back.
//! Classification happens once, in [`SchemaVersion::detect`]; each version has
//! its own adapter.

mod adapters;
mod canonical;
mod record;
mod schema;

pub use canonical::{denormalize, insert_record, patch_row};
pub use schema::{SchemaVersion, CANONICAL_SCHEMA};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::MalformedEntity;
use crate::model::{Entity, MediaKind};
use record::Record;

#[derive(Debug, Clone)]
pub struct Normalizer {
    photo_bucket: String,
    /// Media URL for records that reference none
    placeholder: Option<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            photo_bucket: "photos".to_string(),
            placeholder: None,
        }
    }
}

/// Result of normalizing many records at once
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub entities: Vec<Entity>,
    pub quarantined: Vec<MalformedEntity>,
}

impl Normalizer {
    /// `photo_bucket` is the bucket that bare `storage_path` rows live in.
    pub fn new(photo_bucket: impl Into<String>) -> Self {
        Self {
            photo_bucket: photo_bucket.into(),
            placeholder: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: Option<String>) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn normalize(&self, raw: &Value) -> Result<Entity, MalformedEntity> {
        self.normalize_as(None, raw)
    }

    /// Normalize a record whose origin (photo or video table) is known.
    pub fn normalize_as(
        &self,
        kind_hint: Option<MediaKind>,
        raw: &Value,
    ) -> Result<Entity, MalformedEntity> {
        let fields = raw
            .as_object()
            .ok_or_else(|| MalformedEntity::new(None, "record is not an object"))?;
        let rec = Record(fields);
        let version = SchemaVersion::detect(fields, kind_hint);
        debug!(schema = %version, "normalizing record");

        match version {
            SchemaVersion::Canonical => self.canonical(&rec),
            SchemaVersion::StoragePath => self.storage_path_row(&rec),
            SchemaVersion::PublicUrl => self.public_url_row(&rec, kind_hint),
            SchemaVersion::LocalDraft => self.local_draft(&rec),
            SchemaVersion::VideoRow => self.video_row(&rec),
        }
    }

    /// Normalize every record, setting malformed ones aside instead of failing.
    pub fn normalize_batch<I>(&self, kind_hint: Option<MediaKind>, records: I) -> NormalizedBatch
    where
        I: IntoIterator<Item = Value>,
    {
        let mut batch = NormalizedBatch::default();
        for raw in records {
            match self.normalize_as(kind_hint, &raw) {
                Ok(entity) => batch.entities.push(entity),
                Err(malformed) => {
                    warn!(error = %malformed, "quarantined malformed record");
                    batch.quarantined.push(malformed);
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests;
