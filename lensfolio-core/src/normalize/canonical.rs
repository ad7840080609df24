//! Writing entities back out in the canonical shape

use serde_json::{json, Map, Value};

use super::schema::CANONICAL_SCHEMA;
use crate::model::{Entity, FieldPatch};

/// Canonical record for `entity`; `normalize` reads it back unchanged.
pub fn denormalize(entity: &Entity) -> Value {
    json!({
        "schema": CANONICAL_SCHEMA,
        "id": entity.id,
        "kind": entity.kind,
        "title": entity.title,
        "description": entity.description,
        "category": entity.category.slug(),
        "tags": entity.tags,
        "media": entity.media,
        "width": entity.media_info.width,
        "height": entity.media_info.height,
        "mime_type": entity.media_info.mime_type,
        "file_size": entity.media_info.file_size,
        "owner_id": entity.owner,
        "likes": entity.likes,
        "is_liked": entity.is_liked,
        "reactions": entity.reactions,
        "user_reaction": entity.user_reaction,
        "comments": entity.comments,
        "created_at": entity.created_at.to_rfc3339(),
    })
}

/// Row for an insert: canonical shape minus the id the remote assigns.
pub fn insert_record(entity: &Entity) -> Value {
    let mut record = denormalize(entity);
    if let Some(fields) = record.as_object_mut() {
        fields.remove("id");
    }
    record
}

/// Partial row carrying only the fields `patch` writes.
///
/// Comment appends send the entity's whole comment list; the remote column
/// holds the list, not individual comments.
pub fn patch_row(patch: &FieldPatch, entity: &Entity) -> Value {
    let full = denormalize(entity);
    let mut row = Map::new();
    for field in patch.fields() {
        if let Some(value) = full.get(field) {
            row.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(row)
}
