//! Historical record shapes

use serde_json::{Map, Value};
use std::fmt;

use crate::model::MediaKind;

/// Tag written into every canonical record
pub const CANONICAL_SCHEMA: &str = "lensfolio/v1";

/// The record shapes the catalog has been stored in over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// Upload rows keyed by object path: `filename`, `original_name`,
    /// `storage_path`, `mime_type`, `width`, `height`
    StoragePath,
    /// Rows holding a public URL: `image_url`, `user_id`
    PublicUrl,
    /// On-device drafts: camelCase `imageUrl`, `isLiked`, `userReaction`
    LocalDraft,
    /// Video rows: `url`, `video_type`, `thumbnail_url`
    VideoRow,
    /// Output of `denormalize`
    Canonical,
}

impl SchemaVersion {
    pub fn detect(record: &Map<String, Value>, kind_hint: Option<MediaKind>) -> Self {
        let has = |key: &str| record.get(key).is_some_and(|v| !v.is_null());

        if record.get("schema").and_then(Value::as_str) == Some(CANONICAL_SCHEMA) {
            SchemaVersion::Canonical
        } else if has("storage_path") {
            SchemaVersion::StoragePath
        } else if has("video_type")
            || has("thumbnail_url")
            || (kind_hint == Some(MediaKind::Video) && has("url"))
        {
            SchemaVersion::VideoRow
        } else if has("imageUrl") || has("isLiked") || has("userReaction") {
            SchemaVersion::LocalDraft
        } else {
            SchemaVersion::PublicUrl
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaVersion::StoragePath => "storage-path",
            SchemaVersion::PublicUrl => "public-url",
            SchemaVersion::LocalDraft => "local-draft",
            SchemaVersion::VideoRow => "video-row",
            SchemaVersion::Canonical => CANONICAL_SCHEMA,
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(v: Value, hint: Option<MediaKind>) -> SchemaVersion {
        SchemaVersion::detect(v.as_object().unwrap(), hint)
    }

    #[test]
    fn test_detection() {
        assert_eq!(
            detect(json!({"schema": "lensfolio/v1", "storage_path": "x"}), None),
            SchemaVersion::Canonical
        );
        assert_eq!(
            detect(json!({"id": 1, "storage_path": "users/a.jpg"}), None),
            SchemaVersion::StoragePath
        );
        assert_eq!(
            detect(json!({"id": 1, "url": "https://youtu.be/x"}), Some(MediaKind::Video)),
            SchemaVersion::VideoRow
        );
        assert_eq!(
            detect(json!({"id": "1", "imageUrl": "/a.jpg", "isLiked": false}), None),
            SchemaVersion::LocalDraft
        );
        assert_eq!(
            detect(json!({"id": 1, "image_url": "https://x/a.jpg"}), None),
            SchemaVersion::PublicUrl
        );
    }
}
