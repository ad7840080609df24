//! One adapter per schema version
//!
//! Adapters decide identity, kind and media for their shape. Everything the
//! shapes have in common (text, tags, social state, timestamps) is read by
//! `Normalizer::assemble`, which knows every historical spelling.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::record::{parse_time, Record};
use super::Normalizer;
use crate::error::MalformedEntity;
use crate::ids::{CommentId, EntityId, PrincipalId};
use crate::model::{
    Category, Comment, DurableRef, Entity, MediaInfo, MediaKind, MediaRef, ReactionKind,
    Reactions, Tags,
};
use crate::video::VideoProvider;

impl Normalizer {
    pub(super) fn canonical(&self, rec: &Record<'_>) -> Result<Entity, MalformedEntity> {
        let id = required_id(rec)?;
        let kind = rec
            .value("kind")
            .and_then(|v| serde_json::from_value::<MediaKind>(v.clone()).ok())
            .unwrap_or(MediaKind::Photo);
        let media = match rec.value("media") {
            Some(v) => serde_json::from_value::<MediaRef>(v.clone()).map_err(|e| {
                MalformedEntity::new(Some(id.to_string()), format!("unreadable media: {e}"))
            })?,
            None => self.placeholder_or_malformed(&id)?,
        };
        Ok(self.assemble(rec, id, kind, media))
    }

    pub(super) fn storage_path_row(&self, rec: &Record<'_>) -> Result<Entity, MalformedEntity> {
        let id = required_id(rec)?;
        let media = match rec.str("storage_path") {
            Some(path) => MediaRef::Stored(DurableRef::new(self.photo_bucket.as_str(), path)),
            None => self.url_media(rec, &id)?,
        };
        Ok(self.assemble(rec, id, MediaKind::Photo, media))
    }

    pub(super) fn public_url_row(
        &self,
        rec: &Record<'_>,
        kind_hint: Option<MediaKind>,
    ) -> Result<Entity, MalformedEntity> {
        let id = required_id(rec)?;
        let media = self.url_media(rec, &id)?;
        Ok(self.assemble(rec, id, kind_hint.unwrap_or(MediaKind::Photo), media))
    }

    pub(super) fn local_draft(&self, rec: &Record<'_>) -> Result<Entity, MalformedEntity> {
        let id = required_id(rec)?;
        let media = self.url_media(rec, &id)?;
        Ok(self.assemble(rec, id, MediaKind::Photo, media))
    }

    pub(super) fn video_row(&self, rec: &Record<'_>) -> Result<Entity, MalformedEntity> {
        let id = required_id(rec)?;
        let media = match rec.str("url") {
            Some(url) => {
                let declared = rec.str("video_type").and_then(VideoProvider::parse);
                match DurableRef::from_public_url(url) {
                    Some(durable) if declared != Some(VideoProvider::Youtube) => {
                        MediaRef::Stored(durable)
                    }
                    _ => MediaRef::External {
                        url: url.to_string(),
                        provider: declared.unwrap_or_else(|| VideoProvider::detect(url)),
                    },
                }
            }
            None => self.url_media(rec, &id)?,
        };
        Ok(self.assemble(rec, id, MediaKind::Video, media))
    }

    /// Media from the `image_url` / `imageUrl` aliases.
    fn url_media(&self, rec: &Record<'_>, id: &EntityId) -> Result<MediaRef, MalformedEntity> {
        let url = match (rec.str("image_url"), rec.str("imageUrl")) {
            (Some(snake), Some(camel)) if snake != camel => {
                warn!(
                    entity_id = %id,
                    image_url = snake,
                    camel_image_url = camel,
                    "media URL aliases disagree, keeping image_url"
                );
                Some(snake)
            }
            (Some(snake), _) => Some(snake),
            (None, camel) => camel,
        };
        match url {
            Some(url) => Ok(media_from_url(url)),
            None => self.placeholder_or_malformed(id),
        }
    }

    fn placeholder_or_malformed(&self, id: &EntityId) -> Result<MediaRef, MalformedEntity> {
        self.placeholder
            .as_deref()
            .map(MediaRef::external)
            .ok_or_else(|| MalformedEntity::new(Some(id.to_string()), "record has no media"))
    }

    /// Fields shared by every shape, under every spelling they have had.
    fn assemble(&self, rec: &Record<'_>, id: EntityId, kind: MediaKind, media: MediaRef) -> Entity {
        let created_at = rec
            .first_time(&["created_at", "createdAt", "timestamp"])
            .or_else(|| id.as_str().parse::<i64>().ok().and_then(crate::helper::from_millis))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let category = rec
            .first_str(&["category", "location"])
            .map(|raw| Category::parse(kind, raw))
            .unwrap_or_else(|| Category::Unrecognized(String::new()));

        let title = rec
            .value("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .or_else(|| rec.first_str(&["original_name", "filename"]))
            .unwrap_or_default()
            .to_string();

        let comments = rec
            .value("comments")
            .and_then(Value::as_array)
            .map(|items| read_comments(&id, items, created_at))
            .unwrap_or_default();

        Entity {
            kind,
            title,
            description: rec
                .value("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            category,
            tags: Tags::from(rec.tags("tags")),
            media,
            media_info: read_media_info(rec),
            owner: rec
                .first_str(&["owner_id", "user_id"])
                .map(PrincipalId::from_string),
            likes: rec.u64("likes").unwrap_or(0),
            is_liked: rec.bool("is_liked").or_else(|| rec.bool("isLiked")).unwrap_or(false),
            reactions: read_reactions(rec.value("reactions")),
            user_reaction: rec
                .first_str(&["user_reaction", "userReaction"])
                .and_then(ReactionKind::parse),
            comments,
            created_at,
            id,
        }
    }
}

fn required_id(rec: &Record<'_>) -> Result<EntityId, MalformedEntity> {
    rec.id("id")
        .map(EntityId::from_string)
        .ok_or_else(|| MalformedEntity::new(None, "record has no id"))
}

/// Public storage URLs become stored references so deletes can reach the object.
fn media_from_url(url: &str) -> MediaRef {
    DurableRef::from_public_url(url)
        .map(MediaRef::Stored)
        .unwrap_or_else(|| MediaRef::external(url))
}

fn read_media_info(rec: &Record<'_>) -> MediaInfo {
    let pixels = |key: &str| {
        rec.u64(key)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
    };
    MediaInfo {
        width: pixels("width"),
        height: pixels("height"),
        mime_type: rec.first_str(&["mime_type", "mimeType"]).map(str::to_string),
        file_size: rec.u64("file_size").or_else(|| rec.u64("fileSize")),
    }
}

fn read_reactions(value: Option<&Value>) -> Reactions {
    let mut reactions = Reactions::default();
    let Some(counts) = value.and_then(Value::as_object) else {
        return reactions;
    };
    for kind in ReactionKind::ALL {
        if let Some(n) = counts.get(kind.as_str()).and_then(Value::as_u64) {
            *reactions.get_mut(kind) = n;
        }
    }
    reactions
}

fn read_comments(entity: &EntityId, items: &[Value], fallback: DateTime<Utc>) -> Vec<Comment> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let c = Record(item.as_object()?);
            let content = c.first_str(&["content", "text"])?;
            Some(Comment {
                id: c
                    .id("id")
                    .map(CommentId::from_string)
                    .unwrap_or_else(|| CommentId::from_string(format!("{entity}-c{index}"))),
                author: c.str("author").unwrap_or("anonymous").to_string(),
                avatar: c.str("avatar").map(str::to_string),
                content: content.to_string(),
                timestamp: c.value("timestamp").and_then(parse_time).unwrap_or(fallback),
            })
        })
        .collect()
}
