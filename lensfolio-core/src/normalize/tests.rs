use super::*;
use crate::ids::{CommentId, EntityId, PrincipalId};
use crate::model::{
    Category, Comment, DurableRef, EntityDraft, FieldPatch, MediaInfo, MediaRef, PhotoCategory,
    ReactionKind, VideoCategory,
};
use crate::storage::types::BlobHash;
use crate::video::VideoProvider;
use chrono::{TimeZone, Utc};
use serde_json::json;

// ============================================================================
// Historical shapes
// ============================================================================

#[test]
fn test_storage_path_row() {
    let raw = json!({
        "id": 17,
        "filename": "a1b2.jpg",
        "original_name": "DSC_0042.jpg",
        "category": "aviation",
        "storage_path": "users/u1/a1b2.jpg",
        "mime_type": "image/jpeg",
        "width": 4000,
        "height": 3000,
        "created_at": "2024-03-01T10:00:00+00:00"
    });
    let e = Normalizer::default().normalize(&raw).unwrap();

    assert_eq!(e.id, EntityId::from_string("17"));
    assert_eq!(e.title, "DSC_0042.jpg");
    assert_eq!(e.category, Category::Photo(PhotoCategory::Aviation));
    assert_eq!(
        e.media,
        MediaRef::Stored(DurableRef::new("photos", "users/u1/a1b2.jpg"))
    );
    assert!(e.tags.is_empty());
    assert_eq!(e.likes, 0);
    assert_eq!(e.reactions.total(), 0);
    assert_eq!(e.media_info.dimensions(), Some((4000, 3000)));
    assert_eq!(e.media_info.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(e.media_info.file_size, None);
}

#[test]
fn test_public_url_row_recovers_stored_path() {
    let raw = json!({
        "id": "9",
        "title": "Giralda",
        "description": "",
        "category": "urbana",
        "tags": ["sevilla", "torre"],
        "image_url": "https://abc.supabase.co/storage/v1/object/public/photos/users/u1/x.jpg",
        "user_id": "u1"
    });
    let e = Normalizer::default().normalize(&raw).unwrap();

    assert_eq!(e.category, Category::Photo(PhotoCategory::Urban));
    assert_eq!(e.owner, Some(PrincipalId::from_string("u1")));
    assert_eq!(e.media.durable(), Some(&DurableRef::new("photos", "users/u1/x.jpg")));
    assert_eq!(e.tags.as_slice(), &["sevilla", "torre"]);
}

#[test]
fn test_local_draft_shape() {
    let raw = json!({
        "id": "1700000000000",
        "title": "Paso de palio",
        "description": "Madrugá",
        "category": "semana-santa",
        "likes": 5,
        "isLiked": true,
        "comments": [{"id": 1, "author": "Ana", "text": "Precioso", "timestamp": "ahora"}],
        "timestamp": "ahora",
        "tags": ["sevilla"],
        "reactions": {"heart": 2, "fire": 1},
        "userReaction": "fire",
        "imageUrl": "/placeholder.jpg"
    });
    let e = Normalizer::default().normalize(&raw).unwrap();

    assert_eq!(e.likes, 5);
    assert!(e.is_liked);
    assert_eq!(e.user_reaction, Some(ReactionKind::Fire));
    assert_eq!(e.reactions.heart, 2);
    assert_eq!(e.reactions.love, 0);
    // Unparseable timestamps fall back to the millisecond id
    assert_eq!(e.created_at, Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
    assert_eq!(e.comments.len(), 1);
    assert_eq!(e.comments[0].content, "Precioso");
    assert_eq!(e.comments[0].timestamp, e.created_at);
    assert!(matches!(e.media, MediaRef::External { .. }));
}

#[test]
fn test_video_row() {
    let raw = json!({
        "id": 3,
        "title": "Albaicín",
        "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "video_type": "youtube",
        "thumbnail_url": "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
        "category": "granada",
        "created_at": "2024-05-05T12:00:00Z"
    });
    let e = Normalizer::default().normalize(&raw).unwrap();

    assert_eq!(e.kind, MediaKind::Video);
    assert_eq!(e.category, Category::Video(VideoCategory::Granada));
    assert_eq!(
        e.media,
        MediaRef::External {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            provider: VideoProvider::Youtube,
        }
    );
}

#[test]
fn test_uploaded_video_row_is_stored() {
    let raw = json!({
        "id": 4,
        "title": "Tranvía 28",
        "url": "https://abc.supabase.co/storage/v1/object/public/videos/videos/t.mp4",
        "video_type": "upload"
    });
    let e = Normalizer::default()
        .normalize_as(Some(MediaKind::Video), &raw)
        .unwrap();
    assert_eq!(e.media.durable(), Some(&DurableRef::new("videos", "videos/t.mp4")));
    // No category at all lands in the fallback bucket
    assert_eq!(e.category, Category::Unrecognized(String::new()));
}

// ============================================================================
// Media aliases and failure
// ============================================================================

#[test]
fn test_alias_prefers_non_null() {
    let raw = json!({"id": 1, "title": "t", "image_url": null, "imageUrl": "https://cdn.example.com/b.jpg"});
    let e = Normalizer::default().normalize(&raw).unwrap();
    assert_eq!(e.media, MediaRef::external("https://cdn.example.com/b.jpg"));
}

#[test]
fn test_alias_conflict_keeps_snake_case() {
    let raw = json!({
        "id": 1,
        "title": "t",
        "image_url": "https://cdn.example.com/a.jpg",
        "imageUrl": "https://cdn.example.com/b.jpg"
    });
    let e = Normalizer::default().normalize(&raw).unwrap();
    assert_eq!(e.media, MediaRef::external("https://cdn.example.com/a.jpg"));
}

#[test]
fn test_missing_media_is_malformed_without_placeholder() {
    let raw = json!({"id": 1, "title": "no media"});
    let err = Normalizer::default().normalize(&raw).unwrap_err();
    assert_eq!(err.record_id.as_deref(), Some("1"));

    let e = Normalizer::default()
        .with_placeholder(Some("/placeholder.svg".into()))
        .normalize(&raw)
        .unwrap();
    assert_eq!(e.media, MediaRef::external("/placeholder.svg"));
}

#[test]
fn test_unrecognized_category_still_loads() {
    let raw = json!({"id": 1, "title": "t", "category": "macro", "image_url": "https://x.test/a.jpg"});
    let e = Normalizer::default().normalize(&raw).unwrap();
    assert_eq!(e.category, Category::Unrecognized("macro".into()));
}

#[test]
fn test_batch_quarantines_without_aborting() {
    let records = vec![
        json!({"id": 1, "title": "ok", "image_url": "https://x.test/1.jpg"}),
        json!({"id": 2, "title": "broken"}),
        json!("not an object"),
        json!({"id": 3, "title": "ok too", "imageUrl": "https://x.test/3.jpg"}),
    ];
    let batch = Normalizer::default().normalize_batch(None, records);
    assert_eq!(batch.entities.len(), 2);
    assert_eq!(batch.quarantined.len(), 2);
}

// ============================================================================
// Canonical round trip
// ============================================================================

fn rich_entity() -> Entity {
    let mut e = Entity::from_draft(
        EntityId::from_string("42"),
        &EntityDraft::photo("Sunset", Category::Photo(PhotoCategory::Landscapes))
            .with_description("Over the Atlantic")
            .with_tags(["sea", "sun"]),
        MediaRef::Stored(DurableRef::new("photos", "users/u1/s.jpg")),
        Some(PrincipalId::from_string("u1")),
        Utc.with_ymd_and_hms(2024, 6, 1, 20, 15, 0).unwrap(),
    );
    e.media_info = MediaInfo {
        width: Some(4000),
        height: Some(2250),
        mime_type: Some("image/jpeg".into()),
        file_size: Some(2_480_113),
    };
    e.likes = 3;
    e.is_liked = true;
    e.reactions.love = 2;
    e.user_reaction = Some(ReactionKind::Love);
    e.comments.push(Comment {
        id: CommentId::from_string("c-1"),
        author: "Ana".into(),
        avatar: Some("https://cdn.example.com/ana.png".into()),
        content: "Wow".into(),
        timestamp: Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap(),
    });
    e
}

#[test]
fn test_denormalize_roundtrip() {
    let normalizer = Normalizer::default();
    let e = rich_entity();
    assert_eq!(normalizer.normalize(&denormalize(&e)).unwrap(), e);
}

#[test]
fn test_roundtrip_preserves_local_and_unrecognized() {
    let normalizer = Normalizer::default();
    let mut e = rich_entity();
    e.id = EntityId::temporary();
    e.category = Category::Unrecognized("macro".into());
    e.media = MediaRef::Local {
        hash: BlobHash::from_data(b"preview"),
        content_type: "image/png".into(),
    };
    e.owner = None;
    assert_eq!(normalizer.normalize(&denormalize(&e)).unwrap(), e);
}

#[test]
fn test_patch_row_only_carries_written_fields() {
    let e = rich_entity();
    let patch = FieldPatch {
        likes: Some(3),
        is_liked: Some(true),
        ..Default::default()
    };
    let row = patch_row(&patch, &e);
    let keys: Vec<_> = row.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(row["likes"], json!(3));

    let record = insert_record(&e);
    assert!(record.get("id").is_none());
    assert_eq!(record["schema"], json!(CANONICAL_SCHEMA));
}
