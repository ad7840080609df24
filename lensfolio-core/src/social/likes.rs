use crate::model::{Entity, FieldPatch};

/// Patch flipping the viewer's like; the shared counter moves with the flag.
pub fn like_patch(entity: &Entity) -> FieldPatch {
    let (likes, is_liked) = if entity.is_liked {
        (entity.likes.saturating_sub(1), false)
    } else {
        (entity.likes + 1, true)
    };
    FieldPatch {
        likes: Some(likes),
        is_liked: Some(is_liked),
        ..FieldPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityId;
    use crate::model::{Category, EntityDraft, MediaRef, VideoCategory};
    use chrono::Utc;

    #[test]
    fn test_like_then_unlike() {
        let mut entity = Entity::from_draft(
            EntityId::from("7"),
            &EntityDraft::video("Tram 28", Category::Video(VideoCategory::Lisboa)),
            MediaRef::external("https://vimeo.com/123456"),
            None,
            Utc::now(),
        );
        entity.likes = 4;

        like_patch(&entity).apply(&mut entity);
        assert_eq!((entity.likes, entity.is_liked), (5, true));

        like_patch(&entity).apply(&mut entity);
        assert_eq!((entity.likes, entity.is_liked), (4, false));
    }

    #[test]
    fn test_unlike_never_underflows() {
        let mut entity = Entity::from_draft(
            EntityId::from("7"),
            &EntityDraft::video("Tram 28", Category::Video(VideoCategory::Lisboa)),
            MediaRef::external("https://vimeo.com/123456"),
            None,
            Utc::now(),
        );
        entity.is_liked = true;
        let patch = like_patch(&entity);
        assert_eq!(patch.likes, Some(0));
        assert_eq!(patch.is_liked, Some(false));
    }
}
