//! Partial field updates
//!
//! A patch records the values it writes. The same patch is used to apply the
//! optimistic change, to overlay in-flight changes on refreshed records, and
//! to revert when the remote rejects it.

use serde::{Deserialize, Deserializer, Serialize};

use super::draft::validate_category;
use super::{Category, Comment, Entity, MediaKind, ReactionKind, Reactions, Tags};
use crate::error::ValidationError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    /// `Some(None)` clears the viewer's reaction
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub user_reaction: Option<Option<ReactionKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_comment: Option<Comment>,
}

fn present_or_null<'de, D>(de: D) -> Result<Option<Option<ReactionKind>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ReactionKind>::deserialize(de).map(Some)
}

impl FieldPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Names of the fields this patch writes, in canonical row naming.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.category.is_some() {
            fields.push("category");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        if self.likes.is_some() {
            fields.push("likes");
        }
        if self.is_liked.is_some() {
            fields.push("is_liked");
        }
        if self.reactions.is_some() {
            fields.push("reactions");
        }
        if self.user_reaction.is_some() {
            fields.push("user_reaction");
        }
        if self.append_comment.is_some() {
            fields.push("comments");
        }
        fields
    }

    /// Owner-restricted fields. Social fields are open to every viewer.
    pub fn touches_content(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.category.is_some()
            || self.tags.is_some()
    }

    pub fn validate(&self, kind: MediaKind) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("patch", "no fields to update"));
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::new("title", "must not be empty"));
            }
        }
        if let Some(category) = &self.category {
            validate_category(kind, category)?;
        }
        if let Some(comment) = &self.append_comment {
            if comment.author.trim().is_empty() || comment.content.trim().is_empty() {
                return Err(ValidationError::new("comment", "author and text are required"));
            }
        }
        Ok(())
    }

    pub fn apply(&self, entity: &mut Entity) {
        if let Some(title) = &self.title {
            entity.title = title.clone();
        }
        if let Some(description) = &self.description {
            entity.description = description.clone();
        }
        if let Some(category) = &self.category {
            entity.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            entity.tags = tags.clone();
        }
        if let Some(likes) = self.likes {
            entity.likes = likes;
        }
        if let Some(is_liked) = self.is_liked {
            entity.is_liked = is_liked;
        }
        if let Some(reactions) = self.reactions {
            entity.reactions = reactions;
        }
        if let Some(user_reaction) = self.user_reaction {
            entity.user_reaction = user_reaction;
        }
        if let Some(comment) = &self.append_comment {
            if !entity.comments.iter().any(|c| c.id == comment.id) {
                entity.comments.push(comment.clone());
            }
        }
    }

    /// The values `entity` holds now for every field this patch writes.
    pub fn capture(&self, entity: &Entity) -> FieldPatch {
        FieldPatch {
            title: self.title.as_ref().map(|_| entity.title.clone()),
            description: self.description.as_ref().map(|_| entity.description.clone()),
            category: self.category.as_ref().map(|_| entity.category.clone()),
            tags: self.tags.as_ref().map(|_| entity.tags.clone()),
            likes: self.likes.map(|_| entity.likes),
            is_liked: self.is_liked.map(|_| entity.is_liked),
            reactions: self.reactions.map(|_| entity.reactions),
            user_reaction: self.user_reaction.map(|_| entity.user_reaction),
            append_comment: None,
        }
    }

    /// Undo this patch on `entity`, restoring `previous`.
    ///
    /// A field is restored only while it still holds the value this patch
    /// wrote; a later write wins. An appended comment is removed by id.
    /// Returns the names of the fields that were restored.
    pub fn revert(&self, previous: &FieldPatch, entity: &mut Entity) -> Vec<&'static str> {
        let mut restored = Vec::new();

        macro_rules! restore {
            ($field:ident, $name:literal) => {
                if let (Some(written), Some(before)) = (&self.$field, &previous.$field) {
                    if entity.$field == *written {
                        entity.$field = before.clone();
                        restored.push($name);
                    }
                }
            };
        }

        restore!(title, "title");
        restore!(description, "description");
        restore!(category, "category");
        restore!(tags, "tags");
        restore!(likes, "likes");
        restore!(is_liked, "is_liked");
        restore!(reactions, "reactions");
        restore!(user_reaction, "user_reaction");

        if let Some(comment) = &self.append_comment {
            let before = entity.comments.len();
            entity.comments.retain(|c| c.id != comment.id);
            if entity.comments.len() != before {
                restored.push("comments");
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CommentId, EntityId};
    use crate::model::{EntityDraft, MediaRef, PhotoCategory};
    use chrono::Utc;

    fn entity() -> Entity {
        Entity::from_draft(
            EntityId::from_string("1"),
            &EntityDraft::photo("Old", Category::Photo(PhotoCategory::Urban)),
            MediaRef::external("https://cdn.example.com/a.jpg"),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_revert_restores_only_written_values() {
        let mut e = entity();
        let patch = FieldPatch {
            title: Some("New".into()),
            likes: Some(3),
            ..Default::default()
        };
        let previous = patch.capture(&e);
        patch.apply(&mut e);

        // A later local write to likes must survive the revert
        e.likes = 4;
        let restored = patch.revert(&previous, &mut e);

        assert_eq!(restored, vec!["title"]);
        assert_eq!(e.title, "Old");
        assert_eq!(e.likes, 4);
    }

    #[test]
    fn test_revert_removes_appended_comment_by_id() {
        let mut e = entity();
        let keep = Comment {
            id: CommentId::new(),
            author: "ana".into(),
            avatar: None,
            content: "first".into(),
            timestamp: Utc::now(),
        };
        let appended = Comment {
            id: CommentId::new(),
            author: "luis".into(),
            avatar: None,
            content: "second".into(),
            timestamp: Utc::now(),
        };
        let patch = FieldPatch {
            append_comment: Some(appended),
            ..Default::default()
        };
        let previous = patch.capture(&e);
        patch.apply(&mut e);
        e.comments.push(keep.clone());

        patch.revert(&previous, &mut e);
        assert_eq!(e.comments, vec![keep]);
    }

    #[test]
    fn test_clearing_reaction_survives_serde() {
        let patch = FieldPatch {
            user_reaction: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        let back: FieldPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_reaction, Some(None));
        assert_eq!(
            serde_json::from_str::<FieldPatch>("{}").unwrap().user_reaction,
            None
        );
    }

    #[test]
    fn test_validate() {
        assert!(FieldPatch::default().validate(MediaKind::Photo).is_err());
        assert!(FieldPatch::title(" ").validate(MediaKind::Photo).is_err());
        let patch = FieldPatch {
            category: Some(Category::Photo(PhotoCategory::Wildlife)),
            ..Default::default()
        };
        assert!(patch.validate(MediaKind::Photo).is_ok());
        assert!(patch.validate(MediaKind::Video).is_err());
        assert!(patch.touches_content());
    }
}
