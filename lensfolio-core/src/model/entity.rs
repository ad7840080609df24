//! The catalog entity: one photo or video with its social state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Comment, EntityDraft, MediaKind, MediaRef, ReactionKind, Reactions};
use crate::ids::{EntityId, PrincipalId};

/// Tag list in insertion order with duplicates dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag; blank or repeated tags are ignored.
    pub fn insert(&mut self, tag: impl AsRef<str>) -> bool {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl From<Vec<String>> for Tags {
    fn from(raw: Vec<String>) -> Self {
        raw.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

/// File facts recorded at upload. Linked media and older rows have none.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

impl MediaInfo {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    /// Layout size, falling back to `default` when the file was never measured.
    pub fn display_size(&self, default: (u32, u32)) -> (u32, u32) {
        self.dimensions().unwrap_or(default)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: MediaKind,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tags: Tags,
    pub media: MediaRef,
    #[serde(default)]
    pub media_info: MediaInfo,
    pub owner: Option<PrincipalId>,
    pub likes: u64,
    /// Local viewer flag, not a per-user ledger
    pub is_liked: bool,
    pub reactions: Reactions,
    pub user_reaction: Option<ReactionKind>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn from_draft(
        id: EntityId,
        draft: &EntityDraft,
        media: MediaRef,
        owner: Option<PrincipalId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: draft.kind,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            category: draft.category.clone(),
            tags: draft.tags.iter().collect(),
            media,
            media_info: MediaInfo::default(),
            owner,
            likes: 0,
            is_liked: false,
            reactions: Reactions::default(),
            user_reaction: None,
            comments: Vec::new(),
            created_at,
        }
    }

    /// The user-authored part of the entity, as it was drafted.
    pub fn draft(&self) -> EntityDraft {
        EntityDraft {
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tags: self.tags.iter().cloned().collect(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        !self.id.is_temporary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_dedupe_in_insertion_order() {
        let tags: Tags = ["sunset", "sea", "sunset", "  ", "sky"].into_iter().collect();
        assert_eq!(tags.as_slice(), &["sunset", "sea", "sky"]);
    }

    #[test]
    fn test_display_size_needs_both_dimensions() {
        let measured = MediaInfo {
            width: Some(4000),
            height: Some(3000),
            ..MediaInfo::default()
        };
        assert_eq!(measured.display_size((400, 600)), (4000, 3000));

        let partial = MediaInfo {
            width: Some(4000),
            ..MediaInfo::default()
        };
        assert_eq!(partial.dimensions(), None);
        assert_eq!(partial.display_size((400, 600)), (400, 600));
    }

    #[test]
    fn test_tags_deserialize_dedupes() {
        let tags: Tags = serde_json::from_str(r#"["a","b","a"]"#).unwrap();
        assert_eq!(tags.len(), 2);
    }
}
