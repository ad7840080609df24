//! Gallery categories
//!
//! Each media kind has its own closed set. Legacy rows used Spanish slugs for
//! the photo galleries; those still parse as aliases. Anything else loads into
//! `Category::Unrecognized` so old or hand-edited rows stay visible.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::MediaKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhotoCategory {
    Landscapes,
    Urban,
    HolyWeek,
    Wildlife,
    Aviation,
}

impl PhotoCategory {
    pub const ALL: [PhotoCategory; 5] = [
        PhotoCategory::Landscapes,
        PhotoCategory::Urban,
        PhotoCategory::HolyWeek,
        PhotoCategory::Wildlife,
        PhotoCategory::Aviation,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            PhotoCategory::Landscapes => "landscapes",
            PhotoCategory::Urban => "urban",
            PhotoCategory::HolyWeek => "holy-week",
            PhotoCategory::Wildlife => "wildlife",
            PhotoCategory::Aviation => "aviation",
        }
    }

    fn legacy_slug(&self) -> &'static str {
        match self {
            PhotoCategory::Landscapes => "paisajes",
            PhotoCategory::Urban => "urbana",
            PhotoCategory::HolyWeek => "semana-santa",
            PhotoCategory::Wildlife => "fauna-flora",
            PhotoCategory::Aviation => "aviacion",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == raw || c.legacy_slug() == raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoCategory {
    Granada,
    Lisboa,
}

impl VideoCategory {
    pub const ALL: [VideoCategory; 2] = [VideoCategory::Granada, VideoCategory::Lisboa];

    pub fn slug(&self) -> &'static str {
        match self {
            VideoCategory::Granada => "granada",
            VideoCategory::Lisboa => "lisboa",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.slug() == raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Photo(PhotoCategory),
    Video(VideoCategory),
    /// Fallback bucket for slugs outside the active set; empty when the
    /// record carried no category at all.
    Unrecognized(String),
}

impl Category {
    /// Parse a slug against the category set of `kind`.
    pub fn parse(kind: MediaKind, raw: &str) -> Self {
        let recognized = match kind {
            MediaKind::Photo => PhotoCategory::parse(raw).map(Category::Photo),
            MediaKind::Video => VideoCategory::parse(raw).map(Category::Video),
        };
        recognized.unwrap_or_else(|| Category::Unrecognized(raw.trim().to_string()))
    }

    /// Parse a slug against every known set, for filters that span kinds.
    pub fn parse_any(raw: &str) -> Self {
        PhotoCategory::parse(raw)
            .map(Category::Photo)
            .or_else(|| VideoCategory::parse(raw).map(Category::Video))
            .unwrap_or_else(|| Category::Unrecognized(raw.trim().to_string()))
    }

    pub fn slug(&self) -> &str {
        match self {
            Category::Photo(c) => c.slug(),
            Category::Video(c) => c.slug(),
            Category::Unrecognized(raw) => raw,
        }
    }

    /// Media kind this category belongs to, if it is recognized.
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Category::Photo(_) => Some(MediaKind::Photo),
            Category::Video(_) => Some(MediaKind::Video),
            Category::Unrecognized(_) => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Category::Unrecognized(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(
            Category::parse(MediaKind::Photo, "semana-santa"),
            Category::Photo(PhotoCategory::HolyWeek)
        );
        assert_eq!(
            Category::parse(MediaKind::Photo, "Paisajes"),
            Category::Photo(PhotoCategory::Landscapes)
        );
    }

    #[test]
    fn test_kind_scoped_parse() {
        assert_eq!(
            Category::parse(MediaKind::Video, "granada"),
            Category::Video(VideoCategory::Granada)
        );
        assert_eq!(
            Category::parse(MediaKind::Video, "urban"),
            Category::Unrecognized("urban".to_string())
        );
        assert_eq!(
            Category::parse_any("lisboa"),
            Category::Video(VideoCategory::Lisboa)
        );
    }

    #[test]
    fn test_unrecognized_keeps_raw_slug() {
        let c = Category::parse(MediaKind::Photo, "macro");
        assert!(!c.is_recognized());
        assert_eq!(c.slug(), "macro");
        assert_eq!(c.kind(), None);
    }
}
