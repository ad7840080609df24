//! User input for a new entity

use serde::{Deserialize, Serialize};

use super::{Category, MediaInfo, MediaKind};
use crate::error::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDraft {
    pub kind: MediaKind,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
}

impl EntityDraft {
    pub fn photo(title: impl Into<String>, category: Category) -> Self {
        Self {
            kind: MediaKind::Photo,
            title: title.into(),
            description: String::new(),
            category,
            tags: Vec::new(),
        }
    }

    pub fn video(title: impl Into<String>, category: Category) -> Self {
        Self {
            kind: MediaKind::Video,
            ..Self::photo(title, category)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title", "must not be empty"));
        }
        validate_category(self.kind, &self.category)
    }
}

/// New writes must use a category from the active set of their kind.
pub(crate) fn validate_category(kind: MediaKind, category: &Category) -> Result<(), ValidationError> {
    match category.kind() {
        Some(k) if k == kind => Ok(()),
        Some(k) => Err(ValidationError::new(
            "category",
            format!("'{}' is a {} category, not a {} one", category, k, kind),
        )),
        None => Err(ValidationError::new(
            "category",
            format!("'{}' is not a known {} category", category, kind),
        )),
    }
}

/// Raw bytes picked by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
    /// Pixel width and height, when the caller measured them
    pub dimensions: Option<(u32, u32)>,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name: None,
            dimensions: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn media_info(&self) -> MediaInfo {
        MediaInfo {
            width: self.dimensions.map(|(w, _)| w),
            height: self.dimensions.map(|(_, h)| h),
            mime_type: Some(self.content_type.clone()),
            file_size: Some(self.bytes.len() as u64),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaSource {
    /// Upload these bytes to remote storage
    Upload(MediaBlob),
    /// Reference media hosted elsewhere (YouTube, Vimeo, a direct file URL)
    Link(String),
}

impl MediaSource {
    pub fn validate(&self, kind: MediaKind) -> Result<(), ValidationError> {
        match self {
            MediaSource::Upload(blob) => {
                if blob.bytes.is_empty() {
                    return Err(ValidationError::new("media", "file is empty"));
                }
                let expected = match kind {
                    MediaKind::Photo => "image/",
                    MediaKind::Video => "video/",
                };
                if !blob.content_type.starts_with(expected) {
                    return Err(ValidationError::new(
                        "media",
                        format!("content type '{}' is not a {}", blob.content_type, kind),
                    ));
                }
                Ok(())
            }
            MediaSource::Link(url) => {
                let url = url.trim();
                if url.starts_with("https://") || url.starts_with("http://") {
                    Ok(())
                } else {
                    Err(ValidationError::new("media", "link must be an http(s) URL"))
                }
            }
        }
    }
}

/// Everything needed to resubmit a create that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryableCreate {
    pub draft: EntityDraft,
    pub media: MediaSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhotoCategory, VideoCategory};

    #[test]
    fn test_blank_title_rejected() {
        let draft = EntityDraft::photo("   ", Category::Photo(PhotoCategory::Urban));
        assert_eq!(draft.validate().unwrap_err().field, "title");
    }

    #[test]
    fn test_category_must_match_kind() {
        let draft = EntityDraft::photo("Alhambra", Category::Video(VideoCategory::Granada));
        assert_eq!(draft.validate().unwrap_err().field, "category");

        let draft = EntityDraft::photo("Alhambra", Category::Unrecognized("macro".into()));
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_media_validation() {
        let ok = MediaSource::Upload(MediaBlob::new(vec![1, 2], "image/jpeg"));
        assert!(ok.validate(MediaKind::Photo).is_ok());
        assert!(ok.validate(MediaKind::Video).is_err());
        assert!(MediaSource::Upload(MediaBlob::new(vec![], "image/jpeg"))
            .validate(MediaKind::Photo)
            .is_err());
        assert!(MediaSource::Link("ftp://x".into()).validate(MediaKind::Video).is_err());
    }
}
