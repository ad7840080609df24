//! Where an entity's bytes live

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ids::PrincipalId;
use crate::storage::types::BlobHash;
use crate::video::VideoProvider;

/// Marker in Supabase-style public object URLs, used to recover the stored
/// path from legacy rows that only kept the public URL.
const PUBLIC_OBJECT_MARKER: &str = "/storage/v1/object/public/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of an object in remote blob storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurableRef {
    pub bucket: String,
    pub path: String,
}

impl DurableRef {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// Recover `bucket/path` from a public object URL.
    pub fn from_public_url(url: &str) -> Option<Self> {
        let (_, rest) = url.split_once(PUBLIC_OBJECT_MARKER)?;
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        let (bucket, path) = rest.split_once('/')?;
        if bucket.is_empty() || path.is_empty() {
            return None;
        }
        let path = urlencoding::decode(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.to_string());
        Some(Self::new(bucket, path))
    }
}

impl fmt::Display for DurableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.path)
    }
}

/// Exactly one media reference per entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaRef {
    /// Object owned by this entity in remote storage
    Stored(DurableRef),
    /// Linked media hosted elsewhere; never deleted with the entity
    External { url: String, provider: VideoProvider },
    /// Optimistic preview held in the local blob store until upload confirms
    Local { hash: BlobHash, content_type: String },
}

impl MediaRef {
    /// The remote object this entity owns exclusively, if any.
    pub fn durable(&self) -> Option<&DurableRef> {
        match self {
            MediaRef::Stored(durable) => Some(durable),
            _ => None,
        }
    }

    pub fn local_hash(&self) -> Option<&BlobHash> {
        match self {
            MediaRef::Local { hash, .. } => Some(hash),
            _ => None,
        }
    }

    pub fn external(url: impl Into<String>) -> Self {
        let url = url.into();
        let provider = VideoProvider::detect(&url);
        MediaRef::External { url, provider }
    }
}

/// File extension for an upload: from the file name, else the MIME subtype.
pub fn upload_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    let from_type = content_type
        .split_once('/')
        .map(|(_, sub)| sub.split(';').next().unwrap_or(sub).trim())
        .filter(|sub| !sub.is_empty());
    from_name
        .or(from_type)
        .unwrap_or("jpg")
        .to_ascii_lowercase()
}

/// Object path for a fresh upload.
///
/// Photos live under the owner's prefix, videos in one shared folder.
pub fn storage_path(kind: MediaKind, owner: &PrincipalId, extension: &str) -> String {
    let name = Uuid::new_v4();
    match kind {
        MediaKind::Photo => format!("users/{}/{}.{}", owner, name, extension),
        MediaKind::Video => format!("videos/{}.{}", name, extension),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_from_public_url() {
        let url = "https://abc.supabase.co/storage/v1/object/public/photos/users/u1/a%20b.jpg";
        let durable = DurableRef::from_public_url(url).unwrap();
        assert_eq!(durable.bucket, "photos");
        assert_eq!(durable.path, "users/u1/a b.jpg");

        assert!(DurableRef::from_public_url("https://cdn.example.com/x.jpg").is_none());
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension(Some("IMG_001.JPG"), "image/jpeg"), "jpg");
        assert_eq!(upload_extension(None, "image/png"), "png");
        assert_eq!(upload_extension(Some("noext"), "video/mp4"), "mp4");
        assert_eq!(upload_extension(None, ""), "jpg");
    }

    #[test]
    fn test_storage_path_layout() {
        let owner = PrincipalId::from_string("u1");
        let photo = storage_path(MediaKind::Photo, &owner, "jpg");
        assert!(photo.starts_with("users/u1/") && photo.ends_with(".jpg"));
        let video = storage_path(MediaKind::Video, &owner, "mp4");
        assert!(video.starts_with("videos/") && video.ends_with(".mp4"));
    }
}
