//! Linked-video classification

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .unwrap_or_else(|e| panic!("invalid youtube pattern: {e}"))
});

const YOUTUBE_ID_LEN: usize = 11;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    Youtube,
    Vimeo,
    /// A plain file URL, including our own uploads
    #[default]
    #[serde(alias = "upload")]
    Direct,
}

impl VideoProvider {
    pub fn detect(url: &str) -> Self {
        if url.contains("youtube.com") || url.contains("youtu.be") {
            VideoProvider::Youtube
        } else if url.contains("vimeo.com") {
            VideoProvider::Vimeo
        } else {
            VideoProvider::Direct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoProvider::Youtube => "youtube",
            VideoProvider::Vimeo => "vimeo",
            VideoProvider::Direct => "direct",
        }
    }

    /// Parse a stored provider tag; legacy rows call uploads "upload".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "youtube" => Some(VideoProvider::Youtube),
            "vimeo" => Some(VideoProvider::Vimeo),
            "direct" | "upload" => Some(VideoProvider::Direct),
            _ => None,
        }
    }
}

/// A classified video URL with its embed and thumbnail derivatives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoLink {
    pub url: String,
    pub provider: VideoProvider,
    /// YouTube video id, when one could be extracted
    pub video_id: Option<String>,
}

impl VideoLink {
    pub fn classify(url: &str) -> Self {
        let url = url.trim().to_string();
        let provider = VideoProvider::detect(&url);
        let video_id = match provider {
            VideoProvider::Youtube => youtube_id(&url),
            VideoProvider::Vimeo => url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string),
            VideoProvider::Direct => None,
        };
        Self {
            url,
            provider,
            video_id,
        }
    }

    pub fn thumbnail_url(&self) -> Option<String> {
        match (self.provider, &self.video_id) {
            (VideoProvider::Youtube, Some(id)) => {
                Some(format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id))
            }
            _ => None,
        }
    }

    /// URL suitable for an embedded player.
    pub fn embed_url(&self) -> String {
        match (self.provider, &self.video_id) {
            (VideoProvider::Youtube, Some(id)) => format!("https://www.youtube.com/embed/{}", id),
            (VideoProvider::Vimeo, Some(id)) => format!("https://player.vimeo.com/video/{}", id),
            _ => self.url.clone(),
        }
    }
}

fn youtube_id(url: &str) -> Option<String> {
    let caps = YOUTUBE_ID.captures(url)?;
    let id = caps.get(2)?.as_str();
    (id.len() == YOUTUBE_ID_LEN).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_forms() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        ] {
            let link = VideoLink::classify(url);
            assert_eq!(link.provider, VideoProvider::Youtube, "{url}");
            assert_eq!(link.video_id.as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
    }

    #[test]
    fn test_youtube_thumbnail() {
        let link = VideoLink::classify("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            link.thumbnail_url().as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg")
        );
    }

    #[test]
    fn test_short_youtube_id_rejected() {
        let link = VideoLink::classify("https://youtu.be/abc");
        assert_eq!(link.provider, VideoProvider::Youtube);
        assert_eq!(link.video_id, None);
        assert_eq!(link.embed_url(), "https://youtu.be/abc");
    }

    #[test]
    fn test_vimeo_and_direct() {
        let vimeo = VideoLink::classify("https://vimeo.com/76979871");
        assert_eq!(vimeo.embed_url(), "https://player.vimeo.com/video/76979871");

        let direct = VideoLink::classify("https://cdn.example.com/clip.mp4");
        assert_eq!(direct.provider, VideoProvider::Direct);
        assert_eq!(direct.thumbnail_url(), None);
        assert_eq!(VideoProvider::parse("upload"), Some(VideoProvider::Direct));
    }
}
