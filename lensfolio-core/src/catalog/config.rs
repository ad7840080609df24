use ::config::{AnonymousMode, OwnershipMode, Settings};
use std::time::Duration;

use crate::model::{AnonymousPolicy, MediaKind, OwnershipPolicy};

/// Engine knobs, usually built from [`Settings`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on every remote call; expiry is handled like a network failure
    pub remote_timeout: Duration,
    pub photo_bucket: String,
    pub video_bucket: String,
    pub photo_table: String,
    pub video_table: String,
    pub ownership: OwnershipPolicy,
    pub anonymous: AnonymousPolicy,
    pub synthetic_pagination: bool,
    /// Total items a synthetic page sequence may yield
    pub synthetic_cap: usize,
    pub media_placeholder: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_secs(15),
            photo_bucket: "photos".to_string(),
            video_bucket: "videos".to_string(),
            photo_table: "photos".to_string(),
            video_table: "videos".to_string(),
            ownership: OwnershipPolicy::Strict,
            anonymous: AnonymousPolicy::LocalOnly,
            synthetic_pagination: true,
            synthetic_cap: 80,
            media_placeholder: None,
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let remote = &settings.remote;
        Self {
            remote_timeout: Duration::from_secs(remote.timeout_secs.max(1)),
            photo_bucket: remote.photo_bucket.clone(),
            video_bucket: remote.video_bucket.clone(),
            photo_table: remote.photo_table.clone(),
            video_table: remote.video_table.clone(),
            ownership: match settings.ownership {
                OwnershipMode::Strict => OwnershipPolicy::Strict,
                OwnershipMode::AllowUnowned => OwnershipPolicy::AllowUnowned,
            },
            anonymous: match settings.anonymous {
                AnonymousMode::LocalOnly => AnonymousPolicy::LocalOnly,
                AnonymousMode::Persist => AnonymousPolicy::Persist,
            },
            synthetic_pagination: settings.synthetic_pagination,
            synthetic_cap: settings.synthetic_cap,
            media_placeholder: settings.media_placeholder.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn bucket(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Photo => &self.photo_bucket,
            MediaKind::Video => &self.video_bucket,
        }
    }

    pub fn table(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Photo => &self.photo_table,
            MediaKind::Video => &self.video_table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.remote.video_table = "clips".to_string();
        settings.remote.timeout_secs = 3;
        settings.anonymous = AnonymousMode::Persist;

        let config = EngineConfig::from_settings(&settings);
        assert_eq!(config.remote_timeout, Duration::from_secs(3));
        assert_eq!(config.table(MediaKind::Video), "clips");
        assert_eq!(config.bucket(MediaKind::Photo), "photos");
        assert_eq!(config.anonymous, AnonymousPolicy::Persist);
        assert_eq!(config.ownership, OwnershipPolicy::Strict);
        assert_eq!(config.synthetic_cap, 80);
    }
}
