//! Application settings management

use crate::{crypto, PathManager, ENV_ANON_KEY, ENV_REMOTE_URL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Who may edit or delete an entity that carries no owner id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OwnershipMode {
    /// Only the recorded owner may mutate; unowned entities are read-only
    #[default]
    Strict,
    /// Any signed-in principal may mutate entities without a recorded owner
    AllowUnowned,
}

/// What happens to reactions, likes and comments from a viewer with no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnonymousMode {
    /// Applied to the local view and cache, never sent to the remote service
    #[default]
    LocalOnly,
    /// Sent to the remote service like any other update
    Persist,
}

/// Connection details for the hosted storage/database service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Base URL, e.g. "https://xyz.supabase.co"
    pub base_url: Option<String>,
    /// Anonymous key, sealed with [`crate::encrypt_credential`]
    pub anon_key: Option<String>,
    pub photo_bucket: String,
    pub video_bucket: String,
    pub photo_table: String,
    pub video_table: String,
    /// Seconds before an unanswered remote call counts as failed
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            anon_key: None,
            photo_bucket: "photos".to_string(),
            video_bucket: "videos".to_string(),
            photo_table: "photos".to_string(),
            video_table: "videos".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Application settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Email used for password sign-in
    pub user_email: Option<String>,
    pub remote: RemoteSettings,
    /// Entities per "load more" page
    pub page_size: usize,
    /// Fill pages with demo recombinations when the remote holds no data
    pub synthetic_pagination: bool,
    /// Upper bound on the total number of items a synthetic sequence yields
    pub synthetic_cap: usize,
    /// Byte budget for the local cache; `None` means unbounded
    pub cache_quota_bytes: Option<u64>,
    /// URL rendered for records that reference no media at all
    pub media_placeholder: Option<String>,
    pub ownership: OwnershipMode,
    pub anonymous: AnonymousMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_email: None,
            remote: RemoteSettings::default(),
            page_size: 8,
            synthetic_pagination: true,
            synthetic_cap: 80,
            cache_quota_bytes: None,
            media_placeholder: None,
            ownership: OwnershipMode::default(),
            anonymous: AnonymousMode::default(),
        }
    }
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        match PathManager::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
    }

    /// Remote base URL, preferring the environment over the settings file.
    pub fn remote_url(&self) -> Option<String> {
        std::env::var(ENV_REMOTE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.remote.base_url.clone())
    }

    /// Decrypted anonymous key, preferring the environment over the settings file.
    /// Returns None if not set or decryption fails.
    pub fn anon_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(ENV_ANON_KEY) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        self.remote
            .anon_key
            .as_deref()
            .and_then(|sealed| crypto::decrypt_credential(sealed).ok())
    }

    /// Seal and store the anonymous key.
    pub fn set_anon_key(&mut self, key: &str) -> Result<(), String> {
        self.remote.anon_key = Some(crypto::encrypt_credential(key)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.page_size, 8);
        assert_eq!(settings.synthetic_cap, 80);
        assert_eq!(settings.remote.timeout_secs, 15);
        assert_eq!(settings.ownership, OwnershipMode::Strict);
        assert_eq!(settings.anonymous, AnonymousMode::LocalOnly);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            page_size = 12
            anonymous = "persist"

            [remote]
            base_url = "https://example.supabase.co"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.page_size, 12);
        assert_eq!(parsed.anonymous, AnonymousMode::Persist);
        assert_eq!(parsed.remote.photo_bucket, "photos");
        assert_eq!(parsed.remote.base_url.as_deref(), Some("https://example.supabase.co"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.user_email = Some("jrr@example.com".to_string());
        settings.ownership = OwnershipMode::AllowUnowned;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.user_email.as_deref(), Some("jrr@example.com"));
        assert_eq!(loaded.ownership, OwnershipMode::AllowUnowned);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("absent.toml"));
        assert_eq!(loaded.page_size, 8);
    }
}
