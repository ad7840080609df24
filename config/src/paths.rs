use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

const APP_DIR: &str = "lensfolio";

/// Filesystem layout for the local cache, blob previews, settings and logs.
pub struct PathManager;

impl PathManager {
    /// Set a custom data directory (tests, portable installs)
    pub fn set_data_dir(path: PathBuf) {
        let _ = DATA_DIR_OVERRIDE.set(path);
    }

    pub fn data_dir() -> Option<PathBuf> {
        if let Some(d) = DATA_DIR_OVERRIDE.get() {
            return Some(d.clone());
        }
        dirs::data_dir().map(|d| d.join(APP_DIR))
    }

    pub fn config_dir() -> Option<PathBuf> {
        if let Some(d) = DATA_DIR_OVERRIDE.get() {
            return Some(d.join("config"));
        }
        dirs::config_dir().map(|d| d.join(APP_DIR))
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.toml"))
    }

    /// SQLite file backing the local catalog cache and pending-mutation log
    pub fn cache_db_path() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("catalog.db"))
    }

    /// Root of the content-addressed store for optimistic media previews
    pub fn blob_dir() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("blobs"))
    }

    pub fn logs_dir() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("logs"))
    }

    pub fn log_file_path() -> Option<PathBuf> {
        Self::logs_dir().map(|d| d.join("lensfolio.log"))
    }

    pub fn ensure_dirs_exist() -> std::io::Result<()> {
        for dir in [Self::data_dir(), Self::config_dir(), Self::blob_dir(), Self::logs_dir()]
            .into_iter()
            .flatten()
        {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
