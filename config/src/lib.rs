//! Configuration for lensfolio: settings file, filesystem layout and
//! startup environment.

mod crypto;
pub mod paths;
pub mod settings;

pub use crypto::{decrypt_credential, encrypt_credential};
pub use paths::PathManager;
pub use settings::{AnonymousMode, OwnershipMode, RemoteSettings, Settings};

/// Environment variable holding the remote service base URL.
pub const ENV_REMOTE_URL: &str = "LENSFOLIO_REMOTE_URL";
/// Environment variable holding the remote service anonymous key.
pub const ENV_ANON_KEY: &str = "LENSFOLIO_ANON_KEY";

/// Load environment variables from .env files.
///
/// `dotenv` never overwrites a variable that is already set, so the project
/// `./.env` is read first and `~/.env` only fills in what is still missing.
/// Call this before parsing CLI args to ensure env vars are available.
pub fn load_env_file() {
    dotenv::dotenv().ok();
    if let Some(home) = dirs::home_dir() {
        dotenv::from_path(home.join(".env")).ok();
    }
}
