use std::net::SocketAddr;
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "webfiles";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const KEY_FILE_NAME: &str = "signing.key";
pub const UPLOADS_DIR_NAME: &str = "uploads";
pub const SESSIONS_DIR_NAME: &str = "cookiestore";

/// Bytes of randomness in a generated signing key
const SIGNING_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    /// Lifetime of newly minted tokens, in seconds
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
    /// Max-Age of the session cookie, in seconds
    #[serde(default = "default_session_max_age_secs")]
    pub session_max_age_secs: u64,
    /// Mark cookies `Secure` (only sent over HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7777))
}

fn default_max_file_size() -> usize {
    32 << 22
}

fn default_token_lifetime_secs() -> u64 {
    24 * 60 * 60
}

fn default_session_max_age_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_file_size: default_max_file_size(),
            token_lifetime_secs: default_token_lifetime_secs(),
            session_max_age_secs: default_session_max_age_secs(),
            secure_cookies: false,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the webfiles directory (~/.webfiles)
    pub webfiles_dir: PathBuf,
    /// Path to the SQLite ownership database
    pub db_path: PathBuf,
    /// Path to the shared signing secret
    pub key_path: PathBuf,
    /// Root of the content store
    pub uploads_path: PathBuf,
    /// Directory of persisted cookie sessions
    pub sessions_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the webfiles directory path (custom or default ~/.webfiles)
    pub fn webfiles_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new webfiles directory with a freshly generated signing key
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let webfiles_dir = Self::webfiles_dir(custom_path)?;

        if webfiles_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&webfiles_dir)?;

        let uploads_path = webfiles_dir.join(UPLOADS_DIR_NAME);
        fs::create_dir_all(&uploads_path)?;
        let sessions_path = webfiles_dir.join(SESSIONS_DIR_NAME);
        fs::create_dir_all(&sessions_path)?;

        let key = common::crypto::random_bytes::<SIGNING_KEY_BYTES>()
            .map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let key_path = webfiles_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, hex::encode(key))?;

        let config = config.unwrap_or_default();
        let config_path = webfiles_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // Touch the database; the service creates the schema on startup
        let db_path = webfiles_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            webfiles_dir,
            db_path,
            key_path,
            uploads_path,
            sessions_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the webfiles directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let webfiles_dir = Self::webfiles_dir(custom_path)?;

        if !webfiles_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = webfiles_dir.join(DB_FILE_NAME);
        let key_path = webfiles_dir.join(KEY_FILE_NAME);
        let uploads_path = webfiles_dir.join(UPLOADS_DIR_NAME);
        let sessions_path = webfiles_dir.join(SESSIONS_DIR_NAME);
        let config_path = webfiles_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !uploads_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", UPLOADS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        // sessions are disposable, recreate the directory if it went missing
        fs::create_dir_all(&sessions_path)?;

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            webfiles_dir,
            db_path,
            key_path,
            uploads_path,
            sessions_path,
            config_path,
            config,
        })
    }

    /// Load the shared signing secret
    pub fn load_key(&self) -> Result<String, StateError> {
        let key = fs::read_to_string(&self.key_path)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(StateError::InvalidKey("signing key is empty".to_string()));
        }
        Ok(key.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("webfiles directory not initialized. Run 'webfiles init' first")]
    NotInitialized,

    #[error("webfiles directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("webfiles");

        let created = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(created.uploads_path.is_dir());
        assert!(created.sessions_path.is_dir());

        let loaded = AppState::load(Some(dir.clone())).unwrap();
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(loaded.load_key().unwrap().len(), SIGNING_KEY_BYTES * 2);

        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str("secure_cookies = true\n").unwrap();
        assert!(config.secure_cookies);
        assert_eq!(config.listen_addr.port(), 7777);
        assert_eq!(config.max_file_size, 32 << 22);
        assert_eq!(config.token_lifetime_secs, 86400);
    }
}
