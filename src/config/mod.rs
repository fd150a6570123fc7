use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

use crate::adapters::sqlite::pool::{default_db_path, StoreLocation};
use crate::types::error::MessagingError;

pub const DEFAULT_ENDPOINT: &str = "https://api.advancedrestclient.com/v1/messages";

/// Global configuration instance
static CONFIG: OnceCell<RwLock<AppConfig>> = OnceCell::new();

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote feed and sync settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Base URI of the messages endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Platform this application runs on. Syncing is impossible without it.
    pub platform: Option<String>,

    /// Release channel of the application
    #[serde(default = "default_channel")]
    pub channel: Option<String>,

    /// Minimum time between two feed requests
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How often the background monitor calls the sync
    #[serde(default = "default_refresh_interval")]
    pub poll_interval_secs: u64,
}

/// Local store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file. Defaults to the platform data directory.
    pub db_path: Option<PathBuf>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_channel() -> Option<String> {
    Some("stable".to_string())
}

fn default_refresh_interval() -> u64 {
    3600
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            platform: None,
            channel: default_channel(),
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_secs: default_refresh_interval(),
        }
    }
}

impl MessagingConfig {
    pub fn new(platform: impl Into<String>, channel: Option<&str>) -> Self {
        Self {
            platform: Some(platform.into()),
            channel: channel.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl StorageConfig {
    pub fn location(&self) -> StoreLocation {
        StoreLocation::File(self.db_path.clone().unwrap_or_else(default_db_path))
    }
}

/// Get default config paths
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // XDG config path
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("arc-messaging").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(
            home_dir
                .join(".config")
                .join("arc-messaging")
                .join("config.toml"),
        );
        paths.push(home_dir.join(".arc-messaging.rc"));
    }

    paths
}

/// Initialize configuration from default paths
pub fn init_config() -> Result<(), MessagingError> {
    info!("Initializing configuration from default paths");

    for path in default_config_paths() {
        if path.exists() {
            info!("Found config at: {:?}", path);
            return init_config_from_path(&path);
        }
    }

    // No config found, initialize with defaults
    info!("No config file found, using defaults");
    set_config(AppConfig::default())
}

/// Initialize configuration from a specific path
pub fn init_config_from_path(path: &Path) -> Result<(), MessagingError> {
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .map_err(|e| MessagingError::Config(format!("Failed to read config: {}", e)))?;

    set_config(parse_config(&content)?)
}

/// Parse a TOML configuration document
pub fn parse_config(content: &str) -> Result<AppConfig, MessagingError> {
    toml::from_str(content)
        .map_err(|e| MessagingError::Config(format!("Failed to parse config: {}", e)))
}

/// Set the global configuration
fn set_config(config: AppConfig) -> Result<(), MessagingError> {
    match CONFIG.get() {
        Some(lock) => {
            let mut guard = lock
                .write()
                .map_err(|e| MessagingError::Config(format!("Failed to lock config: {}", e)))?;
            *guard = config;
        }
        None => {
            CONFIG.set(RwLock::new(config)).ok();
        }
    }
    Ok(())
}

/// Snapshot of the global configuration (defaults when not initialized)
pub fn get_config() -> AppConfig {
    CONFIG
        .get()
        .and_then(|lock| lock.read().ok().map(|guard| guard.clone()))
        .unwrap_or_default()
}

/// Check if configuration is initialized
pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.messaging.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.messaging.platform, None);
        assert_eq!(config.messaging.channel.as_deref(), Some("stable"));
        assert_eq!(config.messaging.refresh_interval(), Duration::from_secs(3600));
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            [messaging]
            endpoint = "http://localhost:8080/v1/messages"
            platform = "electron"
            channel = "beta"
            refresh_interval_secs = 60
            request_timeout_secs = 5
            poll_interval_secs = 120

            [storage]
            db_path = "/tmp/messages.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.messaging.platform.as_deref(), Some("electron"));
        assert_eq!(config.messaging.channel.as_deref(), Some("beta"));
        assert_eq!(config.messaging.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.messaging.poll_interval(), Duration::from_secs(120));
        assert_eq!(
            config.storage.location(),
            StoreLocation::File(PathBuf::from("/tmp/messages.db"))
        );
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let result = parse_config("[messaging]\nrefresh_interval_secs = \"soon\"");
        assert!(matches!(result, Err(MessagingError::Config(_))));
    }

    #[test]
    fn test_init_from_path_sets_global() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[messaging]\nplatform = \"chrome\"\n").unwrap();

        init_config_from_path(&path).unwrap();

        assert!(is_initialized());
        assert_eq!(get_config().messaging.platform.as_deref(), Some("chrome"));
    }
}
