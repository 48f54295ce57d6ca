//! Configuration management
//!
//! Configuration is loaded from:
//! - a `mytune.yml` file
//! - environment variables (override file settings)
//!
//! Missing optional values are filled with defaults that point at a local
//! development backend.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "mytune.yml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Review backend
    #[serde(default)]
    pub api: ApiConfig,
    /// Spotify Web API
    #[serde(default)]
    pub spotify: SpotifyConfig,
    /// Persisted session
    #[serde(default)]
    pub session: SessionConfig,
}

/// Review backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every backend path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; unset waits indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

/// Spotify client-credentials configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Token endpoint of the accounts service
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Market used for top tracks (ISO 3166-1 alpha-2)
    #[serde(default = "default_market")]
    pub market: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            accounts_url: default_accounts_url(),
            api_url: default_api_url(),
            market: default_market(),
        }
    }
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("accounts_url", &self.accounts_url)
            .field("api_url", &self.api_url)
            .field("market", &self.market)
            .finish()
    }
}

impl SpotifyConfig {
    /// Whether client credentials are present
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn default_accounts_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_market() -> String {
    "US".to_string()
}

/// Session persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the token pair
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
    /// Re-read the session file this often to pick up logins and logouts
    /// made by other processes; unset disables polling
    #[serde(default)]
    pub sync_interval_seconds: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            sync_interval_seconds: None,
        }
    }
}

impl SessionConfig {
    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_seconds.map(Duration::from_secs)
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".mytune/session.json")
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. Invalid YAML
    /// is an error that names the offending line and column.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - MYTUNE_API_BASE_URL
    /// - MYTUNE_API_TIMEOUT_SECONDS
    /// - MYTUNE_SPOTIFY_CLIENT_ID
    /// - MYTUNE_SPOTIFY_CLIENT_SECRET
    /// - MYTUNE_SPOTIFY_ACCOUNTS_URL
    /// - MYTUNE_SPOTIFY_API_URL
    /// - MYTUNE_SPOTIFY_MARKET
    /// - MYTUNE_SESSION_PATH
    /// - MYTUNE_SESSION_SYNC_INTERVAL_SECONDS
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }
        if self.api.timeout_seconds == Some(0) {
            return Err(ConfigError::ValidationError(
                "api.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.session.sync_interval_seconds == Some(0) {
            return Err(ConfigError::ValidationError(
                "session.sync_interval_seconds must be greater than 0".to_string(),
            ));
        }
        let market = &self.spotify.market;
        if market.len() != 2 || !market.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::ValidationError(format!(
                "spotify.market must be a two-letter country code, got '{}'",
                market
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Backend
        if let Ok(url) = std::env::var("MYTUNE_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("MYTUNE_API_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.api.timeout_seconds = Some(timeout);
            }
        }

        // Spotify
        if let Ok(id) = std::env::var("MYTUNE_SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = id;
        }
        if let Ok(secret) = std::env::var("MYTUNE_SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = secret;
        }
        if let Ok(url) = std::env::var("MYTUNE_SPOTIFY_ACCOUNTS_URL") {
            self.spotify.accounts_url = url;
        }
        if let Ok(url) = std::env::var("MYTUNE_SPOTIFY_API_URL") {
            self.spotify.api_url = url;
        }
        if let Ok(market) = std::env::var("MYTUNE_SPOTIFY_MARKET") {
            self.spotify.market = market.to_uppercase();
        }

        // Session
        if let Ok(path) = std::env::var("MYTUNE_SESSION_PATH") {
            self.session.path = PathBuf::from(path);
        }
        if let Ok(interval) = std::env::var("MYTUNE_SESSION_SYNC_INTERVAL_SECONDS") {
            if let Ok(interval) = interval.parse::<u64>() {
                self.session.sync_interval_seconds = Some(interval);
            }
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches MYTUNE_* variables
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_VARS: [&str; 9] = [
    "MYTUNE_API_BASE_URL",
    "MYTUNE_API_TIMEOUT_SECONDS",
    "MYTUNE_SPOTIFY_CLIENT_ID",
    "MYTUNE_SPOTIFY_CLIENT_SECRET",
    "MYTUNE_SPOTIFY_ACCOUNTS_URL",
    "MYTUNE_SPOTIFY_API_URL",
    "MYTUNE_SPOTIFY_MARKET",
    "MYTUNE_SESSION_PATH",
    "MYTUNE_SESSION_SYNC_INTERVAL_SECONDS",
];

#[cfg(test)]
fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}
