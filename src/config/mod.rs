//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::calculate::DEFAULT_MAX_HOURS;
use crate::parse_duration;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// 42 Intra OAuth application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntraConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Provider root, used for both OAuth and API endpoints
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth redirect URI. Defaults to `<server.base_url>/callback`.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Timeout for every outbound request, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base_url() -> String {
    "https://api.intra.42.fr".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for IntraConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base_url: default_api_base_url(),
            redirect_uri: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl IntraConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URL the browser reaches this server at
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Lifetime of the login cookie (e.g. "1h", "30m")
    #[serde(default = "default_session_ttl")]
    pub session_ttl: String,

    /// HTML file served at `/time` instead of the built-in page
    #[serde(default)]
    pub shell_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_session_ttl() -> String {
    "1h".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
            cors_origin: default_cors_origin(),
            session_ttl: default_session_ttl(),
            shell_path: None,
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.session_ttl).ok_or_else(|| {
            ConfigError::ValidationError(format!("Invalid session_ttl: {:?}", self.session_ttl))
        })
    }
}

/// Learning-time settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Monthly target in hours
    #[serde(default = "default_max_hours")]
    pub max_hours: u32,
}

fn default_max_hours() -> u32 {
    DEFAULT_MAX_HOURS
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            max_hours: default_max_hours(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub intra: IntraConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub time: TimeConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            intra: IntraConfig::default(),
            server: ServerConfig::default(),
            time: TimeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists (defaults otherwise), apply
    /// environment overrides, fill derived values, then validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `FT_CLIENT_ID`, `FT_CLIENT_SECRET`,
    /// `APP_BASE_URL` and `FT_REDIRECT_URI`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FT_CLIENT_ID") {
            self.intra.client_id = v;
        }
        if let Some(v) = lookup("FT_CLIENT_SECRET") {
            self.intra.client_secret = v;
        }
        if let Some(v) = lookup("APP_BASE_URL") {
            self.server.base_url = v;
        }
        if let Some(v) = lookup("FT_REDIRECT_URI") {
            self.intra.redirect_uri = Some(v);
        }
    }

    /// Normalize URLs and derive the redirect URI from the base URL.
    pub fn finalize(&mut self) {
        self.server.base_url = self.server.base_url.trim_end_matches('/').to_string();
        self.intra.api_base_url = self.intra.api_base_url.trim_end_matches('/').to_string();
        if self.intra.redirect_uri.as_deref().map_or(true, str::is_empty) {
            self.intra.redirect_uri = Some(format!("{}/callback", self.server.base_url));
        }
    }

    /// The OAuth redirect URI in effect.
    pub fn redirect_uri(&self) -> String {
        self.intra
            .redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/callback", self.server.base_url))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intra.client_id.is_empty() || self.intra.client_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "Intra client_id and client_secret must be set".to_string(),
            ));
        }

        if self.intra.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Intra timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.time.max_hours == 0 {
            return Err(ConfigError::ValidationError(
                "max_hours must be greater than 0".to_string(),
            ));
        }

        self.server.session_ttl()?;

        Ok(())
    }
}
