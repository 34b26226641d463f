//! RON configuration for the marina server

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable overriding [`Config::token_secret`]
pub const ENV_TOKEN_SECRET: &str = "MARINA_TOKEN_SECRET";
/// Environment variable overriding [`Config::db_path`]
pub const ENV_DB_PATH: &str = "MARINA_DB_PATH";

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Listen address (e.g., "127.0.0.1:3000")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Database file
    #[serde(default)]
    pub db_path: String,
    /// Token signing secret
    #[serde(default)]
    pub token_secret: String,
    /// Lifetime of issued tokens in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_token_ttl() -> u64 {
    24 * 60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a RON file, apply environment overrides and
    /// validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let mut config = Self::from_ron(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse without overrides or validation
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Replace the secret and database path with non-empty values from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(ENV_TOKEN_SECRET).filter(|s| !s.is_empty()) {
            self.token_secret = secret;
        }
        if let Some(path) = lookup(ENV_DB_PATH).filter(|s| !s.is_empty()) {
            self.db_path = path;
        }
    }

    /// Refuse to start without a signing secret or a database path
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "token_secret is empty; set it in the config file or via {}",
                ENV_TOKEN_SECRET
            )));
        }
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "db_path is empty; set it in the config file or via {}",
                ENV_DB_PATH
            )));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "token_ttl_secs must be positive".to_string(),
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|e| ConfigError::Validation(format!("listen '{}': {}", self.listen, e)))
    }
}

/// Configuration error
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
