//! Configuration file support for appdeck
//!
//! Supports both YAML and TOML configuration files.
//!
//! # Example YAML configuration:
//! ```yaml
//! # appdeck configuration file
//!
//! # Apps service settings
//! server:
//!   port: 7600
//!   bind: "0.0.0.0"
//!   storage_dir: /var/lib/appdeck/storage
//!   state_dir: /var/lib/appdeck/state
//!
//! # Client settings
//! client:
//!   server_url: "http://localhost:7600"
//!   api_key: "your-api-key"
//!   session_file: ~/.appdeck-session.json
//!
//! # Logging settings
//! logging:
//!   level: info
//!   format: text
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Apps service configuration
    pub server: ServerConfig,

    /// Client configuration
    pub client: ClientConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Apps service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Bind address
    pub bind: String,

    /// Root directory for uploaded application files
    pub storage_dir: PathBuf,

    /// Directory for persistent registry state (in-memory when unset)
    pub state_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7600,
            bind: "127.0.0.1".to_string(),
            storage_dir: PathBuf::from("storage"),
            state_dir: None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the apps service
    pub server_url: Option<String>,

    /// API key for authentication
    pub api_key: Option<String>,

    /// Where the session is persisted
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            session_file: PathBuf::from(".appdeck-session.json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Include timestamps
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            timestamps: true,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML, auto-detected by extension)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "toml" => Self::from_toml(&content),
            _ => {
                // Try YAML first, then TOML
                Self::from_yaml(&content).or_else(|_| Self::from_toml(&content))
            }
        }
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Merge another config into this one (other values take precedence if set)
    pub fn merge(&mut self, other: Config) {
        if other.server.port != ServerConfig::default().port {
            self.server.port = other.server.port;
        }
        if other.server.bind != ServerConfig::default().bind {
            self.server.bind = other.server.bind;
        }
        if other.server.storage_dir != ServerConfig::default().storage_dir {
            self.server.storage_dir = other.server.storage_dir;
        }
        if other.server.state_dir.is_some() {
            self.server.state_dir = other.server.state_dir;
        }

        if other.client.server_url.is_some() {
            self.client.server_url = other.client.server_url;
        }
        if other.client.api_key.is_some() {
            self.client.api_key = other.client.api_key;
        }
        if other.client.session_file != ClientConfig::default().session_file {
            self.client.session_file = other.client.session_file;
        }
    }

    /// Create an example configuration
    pub fn example() -> Self {
        Self {
            server: ServerConfig {
                port: 7600,
                bind: "0.0.0.0".to_string(),
                storage_dir: PathBuf::from("/var/lib/appdeck/storage"),
                state_dir: Some(PathBuf::from("/var/lib/appdeck/state")),
            },
            client: ClientConfig {
                server_url: Some("http://localhost:7600".to_string()),
                api_key: Some("your-api-key-here".to_string()),
                session_file: PathBuf::from(".appdeck-session.json"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                timestamps: true,
            },
        }
    }

    /// Generate example YAML configuration
    pub fn example_yaml() -> String {
        serde_yaml::to_string(&Self::example()).unwrap_or_default()
    }

    /// Generate example TOML configuration
    pub fn example_toml() -> String {
        toml::to_string_pretty(&Self::example()).unwrap_or_default()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    IoError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
