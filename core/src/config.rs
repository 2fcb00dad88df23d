//! Transport configuration (riptide.toml)
//!
//! Handles loading, saving, and providing defaults for transport settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};

use riptide_engine::{DEFAULT_MAX_PAYLOAD_SIZE, EngineSettings};
use serde::{Deserialize, Serialize};

use crate::codec::FRAME_OVERHEAD;

/// Config file name inside [`config_dir`]
pub const CONFIG_FILE_NAME: &str = "riptide.toml";

/// Default listen port
pub const DEFAULT_PORT: u16 = 7777;

/// Default upper bound for simultaneously connected peers
pub const DEFAULT_MAX_CONNECTIONS: u16 = 100;

/// Transport configuration.
///
/// Every field falls back to its default when missing from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Port the server listens on and `"localhost"` connects to (default: 7777)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest message body handed to the engine (default: 65535)
    #[serde(default = "default_max_message_payload_size")]
    pub max_message_payload_size: usize,
    /// Route the engine's internal log output into `tracing` (default: true)
    #[serde(default = "default_true")]
    pub use_engine_logger: bool,
    /// Peers accepted at once by the server (default: 100)
    #[serde(default = "default_max_connections")]
    pub max_connections: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_max_message_payload_size() -> usize {
    DEFAULT_MAX_PAYLOAD_SIZE
}
fn default_true() -> bool {
    true
}
fn default_max_connections() -> u16 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_message_payload_size: default_max_message_payload_size(),
            use_engine_logger: default_true(),
            max_connections: default_max_connections(),
        }
    }
}

/// Errors raised while reading, writing or checking a config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl TransportConfig {
    /// Check values the transport cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_payload_size <= FRAME_OVERHEAD {
            return Err(ConfigError::Invalid(format!(
                "max_message_payload_size must be larger than {} bytes",
                FRAME_OVERHEAD
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Engine settings derived from this config
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_payload_size: self.max_message_payload_size,
            log_enabled: self.use_engine_logger,
        }
    }

    /// Read a config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write this config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Riptide\config`
/// On macOS: `~/Library/Application Support/io.riptide.Riptide`
/// On Linux: `~/.config/riptide`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.riptide", "", "Riptide")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Full path of the config file, if a config directory exists.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from disk.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> TransportConfig {
    let Some(path) = config_path() else {
        return TransportConfig::default();
    };

    match TransportConfig::load_from(&path) {
        Ok(config) => config,
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            TransportConfig::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Using default transport config");
            TransportConfig::default()
        }
    }
}

/// Saves the configuration to disk.
///
/// Writes [`CONFIG_FILE_NAME`] to the platform's configuration directory.
/// Does nothing when no config directory can be determined.
pub fn save(config: &TransportConfig) -> Result<(), ConfigError> {
    if let Some(path) = config_path() {
        config.save_to(&path)?;
    }
    Ok(())
}
