//! Configuration management for Feedback Desk
//!
//! Handles loading, saving, and managing application configuration
//! including tab behaviour and the location of the request exchange directory.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Directory name used under the system temp dir when no storage root is configured
pub const DEFAULT_STORAGE_DIR_NAME: &str = "mcp_manager";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feedback tab behaviour
    #[serde(default)]
    pub tabs: TabsConfig,
    /// Request/response exchange directory settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Feedback tab behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabsConfig {
    /// How long a notification stays in the queue (milliseconds)
    pub notification_ttl_ms: u64,
    /// A new tab steals focus from an already viewed tab only while the
    /// tab count stays below this value
    pub auto_switch_threshold: usize,
    /// Prefix for ordinal titles when a request carries no context
    pub fallback_title_prefix: String,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            notification_ttl_ms: 5000,
            auto_switch_threshold: 2,
            fallback_title_prefix: "Feedback".to_string(),
        }
    }
}

impl TabsConfig {
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

/// Request/response exchange directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the exchange directory (defaults to `<temp>/mcp_manager`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,
    /// Interval between request directory scans (milliseconds)
    pub poll_interval_ms: u64,
    /// A request pushed less than this many seconds ago is not pushed again
    /// by periodic scans
    pub reprocess_after_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            poll_interval_ms: 1000,
            reprocess_after_secs: 300,
        }
    }
}

impl StorageConfig {
    /// Resolved exchange directory root
    pub fn root(&self) -> PathBuf {
        self.root_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_STORAGE_DIR_NAME))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reprocess_after(&self) -> Duration {
        Duration::from_secs(self.reprocess_after_secs)
    }
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("feedback-desk").join("config.toml"))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Path the configuration is read from and saved to
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_path: PathBuf::from("config.toml"),
            config: Config::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tabs.notification_ttl_ms, 5000);
        assert_eq!(config.tabs.auto_switch_threshold, 2);
        assert_eq!(config.tabs.fallback_title_prefix, "Feedback");
        assert_eq!(config.storage.poll_interval_ms, 1000);
        assert_eq!(config.storage.reprocess_after_secs, 300);
        assert!(config.storage.root_dir.is_none());
    }

    #[test]
    fn test_default_storage_root_under_temp() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.root(),
            std::env::temp_dir().join(DEFAULT_STORAGE_DIR_NAME)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str("[tabs]\nauto_switch_threshold = 4\n").unwrap();
        assert_eq!(parsed.tabs.auto_switch_threshold, 4);
        assert_eq!(parsed.tabs.notification_ttl_ms, 5000);
        assert_eq!(parsed.storage.poll_interval_ms, 1000);
        assert_eq!(parsed.general.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[tabs]"));
        assert!(toml_str.contains("[storage]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tabs.notification_ttl_ms, config.tabs.notification_ttl_ms);
    }
}
