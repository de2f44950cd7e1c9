//! Configuration management tests
//!
//! Tests for ConfigManager and Config structures.

use feedback_core::config::{Config, ConfigManager, StorageConfig, TabsConfig};
use feedback_core::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temp directory for config tests
fn setup_config_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

mod config_structure_tests {
    use super::*;

    #[test]
    fn test_tabs_defaults() {
        let tabs = TabsConfig::default();
        assert_eq!(tabs.notification_ttl().as_secs(), 5);
        assert_eq!(tabs.auto_switch_threshold, 2);
    }

    #[test]
    fn test_storage_root_override() {
        let storage = StorageConfig {
            root_dir: Some(PathBuf::from("/srv/feedback")),
            ..Default::default()
        };
        assert_eq!(storage.root(), PathBuf::from("/srv/feedback"));
        assert_eq!(storage.reprocess_after().as_secs(), 300);
    }

    #[test]
    fn test_root_dir_omitted_when_unset() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(!toml_str.contains("root_dir"));
    }
}

mod config_manager_tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = setup_config_dir();
        let config_path = dir.path().join("config.toml");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert_eq!(manager.config_path(), config_path.as_path());
        assert_eq!(manager.config().tabs.auto_switch_threshold, 2);
    }

    #[test]
    fn test_load_existing_config() {
        let dir = setup_config_dir();
        let config_path = dir.path().join("config.toml");

        let config_content = r#"
[tabs]
notification_ttl_ms = 8000
fallback_title_prefix = "Request"

[storage]
root_dir = "/var/tmp/exchange"
poll_interval_ms = 250
"#;
        fs::write(&config_path, config_content).unwrap();

        let manager = ConfigManager::with_path(config_path).unwrap();
        let config = manager.config();
        assert_eq!(config.tabs.notification_ttl_ms, 8000);
        assert_eq!(config.tabs.fallback_title_prefix, "Request");
        assert_eq!(config.tabs.auto_switch_threshold, 2);
        assert_eq!(config.storage.root(), PathBuf::from("/var/tmp/exchange"));
        assert_eq!(config.storage.poll_interval_ms, 250);
        assert_eq!(config.storage.reprocess_after_secs, 300);
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let dir = setup_config_dir();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[tabs\nbroken").unwrap();

        let result = ConfigManager::with_path(config_path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_config() {
        let dir = setup_config_dir();
        let config_path = dir.path().join("nested").join("config.toml");

        let mut manager = ConfigManager::with_path(config_path.clone()).unwrap();
        manager.config_mut().tabs.auto_switch_threshold = 3;
        manager.save().unwrap();

        assert!(config_path.exists());
        let reloaded = ConfigManager::with_path(config_path).unwrap();
        assert_eq!(reloaded.config().tabs.auto_switch_threshold, 3);
    }
}
