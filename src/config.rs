//! Application Configuration
//!
//! This module provides configuration management for the command,
//! supporting YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use log::{info, warn};

use crate::catalog::config::CatalogConfig;
use crate::error::ResetError;
use crate::service::OutputFormat;

/// Config file read when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "reset.yaml";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// File catalog configuration
    pub database: CatalogConfig,
    /// Report configuration
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Report configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to log4rs configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "reset_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, use defaults if not found.
    ///
    /// Environment overrides for the catalog are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ResetError> {
        let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path).map_err(|e| {
                ResetError::Config(format!("cannot read {}: {}", config_path.display(), e))
            })?;
            let config = Self::from_yaml(&content)?;
            info!("Loaded configuration from {}", config_path.display());
            config
        } else {
            warn!("Config file {} not found, using defaults", config_path.display());
            Self::default()
        };

        config.database.apply_env();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ResetError> {
        serde_yaml::from_str(content).map_err(|e| ResetError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::config::CatalogBackend;
    use serial_test::serial;
    use std::path::PathBuf;

    #[test]
    fn test_from_yaml_partial_sections() {
        let config = AppConfig::from_yaml(
            "database:\n  backend: Mock\n  busy_timeout_ms: 250\noutput:\n  format: json\n",
        )
        .unwrap();
        assert_eq!(config.database.backend, CatalogBackend::Mock);
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert!(config.database.create_schema);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.config_file, "reset_log.yaml");
    }

    #[test]
    fn test_from_yaml_rejects_unknown_backend() {
        let err = AppConfig::from_yaml("database:\n  backend: Oracle\n").unwrap_err();
        assert!(matches!(err, ResetError::Config(_)));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_applies_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reset.yaml");
        fs::write(&path, "database:\n  db_path: /srv/catalog.sqlite\n").unwrap();

        std::env::set_var("RESET_DB_FILE", "/tmp/override.sqlite");
        let config = AppConfig::load(Some(&path)).unwrap();
        std::env::remove_var("RESET_DB_FILE");

        assert_eq!(config.database.db_path, PathBuf::from("/tmp/override.sqlite"));
    }
}
