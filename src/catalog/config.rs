//! Configuration for file catalog backends

use crate::catalog::{FileCatalog, mock_store::MockFileCatalog, sqlite_store::SQLiteFileCatalog};
use crate::error::ResetError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Available file catalog backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum CatalogBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(CatalogBackend::SQLite),
            "mock" => Ok(CatalogBackend::Mock),
            _ => Err(format!("Unknown catalog backend: {}", s)),
        }
    }
}

/// Configuration for the file catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog backend type
    pub backend: CatalogBackend,
    /// Database file path
    pub db_path: PathBuf,
    /// How long a statement waits on a locked database
    pub busy_timeout_ms: u64,
    /// Create the tables when they do not exist yet
    pub create_schema: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::default(),
            db_path: PathBuf::from("./data/catalog.sqlite"),
            busy_timeout_ms: 5000,
            create_schema: true,
        }
    }
}

impl CatalogConfig {
    /// Apply `CATALOG_BACKEND` and `RESET_DB_FILE` from the environment
    pub fn apply_env(&mut self) {
        if let Ok(backend_str) = env::var("CATALOG_BACKEND") {
            match backend_str.parse::<CatalogBackend>() {
                Ok(backend) => {
                    info!("Using catalog backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => {
                    warn!("Invalid catalog backend in environment: {}. Keeping {:?}.", e, self.backend);
                }
            }
        }

        if let Ok(path) = env::var("RESET_DB_FILE") {
            info!("Using database path from environment: {}", path);
            self.db_path = PathBuf::from(path);
        }
    }

    /// Create a file catalog instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn FileCatalog>, ResetError> {
        match self.backend {
            CatalogBackend::SQLite => {
                info!("Creating SQLite file catalog");
                let store = SQLiteFileCatalog::open(
                    &self.db_path,
                    Duration::from_millis(self.busy_timeout_ms),
                    self.create_schema,
                )?;
                Ok(Arc::new(store))
            }
            CatalogBackend::Mock => {
                info!("Creating Mock file catalog");
                Ok(Arc::new(MockFileCatalog::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_catalog_backend_from_str() {
        assert_eq!("sqlite".parse::<CatalogBackend>().unwrap(), CatalogBackend::SQLite);
        assert_eq!("SQLite".parse::<CatalogBackend>().unwrap(), CatalogBackend::SQLite);
        assert_eq!("mock".parse::<CatalogBackend>().unwrap(), CatalogBackend::Mock);
        assert_eq!("MOCK".parse::<CatalogBackend>().unwrap(), CatalogBackend::Mock);

        assert!("postgres".parse::<CatalogBackend>().is_err());
    }

    #[test]
    fn test_catalog_config_default() {
        let config = CatalogConfig::default();
        assert_eq!(config.backend, CatalogBackend::SQLite);
        assert!(config.create_schema);
    }

    #[test]
    #[serial]
    fn test_catalog_config_apply_env() {
        env::set_var("CATALOG_BACKEND", "mock");
        env::set_var("RESET_DB_FILE", "/tmp/other.sqlite");
        let mut config = CatalogConfig::default();
        config.apply_env();
        assert_eq!(config.backend, CatalogBackend::Mock);
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.sqlite"));

        // Invalid value keeps what was configured
        env::set_var("CATALOG_BACKEND", "invalid");
        config.apply_env();
        assert_eq!(config.backend, CatalogBackend::Mock);

        env::remove_var("CATALOG_BACKEND");
        env::remove_var("RESET_DB_FILE");
    }

    #[test]
    fn test_create_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig {
            db_path: dir.path().join("catalog.sqlite"),
            ..CatalogConfig::default()
        };
        let store = config.create_store().unwrap();
        assert!(store.enabled_storages().unwrap().is_empty());

        let config = CatalogConfig { backend: CatalogBackend::Mock, ..CatalogConfig::default() };
        let store = config.create_store().unwrap();
        assert!(store.query_missing_counts(&[1]).unwrap().is_empty());
    }
}
