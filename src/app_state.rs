//! Application State Management
//!
//! Wires the configured file catalog into the resetter, following the
//! dependency injection pattern.

use std::sync::Arc;
use log::info;

use crate::catalog::FileCatalog;
use crate::catalog::mock_store::MockFileCatalog;
use crate::config::AppConfig;
use crate::error::ResetError;
use crate::service::MissingFileResetter;

/// Application state containing the resetter and its dependencies
pub struct AppState {
    pub resetter: MissingFileResetter,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, ResetError> {
        info!(
            "Initializing application state with {:?} catalog at {}",
            config.database.backend,
            config.database.db_path.display()
        );

        let catalog = config.database.create_store()?;
        Ok(Self::with_catalog(catalog, config))
    }

    /// Create application state around an existing catalog
    pub fn with_catalog(catalog: Arc<dyn FileCatalog>, config: AppConfig) -> Self {
        Self {
            resetter: MissingFileResetter::new(catalog),
            config,
        }
    }

    /// Create application state for testing with a mock catalog
    pub fn new_for_testing(catalog: Arc<MockFileCatalog>) -> Self {
        Self::with_catalog(catalog, AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::config::CatalogBackend;

    #[test]
    fn test_from_config_with_mock_backend() {
        let mut config = AppConfig::default();
        config.database.backend = CatalogBackend::Mock;
        let state = AppState::from_config(config).unwrap();
        assert!(state.resetter.reset(None, &mut Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_new_for_testing_uses_given_catalog() {
        let catalog = Arc::new(MockFileCatalog::new());
        catalog.add_storage(1, "local", true);
        catalog.add_files(1, 2, true);

        let state = AppState::new_for_testing(catalog.clone());
        let summaries = state.resetter.reset(None, &mut Vec::new()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(catalog.missing_count(1), 0);
    }
}
