//! File Catalog Abstraction
//!
//! This module provides an abstraction over the file-metadata tables the
//! reset command works on, so the command can run against SQLite or an
//! in-memory store without knowing which one it talks to.

pub mod sqlite_store;
pub mod mock_store;
pub mod config;


use crate::error::ResetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage identifier type
pub type StorageId = i64;

/// Configuration carried for each enabled storage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Display name of the storage, empty when unknown
    pub name: String,
}

impl StorageSettings {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

/// One row of the missing-files aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct MissingCount {
    /// Number of records flagged missing
    pub count: u64,
    pub storage_id: StorageId,
    /// None when no storage row exists for the id
    pub storage_name: Option<String>,
}

/// Trait defining the file catalog interface
pub trait FileCatalog: Send + Sync {
    /// Storages considered active, keyed by id
    fn enabled_storages(&self) -> Result<BTreeMap<StorageId, StorageSettings>, ResetError>;

    /// Count missing-flagged records per storage, restricted to `storage_ids`,
    /// ordered by storage id ascending
    fn query_missing_counts(&self, storage_ids: &[StorageId]) -> Result<Vec<MissingCount>, ResetError>;

    /// Clear the missing flag on every record of a storage and return the
    /// number of affected rows
    fn clear_missing_flag(&self, storage_id: StorageId) -> Result<usize, ResetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_settings_default_is_unnamed() {
        assert_eq!(StorageSettings::default().name, "");
        assert_eq!(StorageSettings::named("fileadmin").name, "fileadmin");
    }
}
