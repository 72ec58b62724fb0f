//! Mock implementation of FileCatalog trait for testing

use crate::catalog::{FileCatalog, MissingCount, StorageId, StorageSettings};
use crate::error::ResetError;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct MockStorage {
    name: String,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct MockFile {
    storage_id: StorageId,
    missing: bool,
}

#[derive(Default)]
struct MockState {
    storages: BTreeMap<StorageId, MockStorage>,
    files: Vec<MockFile>,
    fail_query: bool,
    fail_update: HashSet<StorageId>,
    update_calls: Vec<StorageId>,
}

/// Mock implementation of FileCatalog for testing
pub struct MockFileCatalog {
    state: Mutex<MockState>,
}

impl MockFileCatalog {
    /// Create an empty mock catalog
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_storage(&self, storage_id: StorageId, name: &str, enabled: bool) {
        self.lock().storages.insert(
            storage_id,
            MockStorage { name: name.to_string(), enabled },
        );
    }

    /// Add `count` file records to a storage
    pub fn add_files(&self, storage_id: StorageId, count: usize, missing: bool) {
        let mut state = self.lock();
        for _ in 0..count {
            state.files.push(MockFile { storage_id, missing });
        }
    }

    /// Make every aggregate query fail
    pub fn fail_query(&self) {
        self.lock().fail_query = true;
    }

    /// Make updates for one storage fail
    pub fn fail_update_for(&self, storage_id: StorageId) {
        self.lock().fail_update.insert(storage_id);
    }

    /// Number of records flagged missing in a storage
    pub fn missing_count(&self, storage_id: StorageId) -> u64 {
        self.lock()
            .files
            .iter()
            .filter(|f| f.storage_id == storage_id && f.missing)
            .count() as u64
    }

    /// Storages `clear_missing_flag` was called for, in call order
    pub fn update_calls(&self) -> Vec<StorageId> {
        self.lock().update_calls.clone()
    }

    /// Clear all data and failure switches
    pub fn clear(&self) {
        *self.lock() = MockState::default();
    }
}

impl Default for MockFileCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCatalog for MockFileCatalog {
    fn enabled_storages(&self) -> Result<BTreeMap<StorageId, StorageSettings>, ResetError> {
        let state = self.lock();
        if state.fail_query {
            return Err(ResetError::query("mock catalog unavailable"));
        }

        Ok(state
            .storages
            .iter()
            .filter(|(_, storage)| storage.enabled)
            .map(|(id, storage)| (*id, StorageSettings::named(&storage.name)))
            .collect())
    }

    fn query_missing_counts(&self, storage_ids: &[StorageId]) -> Result<Vec<MissingCount>, ResetError> {
        let state = self.lock();
        if state.fail_query {
            return Err(ResetError::query("mock catalog unavailable"));
        }

        let mut grouped: BTreeMap<StorageId, u64> = BTreeMap::new();
        for file in state.files.iter().filter(|f| f.missing && storage_ids.contains(&f.storage_id)) {
            *grouped.entry(file.storage_id).or_insert(0) += 1;
        }

        Ok(grouped
            .into_iter()
            .map(|(storage_id, count)| MissingCount {
                count,
                storage_id,
                storage_name: state.storages.get(&storage_id).map(|s| s.name.clone()),
            })
            .collect())
    }

    fn clear_missing_flag(&self, storage_id: StorageId) -> Result<usize, ResetError> {
        let mut state = self.lock();
        state.update_calls.push(storage_id);
        if state.fail_update.contains(&storage_id) {
            return Err(ResetError::update(storage_id, "mock update rejected"));
        }

        let mut affected = 0;
        for file in state.files.iter_mut().filter(|f| f.storage_id == storage_id && f.missing) {
            file.missing = false;
            affected += 1;
        }
        Ok(affected)
    }
}
