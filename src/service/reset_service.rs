//! Clears the missing flag of file records, one storage at a time

use crate::catalog::{FileCatalog, StorageId, StorageSettings};
use crate::error::ResetError;
use crate::service::report::StorageMissingSummary;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

/// Keeps the storage id in the log context while a storage is processed
struct StorageLogContext;

impl StorageLogContext {
    fn enter(storage_id: StorageId) -> Self {
        log_mdc::insert("storage", storage_id.to_string());
        Self
    }
}

impl Drop for StorageLogContext {
    fn drop(&mut self) {
        log_mdc::remove("storage");
    }
}

/// Resets missing files through an injected file catalog
pub struct MissingFileResetter {
    catalog: Arc<dyn FileCatalog>,
}

impl MissingFileResetter {
    pub fn new(catalog: Arc<dyn FileCatalog>) -> Self {
        Self { catalog }
    }

    /// Storages a run operates on.
    ///
    /// Without a target this is every enabled storage. A target is always
    /// kept, carrying empty settings when it is not enabled.
    pub fn resolve_storages(
        &self,
        target: Option<StorageId>,
    ) -> Result<BTreeMap<StorageId, StorageSettings>, ResetError> {
        let mut enabled = self.catalog.enabled_storages()?;
        match target {
            None => Ok(enabled),
            Some(storage_id) => {
                let settings = enabled.remove(&storage_id).unwrap_or_else(|| {
                    debug!("Storage {} is not enabled, resetting it anyway", storage_id);
                    StorageSettings::default()
                });
                Ok(BTreeMap::from([(storage_id, settings)]))
            }
        }
    }

    /// Count missing files per storage without changing anything
    pub fn preview(
        &self,
        target: Option<StorageId>,
        out: &mut dyn Write,
    ) -> Result<Vec<StorageMissingSummary>, ResetError> {
        let summaries = self.missing_summaries(target)?;
        for summary in &summaries {
            writeln!(out, "{}", summary.preview_line())?;
        }
        Ok(summaries)
    }

    /// Clear the missing flag for every storage holding missing files.
    ///
    /// Storages are processed in ascending id order and a line is written to
    /// `out` after each one. The first failing update aborts the run; storages
    /// already reset stay reset and travel with the error.
    pub fn reset(
        &self,
        target: Option<StorageId>,
        out: &mut dyn Write,
    ) -> Result<Vec<StorageMissingSummary>, ResetError> {
        let summaries = self.missing_summaries(target)?;
        if summaries.is_empty() {
            info!("No missing files found");
            return Ok(summaries);
        }

        for (done, summary) in summaries.iter().enumerate() {
            let _context = StorageLogContext::enter(summary.storage_id);

            let affected = self
                .catalog
                .clear_missing_flag(summary.storage_id)
                .map_err(|e| e.with_completed(&summaries[..done]))?;
            if affected as u64 != summary.count {
                warn!(
                    "Storage {} had {} missing file(s) but {} were reset",
                    summary.storage_id, summary.count, affected
                );
            }
            info!("Reset {} missing file(s) in storage {}", affected, summary.storage_id);
            writeln!(out, "{}", summary.reset_line())?;
        }

        Ok(summaries)
    }

    fn missing_summaries(&self, target: Option<StorageId>) -> Result<Vec<StorageMissingSummary>, ResetError> {
        let storages = self.resolve_storages(target)?;
        let storage_ids: Vec<StorageId> = storages.keys().copied().collect();

        let counts = self.catalog.query_missing_counts(&storage_ids)?;
        debug!("{} storage(s) with missing files", counts.len());

        Ok(counts
            .into_iter()
            .map(|row| StorageMissingSummary {
                storage_id: row.storage_id,
                storage_name: row.storage_name.unwrap_or_default(),
                count: row.count,
            })
            .collect())
    }
}
