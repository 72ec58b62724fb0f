//! Error types for the reset command

use crate::catalog::StorageId;
use crate::service::report::StorageMissingSummary;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResetError {
    #[error("Failed to query missing files: {0}")]
    Query(String),

    #[error("Failed to reset missing files in storage {storage_id}: {message}")]
    Update {
        storage_id: StorageId,
        message: String,
        /// Storages reset before the failing one, already committed
        completed: Vec<StorageMissingSummary>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ResetError {
    /// Build an update error for the given storage
    pub fn update(storage_id: StorageId, err: impl std::fmt::Display) -> Self {
        ResetError::Update {
            storage_id,
            message: err.to_string(),
            completed: Vec::new(),
        }
    }

    /// Attach the storages reset before this error to an update error
    pub fn with_completed(self, done: &[StorageMissingSummary]) -> Self {
        match self {
            ResetError::Update { storage_id, message, .. } => ResetError::Update {
                storage_id,
                message,
                completed: done.to_vec(),
            },
            other => other,
        }
    }

    /// Storages whose reset was committed before the run failed
    pub fn completed(&self) -> &[StorageMissingSummary] {
        match self {
            ResetError::Update { completed, .. } => completed,
            _ => &[],
        }
    }

    /// Build a query error from any displayable cause
    pub fn query(err: impl std::fmt::Display) -> Self {
        ResetError::Query(err.to_string())
    }
}
