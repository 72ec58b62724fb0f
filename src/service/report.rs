//! Rendering of reset summaries for the console

use crate::catalog::StorageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-storage result of a reset run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageMissingSummary {
    pub storage_id: StorageId,
    /// Empty when the storage has no configuration row
    pub storage_name: String,
    /// Missing records counted before the flag was cleared
    pub count: u64,
}

impl StorageMissingSummary {
    pub fn new(storage_id: StorageId, storage_name: &str, count: u64) -> Self {
        Self {
            storage_id,
            storage_name: storage_name.to_string(),
            count,
        }
    }

    /// Line printed once the storage has been reset
    pub fn reset_line(&self) -> String {
        format!(
            "Reset {} file(s) in storage \"{}\" (uid: {})",
            self.count, self.storage_name, self.storage_id
        )
    }

    /// Line printed by a dry run
    pub fn preview_line(&self) -> String {
        format!(
            "Would reset {} file(s) in storage \"{}\" (uid: {})",
            self.count, self.storage_name, self.storage_id
        )
    }
}

/// Output format of the command
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// JSON document printed after a run
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Sum of all per-storage counts
    pub total: u64,
    pub storages: Vec<StorageMissingSummary>,
    /// Set when the run stopped early; `storages` then holds what was done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonReport {
    pub fn new(storages: Vec<StorageMissingSummary>, dry_run: bool) -> Self {
        Self {
            finished_at: Utc::now(),
            dry_run,
            total: storages.iter().map(|s| s.count).sum(),
            storages,
            error: None,
        }
    }

    /// Report for a run that failed after resetting `storages`
    pub fn failed(storages: Vec<StorageMissingSummary>, dry_run: bool, error: &dyn std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(storages, dry_run)
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
