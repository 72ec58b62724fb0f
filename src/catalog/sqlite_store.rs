//! SQLite implementation of the FileCatalog trait

use crate::catalog::{FileCatalog, MissingCount, StorageId, StorageSettings};
use crate::error::ResetError;
use log::{debug, info};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS storages (
        uid INTEGER PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        enabled INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS files (
        uid INTEGER PRIMARY KEY AUTOINCREMENT,
        storage INTEGER NOT NULL,
        identifier TEXT NOT NULL DEFAULT '',
        missing INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS files_storage_missing ON files (storage, missing);
";

/// SQLite implementation of FileCatalog
pub struct SQLiteFileCatalog {
    conn: Mutex<Connection>,
}

impl SQLiteFileCatalog {
    /// Open (or create) the catalog database at `db_path`
    pub fn open(db_path: &Path, busy_timeout: Duration, create_schema: bool) -> Result<Self, ResetError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ResetError::Config(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        info!("Opening file catalog at {}", db_path.display());
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn, create_schema)
    }

    /// Open a private in-memory catalog with the schema in place
    pub fn in_memory() -> Result<Self, ResetError> {
        Self::from_connection(Connection::open_in_memory()?, true)
    }

    fn from_connection(conn: Connection, create_schema: bool) -> Result<Self, ResetError> {
        if create_schema {
            conn.execute_batch(SCHEMA)?;
        }
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a storage row
    pub fn add_storage(&self, storage_id: StorageId, name: &str, enabled: bool) -> Result<(), ResetError> {
        self.lock().execute(
            "INSERT OR REPLACE INTO storages (uid, name, enabled) VALUES (?1, ?2, ?3)",
            params![storage_id, name, enabled],
        )?;
        Ok(())
    }

    /// Insert a file record and return its uid
    pub fn add_file(&self, storage_id: StorageId, identifier: &str, missing: bool) -> Result<i64, ResetError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO files (storage, identifier, missing) VALUES (?1, ?2, ?3)",
            params![storage_id, identifier, missing],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of records currently flagged missing in a storage
    pub fn missing_count(&self, storage_id: StorageId) -> Result<u64, ResetError> {
        let count: i64 = self.lock().query_row(
            "SELECT COUNT(*) FROM files WHERE storage = ?1 AND missing = 1",
            params![storage_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl FileCatalog for SQLiteFileCatalog {
    fn enabled_storages(&self) -> Result<BTreeMap<StorageId, StorageSettings>, ResetError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT uid, name FROM storages WHERE enabled = 1 ORDER BY uid")
            .map_err(ResetError::query)?;

        let rows = stmt
            .query_map([], |row| {
                let uid: StorageId = row.get(0)?;
                let name: String = row.get(1)?;
                Ok((uid, StorageSettings { name }))
            })
            .map_err(ResetError::query)?;

        let mut storages = BTreeMap::new();
        for row in rows {
            let (uid, settings) = row.map_err(ResetError::query)?;
            storages.insert(uid, settings);
        }
        Ok(storages)
    }

    fn query_missing_counts(&self, storage_ids: &[StorageId]) -> Result<Vec<MissingCount>, ResetError> {
        if storage_ids.is_empty() {
            return Ok(Vec::new());
        }

        // One bound JSON array keeps the statement under the host parameter limit
        let id_list = serde_json::to_string(storage_ids).map_err(ResetError::query)?;
        debug!("Missing files aggregate over {} storage(s)", storage_ids.len());

        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT COUNT(*) AS count, f.storage, s.name
                 FROM files f
                 LEFT JOIN storages s ON s.uid = f.storage
                 WHERE f.storage IN (SELECT value FROM json_each(?1)) AND f.missing = 1
                 GROUP BY f.storage
                 ORDER BY f.storage",
            )
            .map_err(ResetError::query)?;
        let rows = stmt
            .query_map(params![id_list], |row| {
                let count: i64 = row.get(0)?;
                Ok(MissingCount {
                    count: count as u64,
                    storage_id: row.get(1)?,
                    storage_name: row.get(2)?,
                })
            })
            .map_err(ResetError::query)?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row.map_err(ResetError::query)?);
        }
        Ok(counts)
    }

    fn clear_missing_flag(&self, storage_id: StorageId) -> Result<usize, ResetError> {
        self.lock()
            .execute(
                "UPDATE files SET missing = 0 WHERE storage = ?1 AND missing = 1",
                params![storage_id],
            )
            .map_err(|e| ResetError::update(storage_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SQLiteFileCatalog {
        let catalog = SQLiteFileCatalog::in_memory().unwrap();
        catalog.add_storage(1, "fileadmin", true).unwrap();
        catalog.add_storage(2, "archive", true).unwrap();
        catalog.add_storage(4, "retired", false).unwrap();
        for i in 0..3 {
            catalog.add_file(1, &format!("/a/{}.jpg", i), true).unwrap();
        }
        catalog.add_file(1, "/a/present.jpg", false).unwrap();
        catalog.add_file(2, "/b/0.pdf", true).unwrap();
        catalog.add_file(9, "/orphan.txt", true).unwrap();
        catalog
    }

    #[test]
    fn test_enabled_storages_skips_disabled() {
        let catalog = seeded();
        let enabled = catalog.enabled_storages().unwrap();
        assert_eq!(enabled.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(enabled[&1].name, "fileadmin");
    }

    #[test]
    fn test_query_missing_counts_groups_and_orders() {
        let catalog = seeded();
        let counts = catalog.query_missing_counts(&[2, 1]).unwrap();
        assert_eq!(
            counts,
            vec![
                MissingCount { count: 3, storage_id: 1, storage_name: Some("fileadmin".to_string()) },
                MissingCount { count: 1, storage_id: 2, storage_name: Some("archive".to_string()) },
            ]
        );
    }

    #[test]
    fn test_query_missing_counts_unknown_storage_has_no_name() {
        let catalog = seeded();
        let counts = catalog.query_missing_counts(&[9]).unwrap();
        assert_eq!(counts, vec![MissingCount { count: 1, storage_id: 9, storage_name: None }]);
    }

    #[test]
    fn test_query_missing_counts_empty_filter() {
        let catalog = seeded();
        assert!(catalog.query_missing_counts(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_query_missing_counts_many_storages() {
        let catalog = seeded();
        let storage_ids: Vec<StorageId> = (1..=40_000).collect();
        let counts = catalog.query_missing_counts(&storage_ids).unwrap();
        assert_eq!(
            counts.iter().map(|c| (c.storage_id, c.count)).collect::<Vec<_>>(),
            vec![(1, 3), (2, 1), (9, 1)]
        );
    }

    #[test]
    fn test_clear_missing_flag_only_touches_one_storage() {
        let catalog = seeded();
        assert_eq!(catalog.clear_missing_flag(1).unwrap(), 3);
        assert_eq!(catalog.missing_count(1).unwrap(), 0);
        assert_eq!(catalog.missing_count(2).unwrap(), 1);
        assert_eq!(catalog.clear_missing_flag(1).unwrap(), 0);
    }

    #[test]
    fn test_update_failure_maps_to_update_error() {
        let catalog = seeded();
        catalog.lock().execute_batch("DROP TABLE files").unwrap();
        let err = catalog.clear_missing_flag(1).unwrap_err();
        assert!(matches!(err, ResetError::Update { storage_id: 1, .. }));
    }

    #[test]
    fn test_query_failure_maps_to_query_error() {
        let catalog = seeded();
        catalog.lock().execute_batch("DROP TABLE files").unwrap();
        let err = catalog.query_missing_counts(&[1]).unwrap_err();
        assert!(matches!(err, ResetError::Query(_)));
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.sqlite");
        let catalog = SQLiteFileCatalog::open(&path, Duration::from_millis(500), true).unwrap();
        catalog.add_storage(1, "local", true).unwrap();
        assert!(path.exists());
    }
}
