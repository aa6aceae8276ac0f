pub mod models;

use crate::core::matcher::MatchField;
use log::{debug, error};
use models::FingerprintRecord;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Location string that selects the non-persistent store.
pub const MEMORY_LOCATION: &str = ":memory:";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// `None` or the `:memory:` marker select the in-memory store.
    pub fn from_option(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p.as_os_str() != MEMORY_LOCATION => StoreLocation::File(p.to_path_buf()),
            _ => StoreLocation::Memory,
        }
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    files: &'a [FingerprintRecord],
}

/// Handle to the fingerprint table. Cloning shares the same connection.
#[derive(Clone)]
pub struct FingerprintStore {
    conn: Arc<Mutex<Connection>>,
}

impl FingerprintStore {
    /// Open or create the store at `location` and make sure the `files`
    /// table exists. Existing rows are never touched.
    pub fn connect(location: &StoreLocation) -> Result<Self, DatabaseError> {
        let conn = match location {
            StoreLocation::Memory => Connection::open_in_memory()?,
            StoreLocation::File(path) => Connection::open(path)?,
        };
        debug!("Opened fingerprint store at {:?}", location);

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.lock()?.execute(
            "CREATE TABLE IF NOT EXISTS files (
                filepath TEXT PRIMARY KEY,
                hash TEXT,
                filesize INTEGER,
                bitdepth INTEGER,
                height INTEGER,
                width INTEGER,
                uniquecolors INTEGER,
                timestamp TEXT NOT NULL
            ) WITHOUT ROWID",
            [],
        )?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Insert `record`, replacing any row already stored for its path.
    pub fn upsert(&self, record: &FingerprintRecord) -> Result<(), DatabaseError> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO files
             (filepath, hash, filesize, bitdepth, height, width, uniquecolors, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.filepath,
                record.hash,
                record.filesize.map(|v| v as i64),
                record.bitdepth,
                record.height,
                record.width,
                record.uniquecolors.map(|v| v as i64),
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Every other path whose `field` equals the value stored for
    /// `primary`. A NULL value on either side never compares equal.
    pub fn query_matches(
        &self,
        primary: &str,
        field: MatchField,
    ) -> Result<Vec<String>, DatabaseError> {
        let column = field.column();
        let sql = format!(
            "SELECT b.filepath FROM files a JOIN files b ON a.{column} = b.{column}
             WHERE a.filepath = ?1 AND b.filepath != a.filepath
             ORDER BY b.filepath"
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![primary], |row| row.get::<_, String>(0))?;
        let matches = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    pub fn get(&self, filepath: &str) -> Result<Option<FingerprintRecord>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM files WHERE filepath = ?1")?;
        let mut rows = stmt.query_map(params![filepath], FingerprintRecord::from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// All stored records ordered by path.
    pub fn records(&self) -> Result<Vec<FingerprintRecord>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM files ORDER BY filepath")?;
        let rows = stmt.query_map([], FingerprintRecord::from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn len(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, DatabaseError> {
        Ok(self.len()? == 0)
    }

    /// Write every record to `output` as `{ "files": [...] }`.
    pub fn snapshot_to_file(&self, output: &Path) -> Result<(), DatabaseError> {
        let records = self.records().inspect_err(|e| {
            error!("Database query failed: {}", e);
        })?;
        let json = serde_json::to_string_pretty(&Snapshot { files: &records })?;
        std::fs::write(output, json)?;
        debug!("Wrote {} records to {}", records.len(), output.display());
        Ok(())
    }

    /// Release the connection. Other clones of this handle keep it alive.
    pub fn close(self) -> Result<(), DatabaseError> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().map_err(|_| DatabaseError::Poisoned)?;
                conn.close().map_err(|(_, e)| DatabaseError::Query(e))
            }
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(path: &str, hash: Option<&str>, size: Option<u64>) -> FingerprintRecord {
        FingerprintRecord {
            hash: hash.map(str::to_string),
            filesize: size,
            ..FingerprintRecord::new(path)
        }
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let store = FingerprintStore::connect(&StoreLocation::Memory).unwrap();
        store.upsert(&record("/a/x.jpg", Some("h1"), Some(10))).unwrap();
        store.upsert(&record("/a/x.jpg", Some("h2"), Some(20))).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let stored = store.get("/a/x.jpg").unwrap().unwrap();
        assert_eq!(stored.hash.as_deref(), Some("h2"));
        assert_eq!(stored.filesize, Some(20));
    }

    #[test]
    fn test_query_matches_by_hash_excludes_self() {
        let store = FingerprintStore::connect(&StoreLocation::Memory).unwrap();
        store.upsert(&record("/a/x.jpg", Some("h1"), Some(10))).unwrap();
        store.upsert(&record("/b/y.jpg", Some("h1"), Some(10))).unwrap();
        store.upsert(&record("/b/z.jpg", Some("h2"), Some(10))).unwrap();

        let matches = store.query_matches("/a/x.jpg", MatchField::Hash).unwrap();
        assert_eq!(matches, vec!["/b/y.jpg".to_string()]);

        let mut by_size = store.query_matches("/a/x.jpg", MatchField::FileSize).unwrap();
        by_size.sort();
        assert_eq!(by_size, vec!["/b/y.jpg".to_string(), "/b/z.jpg".to_string()]);
    }

    #[test]
    fn test_missing_hash_never_matches() {
        let store = FingerprintStore::connect(&StoreLocation::Memory).unwrap();
        store.upsert(&record("/a/x.jpg", None, Some(10))).unwrap();
        store.upsert(&record("/b/y.jpg", None, Some(10))).unwrap();

        assert!(store.query_matches("/a/x.jpg", MatchField::Hash).unwrap().is_empty());
        assert_eq!(
            store.query_matches("/a/x.jpg", MatchField::FileSize).unwrap(),
            vec!["/b/y.jpg".to_string()]
        );
    }

    #[test]
    fn test_unknown_primary_has_no_matches() {
        let store = FingerprintStore::connect(&StoreLocation::Memory).unwrap();
        store.upsert(&record("/b/y.jpg", Some("h1"), Some(10))).unwrap();
        assert!(store.query_matches("/a/x.jpg", MatchField::Hash).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists_between_connections() {
        let temp_dir = TempDir::new().unwrap();
        let location = StoreLocation::File(temp_dir.path().join("fingerprints.sqlite"));

        let store = FingerprintStore::connect(&location).unwrap();
        store.upsert(&record("/a/x.jpg", Some("h1"), Some(10))).unwrap();
        store.close().unwrap();

        let reopened = FingerprintStore::connect(&location).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert_eq!(
            reopened.get("/a/x.jpg").unwrap().unwrap().hash.as_deref(),
            Some("h1")
        );
    }

    #[test]
    fn test_snapshot_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FingerprintStore::connect(&StoreLocation::Memory).unwrap();
        store.upsert(&record("/b/y.jpg", Some("h1"), Some(10))).unwrap();
        store.upsert(&record("/a/x.jpg", None, Some(12))).unwrap();

        let output = temp_dir.path().join("database-content.json");
        store.snapshot_to_file(&output).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        let files = json["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["filepath"], "/a/x.jpg");
        assert!(files[0]["hash"].is_null());
        assert_eq!(files[1]["hash"], "h1");
        assert_eq!(files[1]["filesize"], 10);
    }

    #[test]
    fn test_location_from_option() {
        assert_eq!(StoreLocation::from_option(None), StoreLocation::Memory);
        assert_eq!(
            StoreLocation::from_option(Some(Path::new(":memory:"))),
            StoreLocation::Memory
        );
        assert_eq!(
            StoreLocation::from_option(Some(Path::new("db.sqlite"))),
            StoreLocation::File(PathBuf::from("db.sqlite"))
        );
    }
}
