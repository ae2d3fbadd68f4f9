//! Database module for persistent storage.
//!
//! Uses rusqlite (SQLite) with a thread-safe `Database` handle.
//! All access is serialized through a `Mutex<Connection>`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod author_repo;
pub mod error;
pub mod extraction_repo;
pub mod job_repo;
pub mod metadata_repo;
pub mod migrations;
pub mod recipe_repo;
pub mod usage_repo;

pub use error::DatabaseError;

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Clones share one connection. Jobs, caches and recipes all go through
/// it, so the lock is also what makes job transitions atomic.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
        )?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Like [`Database::with_conn`], for callers whose closure reports a
    /// richer error type. The lock is held for the whole closure, so a
    /// read-check-write sequence inside it is atomic with respect to
    /// every other user of this handle.
    pub fn with_conn_as<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// Returns the canonical database path: `~/.reelchef/data/reelchef.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".reelchef").join("data").join("reelchef.db"))
}

/// Current UTC time in the RFC 3339 form stored in every timestamp column.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// The timestamp `age` ago, or `None` when that lies outside the calendar.
pub(crate) fn timestamp_before(age: std::time::Duration) -> Option<String> {
    let age = chrono::Duration::from_std(age).ok()?;
    let then = chrono::Utc::now().checked_sub_signed(age)?;
    Some(then.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

/// Serializes a JSON column.
pub(crate) fn to_json_column<T: serde::Serialize>(
    column: &'static str,
    value: &T,
) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::invalid_column(column, e))
}

/// Parses a JSON column back into its typed form.
pub(crate) fn from_json_column<T: serde::de::DeserializeOwned>(
    column: &'static str,
    raw: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::invalid_column(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reelchef.db");
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            let version: u32 =
                conn.query_row("SELECT MAX(version) FROM _migrations", [], |r| r.get(0))?;
            assert_eq!(version, migrations::latest_version());
            Ok(())
        })
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_file_db_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reelchef.db");
        {
            let db = Database::open(&path).unwrap();
            usage_repo::increment(&db, "user-1", "recipe_extractions").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(usage_repo::get(&db, "user-1", "recipe_extractions").unwrap(), 1);
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path().unwrap();
        assert!(path.ends_with("reelchef.db"));
        assert!(path.to_string_lossy().contains(".reelchef"));
    }

    #[test]
    fn test_database_is_clone() {
        let db = Database::open_in_memory().unwrap();
        let db2 = db.clone();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO usage_counters (user_id, metric, count, updated_at) VALUES ('u1', 'm', 3, '2026-01-01')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        db2.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT count FROM usage_counters", [], |r| r.get(0))?;
            assert_eq!(count, 3);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_json_column_round_trip_error_names_column() {
        let err = from_json_column::<Vec<String>>("tags", "not json").unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_timestamp_before() {
        let hour_ago = timestamp_before(std::time::Duration::from_secs(3600)).unwrap();
        assert!(hour_ago < now_timestamp());
        assert!(timestamp_before(std::time::Duration::MAX).is_none());
    }
}
