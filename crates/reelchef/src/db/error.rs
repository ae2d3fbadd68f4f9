use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored JSON or timestamp column does not hold what its type expects.
    #[error("Invalid value in column '{column}': {reason}")]
    InvalidColumn { column: &'static str, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl DatabaseError {
    pub(crate) fn invalid_column(column: &'static str, reason: impl ToString) -> Self {
        DatabaseError::InvalidColumn {
            column,
            reason: reason.to_string(),
        }
    }
}
