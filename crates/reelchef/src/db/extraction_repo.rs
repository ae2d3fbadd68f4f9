//! Raw extraction cache keyed by (normalized URL, target language).
//!
//! Entries are immutable: the first successful extraction for a key wins
//! and later inserts for the same key are ignored.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct RawExtractionRow {
    pub normalized_url: String,
    pub target_language: String,
    pub detected_language: Option<String>,
    /// Model draft serialized as JSON, stored verbatim.
    pub draft: String,
    pub confidence: f64,
    pub created_at: String,
}

impl RawExtractionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            normalized_url: row.get("normalized_url")?,
            target_language: row.get("target_language")?,
            detected_language: row.get("detected_language")?,
            draft: row.get("draft")?,
            confidence: row.get("confidence")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn find(
    db: &Database,
    normalized_url: &str,
    target_language: &str,
) -> Result<Option<RawExtractionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM raw_extraction_cache WHERE normalized_url = ?1 AND target_language = ?2",
                params![normalized_url, target_language],
                RawExtractionRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Stores a new entry. Returns `false` when the key was already cached.
pub fn insert(db: &Database, row: &RawExtractionRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT INTO raw_extraction_cache (normalized_url, target_language, detected_language,
             draft, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (normalized_url, target_language) DO NOTHING",
            params![
                row.normalized_url,
                row.target_language,
                row.detected_language,
                row.draft,
                row.confidence,
                row.created_at,
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Number of cached entries for a URL across all languages.
pub fn count_for_url(db: &Database, normalized_url: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM raw_extraction_cache WHERE normalized_url = ?1",
            params![normalized_url],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
