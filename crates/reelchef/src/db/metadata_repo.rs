//! Video metadata cache: one row per normalized URL.

use rusqlite::{params, OptionalExtension, Row};

use super::{from_json_column, now_timestamp, to_json_column, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub normalized_url: String,
    pub platform: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub author_verified: bool,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub author_id: Option<i64>,
    pub updated_at: String,
}

impl MetadataRow {
    fn from_row(row: &Row<'_>) -> Result<(Self, String), rusqlite::Error> {
        let tags: String = row.get("tags")?;
        Ok((
            Self {
                normalized_url: row.get("normalized_url")?,
                platform: row.get("platform")?,
                title: row.get("title")?,
                description: row.get("description")?,
                author_username: row.get("author_username")?,
                author_display_name: row.get("author_display_name")?,
                author_avatar_url: row.get("author_avatar_url")?,
                author_verified: row.get("author_verified")?,
                thumbnail_url: row.get("thumbnail_url")?,
                tags: Vec::new(),
                author_id: row.get("author_id")?,
                updated_at: row.get("updated_at")?,
            },
            tags,
        ))
    }
}

/// Inserts or refreshes the cache entry for `row.normalized_url`.
/// Concurrent writers race to the same key; the last one wins.
pub fn upsert(db: &Database, row: &MetadataRow) -> Result<(), DatabaseError> {
    let tags = to_json_column("tags", &row.tags)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO video_metadata_cache (normalized_url, platform, title, description,
             author_username, author_display_name, author_avatar_url, author_verified,
             thumbnail_url, tags, author_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT (normalized_url) DO UPDATE SET
                platform = excluded.platform,
                title = excluded.title,
                description = excluded.description,
                author_username = excluded.author_username,
                author_display_name = excluded.author_display_name,
                author_avatar_url = excluded.author_avatar_url,
                author_verified = excluded.author_verified,
                thumbnail_url = excluded.thumbnail_url,
                tags = excluded.tags,
                author_id = COALESCE(excluded.author_id, video_metadata_cache.author_id),
                updated_at = excluded.updated_at",
            params![
                row.normalized_url,
                row.platform,
                row.title,
                row.description,
                row.author_username,
                row.author_display_name,
                row.author_avatar_url,
                row.author_verified,
                row.thumbnail_url,
                tags,
                row.author_id,
                row.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find(db: &Database, normalized_url: &str) -> Result<Option<MetadataRow>, DatabaseError> {
    let found = db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM video_metadata_cache WHERE normalized_url = ?1",
                params![normalized_url],
                MetadataRow::from_row,
            )
            .optional()?;
        Ok(row)
    })?;

    match found {
        Some((mut row, tags)) => {
            row.tags = from_json_column("tags", &tags)?;
            Ok(Some(row))
        }
        None => Ok(None),
    }
}

/// Replaces the cached author avatar after a fresher one was found.
pub fn update_avatar(
    db: &Database,
    normalized_url: &str,
    avatar_url: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE video_metadata_cache SET author_avatar_url = ?2, updated_at = ?3
             WHERE normalized_url = ?1",
            params![normalized_url, avatar_url, now_timestamp()],
        )?;
        Ok(())
    })
}
