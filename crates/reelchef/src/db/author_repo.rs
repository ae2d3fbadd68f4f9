//! Author directory: one row per (platform, username).

use rusqlite::{params, OptionalExtension, Row};

use super::{now_timestamp, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRow {
    pub id: i64,
    pub platform: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl AuthorRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            platform: row.get("platform")?,
            username: row.get("username")?,
            display_name: row.get("display_name")?,
            avatar_url: row.get("avatar_url")?,
            verified: row.get("verified")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Fields an upsert may set. `None` never erases a value already on record.
#[derive(Debug, Clone, Default)]
pub struct AuthorUpsert<'a> {
    pub platform: &'a str,
    pub username: &'a str,
    pub display_name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub verified: bool,
}

/// Inserts or refreshes an author and returns its id.
pub fn upsert(db: &Database, author: &AuthorUpsert<'_>) -> Result<i64, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        let id = conn.query_row(
            "INSERT INTO authors (platform, username, display_name, avatar_url, verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (platform, username) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, authors.display_name),
                avatar_url = COALESCE(excluded.avatar_url, authors.avatar_url),
                verified = MAX(excluded.verified, authors.verified),
                updated_at = excluded.updated_at
             RETURNING id",
            params![
                author.platform,
                author.username,
                author.display_name,
                author.avatar_url,
                author.verified,
                now,
            ],
            |r| r.get(0),
        )?;
        Ok(id)
    })
}

/// Replaces the avatar of an existing author.
pub fn update_avatar(db: &Database, id: i64, avatar_url: &str) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE authors SET avatar_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, avatar_url, now],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<AuthorRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM authors WHERE id = ?1",
                params![id],
                AuthorRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn find(
    db: &Database,
    platform: &str,
    username: &str,
) -> Result<Option<AuthorRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM authors WHERE platform = ?1 AND username = ?2",
                params![platform, username],
                AuthorRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}
