//! Per-user usage counters.

use rusqlite::{params, OptionalExtension};

use super::{now_timestamp, Database, DatabaseError};

/// Adds one to `metric` for `user_id` and returns the new value.
pub fn increment(db: &Database, user_id: &str, metric: &str) -> Result<u64, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        let count = conn.query_row(
            "INSERT INTO usage_counters (user_id, metric, count, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT (user_id, metric) DO UPDATE SET
                count = usage_counters.count + 1,
                updated_at = excluded.updated_at
             RETURNING count",
            params![user_id, metric, now],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

pub fn get(db: &Database, user_id: &str, metric: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn
            .query_row(
                "SELECT count FROM usage_counters WHERE user_id = ?1 AND metric = ?2",
                params![user_id, metric],
                |r| r.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    })
}
