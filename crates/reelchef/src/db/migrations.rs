//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order, each inside its own transaction.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_extraction_jobs_table",
        sql: include_str!("sql/001_create_extraction_jobs.sql"),
    },
    Migration {
        version: 2,
        description: "create_authors_table",
        sql: include_str!("sql/002_create_authors.sql"),
    },
    Migration {
        version: 3,
        description: "create_video_metadata_cache_table",
        sql: include_str!("sql/003_create_video_metadata_cache.sql"),
    },
    Migration {
        version: 4,
        description: "create_raw_extraction_cache_table",
        sql: include_str!("sql/004_create_raw_extraction_cache.sql"),
    },
    Migration {
        version: 5,
        description: "create_recipes_table",
        sql: include_str!("sql/005_create_recipes.sql"),
    },
    Migration {
        version: 6,
        description: "create_usage_counters_table",
        sql: include_str!("sql/006_create_usage_counters.sql"),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        let batch = format!(
            "BEGIN;\n{}\nINSERT INTO _migrations (version, description) VALUES ({}, '{}');\nCOMMIT;",
            migration.sql, migration.version, migration.description
        );

        if let Err(e) = conn.execute_batch(&batch) {
            // Leave the connection usable for the caller's error path.
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            });
        }
    }

    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
