//! Job repository: CRUD operations for the `extraction_jobs` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: String,
    pub user_id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: String,
    pub target_language: String,
    pub notify_channel: Option<String>,
    pub status: String,
    pub progress: u8,
    pub message: Option<String>,
    pub recipe_id: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            source_url: row.get("source_url")?,
            normalized_url: row.get("normalized_url")?,
            platform: row.get("platform")?,
            target_language: row.get("target_language")?,
            notify_channel: row.get("notify_channel")?,
            status: row.get("status")?,
            progress: row.get("progress")?,
            message: row.get("message")?,
            recipe_id: row.get("recipe_id")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO extraction_jobs (id, user_id, source_url, normalized_url, platform,
             target_language, notify_channel, status, progress, message, recipe_id, error,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.id,
                job.user_id,
                job.source_url,
                job.normalized_url,
                job.platform,
                job.target_language,
                job.notify_channel,
                job.status,
                job.progress,
                job.message,
                job.recipe_id,
                job.error,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| load(conn, id))
}

/// Reads a job on an already-locked connection.
pub(crate) fn load(conn: &Connection, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM extraction_jobs WHERE id = ?1",
            params![id],
            JobRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Writes the mutable state columns of a job on an already-locked connection.
/// Identity columns (`user_id`, URLs, language, `created_at`) are left alone;
/// see [`store_normalized_url`] for the one URL rewrite a job may get.
pub(crate) fn store_state(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE extraction_jobs SET status = ?2, progress = ?3, message = ?4, recipe_id = ?5,
         error = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            job.id,
            job.status,
            job.progress,
            job.message,
            job.recipe_id,
            job.error,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Queries jobs with filters, newest first, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref user_id) = filter.user_id {
            conditions.push(format!("user_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(user_id.clone()));
        }
        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM extraction_jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = filter.limit.unwrap_or(50) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        // rowid breaks ties between jobs created within the same millisecond.
        let query_sql = format!(
            "SELECT * FROM extraction_jobs {} ORDER BY created_at DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Replaces the canonical URL once a share link has been expanded.
pub(crate) fn store_normalized_url(
    conn: &Connection,
    id: &str,
    normalized_url: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE extraction_jobs SET normalized_url = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, normalized_url, updated_at],
    )?;
    Ok(())
}

/// IDs of jobs that are neither completed nor failed and have not changed
/// since `cutoff`.
pub(crate) fn find_stale(conn: &Connection, cutoff: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM extraction_jobs
         WHERE status NOT IN ('completed', 'failed') AND updated_at <= ?1
         ORDER BY created_at",
    )?;
    let ids = stmt
        .query_map(params![cutoff], |r| r.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_job(id: &str) -> JobRow {
        JobRow {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            source_url: "https://www.youtube.com/shorts/abcdef123?si=x".to_string(),
            normalized_url: "https://www.youtube.com/shorts/abcdef123".to_string(),
            platform: "youtube".to_string(),
            target_language: "original".to_string(),
            notify_channel: None,
            status: "pending".to_string(),
            progress: 0,
            message: Some("Queued".to_string()),
            recipe_id: None,
            error: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert(&db, &sample_job("job-1")).unwrap();

        let found = find_by_id(&db, "job-1").unwrap().unwrap();
        assert_eq!(found, sample_job("job-1"));
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_store_state_leaves_identity_alone() {
        let db = test_db();
        insert(&db, &sample_job("job-2")).unwrap();

        let mut job = sample_job("job-2");
        job.status = "failed".to_string();
        job.progress = 20;
        job.error = Some("No transcript".to_string());
        job.source_url = "https://example.com/changed".to_string();
        db.with_conn(|conn| store_state(conn, &job)).unwrap();

        let found = find_by_id(&db, "job-2").unwrap().unwrap();
        assert_eq!(found.status, "failed");
        assert_eq!(found.progress, 20);
        assert_eq!(found.error.as_deref(), Some("No transcript"));
        assert_eq!(found.source_url, sample_job("job-2").source_url);
    }

    #[test]
    fn test_progress_out_of_range_rejected() {
        let db = test_db();
        let mut job = sample_job("job-3");
        job.progress = 101;
        assert!(insert(&db, &job).is_err());
    }

    #[test]
    fn test_query_filters_by_user_and_status() {
        let db = test_db();
        insert(&db, &sample_job("a")).unwrap();

        let mut other_user = sample_job("b");
        other_user.user_id = "user-2".to_string();
        insert(&db, &other_user).unwrap();

        let mut done = sample_job("c");
        done.status = "completed".to_string();
        insert(&db, &done).unwrap();

        let (rows, total) = query(
            &db,
            &JobFilter {
                user_id: Some("user-1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);

        let (rows, total) = query(
            &db,
            &JobFilter {
                user_id: Some("user-1".to_string()),
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, "c");
    }

    #[test]
    fn test_query_pagination_newest_first() {
        let db = test_db();
        for i in 0..10 {
            let mut job = sample_job(&format!("p{}", i));
            job.created_at = format!("2026-01-{:02}T00:00:00.000Z", i + 1);
            insert(&db, &job).unwrap();
        }

        let (rows, total) = query(
            &db,
            &JobFilter {
                limit: Some(3),
                offset: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 10);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p8", "p7", "p6"]);
    }

    #[test]
    fn test_find_stale_skips_terminal_and_recent() {
        let db = test_db();
        insert(&db, &sample_job("old-pending")).unwrap();

        let mut old_done = sample_job("old-done");
        old_done.status = "completed".to_string();
        insert(&db, &old_done).unwrap();

        let mut recent = sample_job("recent");
        recent.status = "analyzing".to_string();
        recent.updated_at = "2026-03-01T00:00:00.000Z".to_string();
        insert(&db, &recent).unwrap();

        let stale = db
            .with_conn(|conn| find_stale(conn, "2026-02-01T00:00:00.000Z"))
            .unwrap();
        assert_eq!(stale, vec!["old-pending".to_string()]);
    }

    #[test]
    fn test_store_normalized_url() {
        let db = test_db();
        insert(&db, &sample_job("short")).unwrap();
        db.with_conn(|conn| {
            store_normalized_url(
                conn,
                "short",
                "https://www.tiktok.com/@chef/video/1",
                "2026-01-02T00:00:00.000Z",
            )
        })
        .unwrap();

        let found = find_by_id(&db, "short").unwrap().unwrap();
        assert_eq!(found.normalized_url, "https://www.tiktok.com/@chef/video/1");
        assert_eq!(found.updated_at, "2026-01-02T00:00:00.000Z");
        assert_eq!(found.source_url, sample_job("short").source_url);
    }
}
