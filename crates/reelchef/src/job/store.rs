//! Job store with persistent database storage.
//!
//! Every state change is a read-check-write under the database lock, and
//! every successful change is published on the progress broadcaster.

use std::time::Duration;

use log::{debug, warn};
use rusqlite::Connection;
use uuid::Uuid;

use super::state::{ExtractionJob, JobStatus};
use super::JobError;
use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::db::job_repo::{self, JobFilter, JobRow};
use crate::db::recipe_repo::{self, RecipeRow};
use crate::db::{now_timestamp, timestamp_before, Database, DatabaseError};
use crate::language::TargetLanguage;
use crate::link::Platform;

const QUEUED_MESSAGE: &str = "Waiting to start";
const COMPLETED_MESSAGE: &str = "Recipe ready";
const FAILED_MESSAGE: &str = "Extraction failed";

/// Fields of a job known at submission time.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: Platform,
    pub target_language: TargetLanguage,
    pub notify_channel: Option<String>,
}

/// Listing parameters. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub user_id: Option<String>,
    pub status: Option<JobStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<ExtractionJob>,
    pub total: u64,
}

#[derive(Clone)]
pub struct JobStore {
    db: Database,
    broadcaster: JobProgressBroadcaster,
}

impl JobStore {
    pub fn new(db: Database, broadcaster: JobProgressBroadcaster) -> Self {
        Self { db, broadcaster }
    }

    pub fn broadcaster(&self) -> &JobProgressBroadcaster {
        &self.broadcaster
    }

    /// Records a new `pending` job.
    pub fn create(&self, new: NewJob) -> Result<ExtractionJob, JobError> {
        let now = now_timestamp();
        let row = JobRow {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            source_url: new.source_url,
            normalized_url: new.normalized_url,
            platform: new.platform.as_str().to_string(),
            target_language: new.target_language.as_key().to_string(),
            notify_channel: new.notify_channel,
            status: JobStatus::Pending.as_str().to_string(),
            progress: 0,
            message: Some(QUEUED_MESSAGE.to_string()),
            recipe_id: None,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        };
        job_repo::insert(&self.db, &row)?;

        let job = ExtractionJob::from_row(&row);
        debug!("Created job {} for user {}", job.id, job.user_id);
        self.publish(&job);
        Ok(job)
    }

    pub fn get(&self, id: &str) -> Result<Option<ExtractionJob>, JobError> {
        Ok(job_repo::find_by_id(&self.db, id)?.map(|row| ExtractionJob::from_row(&row)))
    }

    pub fn list(&self, query: &JobQuery) -> Result<JobPage, JobError> {
        let filter = JobFilter {
            user_id: query.user_id.clone(),
            status: query.status.map(|s| s.as_str().to_string()),
            limit: query.limit,
            offset: query.offset,
        };
        let (rows, total) = job_repo::query(&self.db, &filter)?;
        Ok(JobPage {
            jobs: rows.iter().map(ExtractionJob::from_row).collect(),
            total,
        })
    }

    /// Moves a job into `status` and raises its progress. Progress never
    /// goes down: a lower value than the current one is ignored.
    pub fn advance(
        &self,
        id: &str,
        status: JobStatus,
        progress: u8,
        message: &str,
    ) -> Result<ExtractionJob, JobError> {
        if status.is_terminal() {
            return Err(JobError::InvalidTransition {
                id: id.to_string(),
                from: status,
                to: status,
            });
        }
        self.transition(id, status, |row| {
            row.progress = row.progress.max(progress).min(100);
            row.message = Some(message.to_string());
        })
    }

    /// Records the canonical URL of a job submitted as a share link. Only a
    /// job that has not started yet may be re-pointed.
    pub fn set_normalized_url(
        &self,
        id: &str,
        normalized_url: &str,
    ) -> Result<ExtractionJob, JobError> {
        self.db.with_conn_as(|conn| {
            let mut row =
                job_repo::load(conn, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))?;
            let status = ExtractionJob::from_row(&row).status;
            if status != JobStatus::Pending {
                return Err(JobError::InvalidTransition {
                    id: id.to_string(),
                    from: status,
                    to: status,
                });
            }
            row.normalized_url = normalized_url.to_string();
            row.updated_at = now_timestamp();
            job_repo::store_normalized_url(conn, id, &row.normalized_url, &row.updated_at)?;
            Ok(ExtractionJob::from_row(&row))
        })
    }

    /// Saves the recipe and marks the analyzing job completed in one
    /// transaction: either both land or neither does.
    pub fn complete(&self, id: &str, recipe: &RecipeRow) -> Result<ExtractionJob, JobError> {
        self.transition_with(
            id,
            JobStatus::Completed,
            |row| {
                row.progress = 100;
                row.message = Some(COMPLETED_MESSAGE.to_string());
                row.recipe_id = Some(recipe.id.clone());
                row.error = None;
            },
            |conn| recipe_repo::insert_on(conn, recipe),
        )
    }

    /// Marks a job failed. Progress stays where it was.
    pub fn fail(&self, id: &str, error: &str) -> Result<ExtractionJob, JobError> {
        self.transition(id, JobStatus::Failed, |row| {
            row.message = Some(FAILED_MESSAGE.to_string());
            row.recipe_id = None;
            row.error = Some(error.to_string());
        })
    }

    /// Fails every unfinished job untouched for `older_than`. Such jobs
    /// belong to a worker that is gone; nothing else would ever finish them.
    pub fn fail_stale(
        &self,
        older_than: Duration,
        error: &str,
    ) -> Result<Vec<ExtractionJob>, JobError> {
        let Some(cutoff) = timestamp_before(older_than) else {
            return Ok(Vec::new());
        };
        let ids = self.db.with_conn(|conn| job_repo::find_stale(conn, &cutoff))?;

        let mut failed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fail(&id, error) {
                Ok(job) => failed.push(job),
                // Finished between the scan and the write.
                Err(JobError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if !failed.is_empty() {
            warn!("Failed {} stale job(s) left unfinished", failed.len());
        }
        Ok(failed)
    }

    fn transition<F>(&self, id: &str, to: JobStatus, apply: F) -> Result<ExtractionJob, JobError>
    where
        F: FnOnce(&mut JobRow),
    {
        self.transition_with(id, to, apply, |_| Ok(()))
    }

    /// Read-check-write of a job's state. `write` runs inside the same
    /// transaction, before the new state is stored.
    fn transition_with<F, W>(
        &self,
        id: &str,
        to: JobStatus,
        apply: F,
        write: W,
    ) -> Result<ExtractionJob, JobError>
    where
        F: FnOnce(&mut JobRow),
        W: FnOnce(&Connection) -> Result<(), DatabaseError>,
    {
        let job = self.db.with_conn_as(|conn| {
            let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
            let mut row =
                job_repo::load(&tx, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))?;
            let from = ExtractionJob::from_row(&row).status;
            if !from.can_transition_to(to) {
                return Err(JobError::InvalidTransition {
                    id: id.to_string(),
                    from,
                    to,
                });
            }

            row.status = to.as_str().to_string();
            apply(&mut row);
            row.updated_at = now_timestamp();
            write(&*tx)?;
            job_repo::store_state(&tx, &row)?;
            tx.commit().map_err(DatabaseError::from)?;
            Ok(ExtractionJob::from_row(&row))
        })?;

        debug!("Job {} -> {} ({}%)", job.id, job.status, job.progress);
        self.publish(&job);
        Ok(job)
    }

    fn publish(&self, job: &ExtractionJob) {
        self.broadcaster.send(JobProgressEvent::from_job(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::new(
            Database::open_in_memory().unwrap(),
            JobProgressBroadcaster::default(),
        )
    }

    fn recipe_row(id: &str, job_id: &str) -> RecipeRow {
        RecipeRow {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            job_id: job_id.to_string(),
            source_url: "https://www.youtube.com/shorts/abc123DEF45".to_string(),
            normalized_url: "https://www.youtube.com/shorts/abc123DEF45".to_string(),
            platform: "youtube".to_string(),
            language: None,
            title: "Rice".to_string(),
            description: None,
            ingredients: "[]".to_string(),
            instructions: "[]".to_string(),
            equipment: "[]".to_string(),
            tips: "[]".to_string(),
            nutrition: None,
            confidence: 0.5,
            thumbnail_url: None,
            author_id: None,
            author_username: None,
            author_display_name: None,
            author_avatar_url: None,
            created_at: now_timestamp(),
        }
    }

    fn new_job(user: &str) -> NewJob {
        NewJob {
            user_id: user.to_string(),
            source_url: "https://www.youtube.com/shorts/abc123DEF45?si=x".to_string(),
            normalized_url: "https://www.youtube.com/shorts/abc123DEF45".to_string(),
            platform: Platform::Youtube,
            target_language: TargetLanguage::Original,
            notify_channel: None,
        }
    }

    #[test]
    fn test_create_is_pending() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.recipe_id.is_none() && job.error.is_none());
        assert_eq!(store.get(&job.id).unwrap().unwrap(), job);
    }

    #[test]
    fn test_happy_path() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();

        store.advance(&job.id, JobStatus::FetchingTranscript, 10, "Looking up video").unwrap();
        store.advance(&job.id, JobStatus::FetchingTranscript, 30, "Got transcript").unwrap();
        store.advance(&job.id, JobStatus::Analyzing, 40, "Analyzing").unwrap();
        let done = store.complete(&job.id, &recipe_row("recipe-1", &job.id)).unwrap();

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.recipe_id.as_deref(), Some("recipe-1"));
        assert!(done.error.is_none());
    }

    #[test]
    fn test_progress_never_decreases() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        store.advance(&job.id, JobStatus::FetchingTranscript, 30, "a").unwrap();
        let after = store.advance(&job.id, JobStatus::FetchingTranscript, 10, "b").unwrap();
        assert_eq!(after.progress, 30);
        assert_eq!(after.message.as_deref(), Some("b"));

        let capped = store.advance(&job.id, JobStatus::Analyzing, 250, "c").unwrap();
        assert_eq!(capped.progress, 100);
    }

    #[test]
    fn test_fail_freezes_progress() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        store.advance(&job.id, JobStatus::FetchingTranscript, 20, "a").unwrap();

        let failed = store.fail(&job.id, "No transcript").unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.progress, 20);
        assert_eq!(failed.error.as_deref(), Some("No transcript"));
        assert!(failed.recipe_id.is_none());
    }

    #[test]
    fn test_terminal_jobs_are_frozen() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        store.fail(&job.id, "boom").unwrap();

        assert!(matches!(
            store.fail(&job.id, "again"),
            Err(JobError::InvalidTransition { from: JobStatus::Failed, .. })
        ));
        assert!(matches!(
            store.advance(&job.id, JobStatus::Analyzing, 50, "x"),
            Err(JobError::InvalidTransition { .. })
        ));
        assert_eq!(store.get(&job.id).unwrap().unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cannot_complete_before_analysis() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        assert!(matches!(
            store.complete(&job.id, &recipe_row("recipe-1", &job.id)),
            Err(JobError::InvalidTransition { from: JobStatus::Pending, to: JobStatus::Completed, .. })
        ));
        assert!(recipe_repo::find_by_id(&store.db, "recipe-1").unwrap().is_none());
        assert!(matches!(
            store.advance(&job.id, JobStatus::Completed, 100, "x"),
            Err(JobError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_complete_saves_recipe() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        store.advance(&job.id, JobStatus::Analyzing, 80, "a").unwrap();

        store.complete(&job.id, &recipe_row("recipe-1", &job.id)).unwrap();
        let saved = recipe_repo::find_by_id(&store.db, "recipe-1").unwrap().unwrap();
        assert_eq!(saved.job_id, job.id);
    }

    #[test]
    fn test_failed_recipe_write_leaves_job_running() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();
        store.advance(&job.id, JobStatus::Analyzing, 80, "a").unwrap();
        store
            .db
            .with_conn(|conn| recipe_repo::insert_on(conn, &recipe_row("first", &job.id)))
            .unwrap();

        // A second recipe for the same job violates the one-per-job rule.
        let err = store.complete(&job.id, &recipe_row("second", &job.id)).unwrap_err();
        assert!(matches!(err, JobError::Database(_)));

        let current = store.get(&job.id).unwrap().unwrap();
        assert_eq!(current.status, JobStatus::Analyzing);
        assert!(current.recipe_id.is_none());
        assert!(recipe_repo::find_by_id(&store.db, "second").unwrap().is_none());
    }

    #[test]
    fn test_set_normalized_url_only_while_pending() {
        let store = store();
        let job = store.create(new_job("user-1")).unwrap();

        let moved = store
            .set_normalized_url(&job.id, "https://www.youtube.com/shorts/zzz")
            .unwrap();
        assert_eq!(moved.normalized_url, "https://www.youtube.com/shorts/zzz");
        assert_eq!(moved.status, JobStatus::Pending);
        assert_eq!(store.get(&job.id).unwrap().unwrap(), moved);

        store.advance(&job.id, JobStatus::FetchingTranscript, 10, "a").unwrap();
        assert!(matches!(
            store.set_normalized_url(&job.id, "https://example.com/other"),
            Err(JobError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_fail_stale() {
        let store = store();
        let running = store.create(new_job("user-1")).unwrap();
        store.advance(&running.id, JobStatus::Analyzing, 50, "a").unwrap();
        let done = store.create(new_job("user-1")).unwrap();
        store.fail(&done.id, "boom").unwrap();

        assert!(store.fail_stale(Duration::from_secs(3600), "gone").unwrap().is_empty());

        let failed = store.fail_stale(Duration::ZERO, "gone").unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, running.id);
        assert_eq!(failed[0].error.as_deref(), Some("gone"));
        assert_eq!(failed[0].progress, 50);
        assert_eq!(store.get(&done.id).unwrap().unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_unknown_job() {
        let store = store();
        assert!(store.get("missing").unwrap().is_none());
        assert!(matches!(store.fail("missing", "x"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_list_by_user_and_status() {
        let store = store();
        let a = store.create(new_job("user-1")).unwrap();
        let b = store.create(new_job("user-1")).unwrap();
        store.create(new_job("user-2")).unwrap();
        store.fail(&a.id, "x").unwrap();

        let page = store
            .list(&JobQuery {
                user_id: Some("user-1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.jobs[0].id, b.id);

        let failed = store
            .list(&JobQuery {
                user_id: Some("user-1".to_string()),
                status: Some(JobStatus::Failed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(failed.total, 1);
        assert_eq!(failed.jobs[0].id, a.id);
    }

    #[test]
    fn test_changes_are_broadcast() {
        let store = store();
        let mut rx = store.broadcaster().subscribe();
        let job = store.create(new_job("user-1")).unwrap();
        store.advance(&job.id, JobStatus::FetchingTranscript, 10, "a").unwrap();

        let created = rx.try_recv().unwrap();
        assert_eq!(created.status, JobStatus::Pending);
        let advanced = rx.try_recv().unwrap();
        assert_eq!(advanced.status, JobStatus::FetchingTranscript);
        assert_eq!(advanced.progress, 10);
    }
}
