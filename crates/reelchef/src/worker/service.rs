use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::request::{Collaborators, ExtractionRequest, ServiceOptions};
use super::single_flight::InFlightLocks;
use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::config::Config;
use crate::db::{default_database_path, Database, DatabaseError};
use crate::error::{self, ConfigError, SubmitError};
use crate::extraction::RecipeExtractor;
use crate::job::{ExtractionJob, JobError, JobPage, JobQuery, JobStore, NewJob};
use crate::link::{self, LinkResolver};
use crate::metadata::MetadataService;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::recipe::{Recipe, RecipeAssembler};
use crate::sanitize;

pub const DISPATCH_FAILED: &str = "Could not dispatch extraction job";
pub const ABANDONED: &str = "Extraction was interrupted before it finished";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Stand-in deadline for waits too long to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

type RunningJobs = Arc<Mutex<Vec<(String, JoinHandle<()>)>>>;

/// Entry point for callers: creates jobs, runs them in the background and
/// answers reads.
#[derive(Clone)]
pub struct ExtractionService {
    jobs: JobStore,
    pipeline: Arc<Pipeline>,
    recipes: RecipeAssembler,
    resolver: LinkResolver,
    permits: Arc<Semaphore>,
    locks: Option<Arc<InFlightLocks>>,
    running: RunningJobs,
}

impl ExtractionService {
    pub fn new(db: Database, collaborators: Collaborators, options: ServiceOptions) -> Self {
        let jobs = JobStore::new(db.clone(), JobProgressBroadcaster::default());
        let metadata = MetadataService::new(
            db.clone(),
            collaborators.metadata,
            collaborators.media,
        );
        let recipes = RecipeAssembler::new(
            db.clone(),
            metadata.clone(),
            collaborators.usage,
            collaborators.notifier,
        );
        let pipeline = Pipeline::new(
            Arc::new(PipelineConfig {
                default_language: options.default_language,
            }),
            jobs.clone(),
            metadata,
            collaborators.transcripts,
            RecipeExtractor::new(db, collaborators.llm),
            recipes.clone(),
        );

        info!(
            "Extraction service ready: {} concurrent jobs, single-flight {}",
            options.max_concurrent_jobs,
            if options.single_flight { "on" } else { "off" }
        );

        Self {
            jobs,
            pipeline: Arc::new(pipeline),
            recipes,
            resolver: LinkResolver::new(options.resolve_timeout),
            permits: Arc::new(Semaphore::new(options.max_concurrent_jobs.max(1))),
            locks: options.single_flight.then(|| Arc::new(InFlightLocks::new())),
            running: RunningJobs::default(),
        }
    }

    /// Opens the configured database and wires up the HTTP adapters. Jobs
    /// left unfinished by an earlier process are failed first.
    pub fn from_config(config: &Config) -> error::Result<Self> {
        let db = Self::open_database(config)?;
        let collaborators = Collaborators::from_config(config, &db)?;
        let options = ServiceOptions::from_config(config);
        let stale_after = options.stale_after;

        let service = Self::new(db, collaborators, options);
        service.recover_stale(stale_after)?;
        Ok(service)
    }

    /// Fails unfinished jobs that have not changed for `older_than`. Jobs
    /// live only as long as the process that runs them, so such a job has
    /// no worker left.
    pub fn recover_stale(&self, older_than: Duration) -> Result<Vec<ExtractionJob>, JobError> {
        self.jobs.fail_stale(older_than, ABANDONED)
    }

    /// The database named in the config, or the per-user default.
    pub fn open_database(config: &Config) -> error::Result<Database> {
        let path = match &config.database_path {
            Some(path) => path.clone(),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "Could not determine a data directory; set database_path".to_string(),
            })?,
        };
        Ok(Database::open(&path)?)
    }

    /// Validates the link, records a `pending` job and starts it in the
    /// background. Returns as soon as the job exists; share links are
    /// expanded by the background task.
    pub async fn submit(&self, request: ExtractionRequest) -> Result<ExtractionJob, SubmitError> {
        let classification = link::classify(&request.source_url);
        if !classification.is_valid {
            return Err(SubmitError::InvalidUrl {
                platform: classification.platform,
                reason: classification
                    .error
                    .unwrap_or_else(|| link::classifier::UNSUPPORTED_PLATFORM.to_string()),
            });
        }

        let normalized_url = link::normalize(&request.source_url);
        let job = self.jobs.create(NewJob {
            user_id: request.user_id,
            source_url: request.source_url,
            normalized_url,
            platform: classification.platform,
            target_language: request.target_language,
            notify_channel: request.notify_channel,
        })?;
        info!(
            "Submitted job {} for {}",
            job.id,
            sanitize::redact_url(&job.normalized_url)
        );

        self.dispatch(job)
    }

    fn dispatch(&self, job: ExtractionJob) -> Result<ExtractionJob, SubmitError> {
        match Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn(self.clone().process(job.clone()));
                let mut running = self.running();
                running.retain(|(_, earlier)| !earlier.is_finished());
                running.push((job.id.clone(), task));
                Ok(job)
            }
            Err(e) => {
                error!("No async runtime to run job {}: {}", job.id, e);
                Ok(self.jobs.fail(&job.id, DISPATCH_FAILED)?)
            }
        }
    }

    async fn process(self, job: ExtractionJob) {
        let job = self.expand_share_link(job).await;
        let _in_flight = match &self.locks {
            Some(locks) => Some(locks.acquire(&job.normalized_url).await),
            None => None,
        };
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!("Job {} dropped: worker permits closed", job.id);
                if let Err(e) = self.jobs.fail(&job.id, DISPATCH_FAILED) {
                    error!("Could not mark job {} failed: {}", job.id, e);
                }
                return;
            }
        };

        debug!("Starting job {}", job.id);
        match self.pipeline.run(job).await {
            Ok(done) => debug!("Job {} finished as {}", done.id, done.status),
            Err(e) => error!("Job could not be finalized: {}", e),
        }
    }

    /// Re-points a job submitted as a share link at the video it redirects
    /// to, so caches and single-flight key on the canonical URL.
    async fn expand_share_link(&self, job: ExtractionJob) -> ExtractionJob {
        if !link::resolve::is_short_link(&job.source_url) {
            return job;
        }
        let expanded = self.resolver.expand(&job.source_url).await;
        if expanded == job.normalized_url {
            return job;
        }
        match self.jobs.set_normalized_url(&job.id, &expanded) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Keeping share link for job {}: {}", job.id, e);
                job
            }
        }
    }

    /// Gives running jobs up to `grace` to finish, then stops the rest and
    /// marks them failed. Returns the jobs failed this way.
    pub async fn shutdown(&self, grace: Duration) -> Vec<ExtractionJob> {
        let running = std::mem::take(&mut *self.running());
        let deadline = deadline_after(grace);

        let mut abandoned = Vec::new();
        for (job_id, mut task) in running {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                task.abort();
            }
            match self.jobs.fail(&job_id, ABANDONED) {
                Ok(job) => abandoned.push(job),
                Err(JobError::InvalidTransition { .. }) => {}
                Err(e) => error!("Could not mark job {} failed: {}", job_id, e),
            }
        }
        if !abandoned.is_empty() {
            info!("Stopped {} unfinished job(s)", abandoned.len());
        }
        abandoned
    }

    fn running(&self) -> MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<ExtractionJob>, JobError> {
        self.jobs.get(job_id)
    }

    pub fn list_jobs(&self, query: &JobQuery) -> Result<JobPage, JobError> {
        self.jobs.list(query)
    }

    pub fn recipe(&self, recipe_id: &str) -> Result<Option<Recipe>, DatabaseError> {
        self.recipes.find(recipe_id)
    }

    /// The user's most recent recipe from the same video, in whatever form
    /// the link was given.
    pub async fn existing_recipe(
        &self,
        user_id: &str,
        source_url: &str,
    ) -> Result<Option<Recipe>, DatabaseError> {
        let normalized_url = self.resolver.resolve(source_url).await;
        self.recipes.find_existing(user_id, &normalized_url)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.jobs.broadcaster().subscribe()
    }

    /// Waits until the job is `completed` or `failed`.
    pub async fn wait_for_terminal(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<ExtractionJob, JobError> {
        let deadline = deadline_after(timeout);
        let mut events = self.subscribe();

        loop {
            let job = self
                .get_job(job_id)?
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
            if job.is_terminal() {
                return Ok(job);
            }

            let wait = deadline.min(Instant::now() + POLL_INTERVAL);
            match tokio::time::timeout_at(wait, events.recv()).await {
                Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => {
                    if Instant::now() >= deadline {
                        return Err(JobError::Timeout(job_id.to_string()));
                    }
                }
            }
        }
    }
}

fn deadline_after(wait: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(wait).unwrap_or_else(|| now + FAR_FUTURE)
}
