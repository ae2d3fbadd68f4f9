use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::ExtractionError;
use crate::extraction::{ExtractionInput, RecipeExtractor};
use crate::job::{ExtractionJob, JobError, JobStore};
use crate::language;
use crate::metadata::MetadataService;
use crate::notify::messages;
use crate::recipe::{Recipe, RecipeAssembler};
use crate::sanitize;
use crate::transcript::TranscriptProvider;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::progress::Stage;

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    jobs: JobStore,
    metadata: MetadataService,
    transcripts: Arc<dyn TranscriptProvider>,
    extractor: RecipeExtractor,
    assembler: RecipeAssembler,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        jobs: JobStore,
        metadata: MetadataService,
        transcripts: Arc<dyn TranscriptProvider>,
        extractor: RecipeExtractor,
        assembler: RecipeAssembler,
    ) -> Self {
        Self {
            config,
            jobs,
            metadata,
            transcripts,
            extractor,
            assembler,
        }
    }

    /// Runs a pending job to a terminal state and returns it.
    ///
    /// Every error, including a panic inside a step, ends as a `failed` job.
    /// The only error returned is the job store refusing to record the end.
    pub async fn run(&self, job: ExtractionJob) -> Result<ExtractionJob, JobError> {
        let span = info_span!("pipeline",
            job_id = %job.id,
            platform = %job.platform,
            url = %sanitize::redact_url(&job.source_url),
            url_hash = %sanitize::hash_url(&job.normalized_url),
        );
        let original = job.clone();

        let outcome = AssertUnwindSafe(self.execute(PipelineContext::new(job)))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let err = match outcome {
            Ok(Ok(job)) => return Ok(job),
            Ok(Err(e)) => e,
            Err(panic) => ExtractionError::Internal(panic_message(panic.as_ref())),
        };
        self.fail(&original, err).instrument(span).await
    }

    async fn execute(&self, mut ctx: PipelineContext) -> Result<ExtractionJob, ExtractionError> {
        // Step 1: Video metadata
        self.step_resolve_metadata(&mut ctx)
            .instrument(info_span!("resolve_metadata"))
            .await?;

        // Step 2: Transcript
        self.step_fetch_transcript(&mut ctx)
            .instrument(info_span!("fetch_transcript"))
            .await?;

        // Step 3: Source and target language
        {
            let _step = info_span!("choose_language").entered();
            self.step_choose_language(&mut ctx)?;
        }

        // Step 4: Draft from cache or model
        self.step_extract(&mut ctx)
            .instrument(info_span!("extract"))
            .await?;

        // Step 5+6: Recipe and completion
        self.step_assemble(&mut ctx)
            .instrument(info_span!("assemble"))
            .await
    }

    async fn step_resolve_metadata(&self, ctx: &mut PipelineContext) -> Result<(), ExtractionError> {
        self.report(ctx, Stage::LookingUp).await?;

        let job = &ctx.job;
        ctx.metadata = match self
            .metadata
            .get_or_fetch(&job.normalized_url, job.platform, &job.source_url)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "Continuing without metadata");
                None
            }
        };
        Ok(())
    }

    async fn step_fetch_transcript(&self, ctx: &mut PipelineContext) -> Result<(), ExtractionError> {
        self.report(ctx, Stage::FetchingTranscript).await?;

        let hint = language::transcript_hint(
            ctx.job.target_language,
            ctx.description(),
            self.config.default_language,
        );
        debug!(
            provider = self.transcripts.provider_name(),
            hint = hint.map(|l| l.code()).unwrap_or("none"),
            "Fetching transcript"
        );
        let transcript = self.transcripts.fetch(&ctx.job.source_url, hint).await?;
        if transcript.trim().is_empty() {
            return Err(ExtractionError::EmptyTranscript);
        }
        ctx.transcript = Some(transcript);

        self.report(ctx, Stage::TranscriptReady).await
    }

    fn step_choose_language(&self, ctx: &mut PipelineContext) -> Result<(), ExtractionError> {
        let detected = language::detect(ctx.transcript()?);
        let target = language::effective_target(
            ctx.job.target_language,
            detected,
            self.config.default_language,
        );
        debug!(
            detected = detected.map(|l| l.code()).unwrap_or("unknown"),
            target = target.as_key(),
            "Resolved languages"
        );
        ctx.detected_language = detected;
        ctx.target = Some(target);
        Ok(())
    }

    async fn step_extract(&self, ctx: &mut PipelineContext) -> Result<(), ExtractionError> {
        self.report(ctx, Stage::Analyzing).await?;

        let input = ExtractionInput {
            normalized_url: &ctx.job.normalized_url,
            target: ctx.target()?,
            transcript: ctx.transcript()?,
            source_url: &ctx.job.source_url,
            platform: ctx.job.platform,
            description: ctx.description(),
        };
        let mut outcome = self.extractor.get_or_extract(&input).await?;
        if outcome.detected_language.is_none() {
            outcome.detected_language = ctx.detected_language;
        }
        debug!(cache_hit = outcome.cache_hit, confidence = outcome.confidence, "Draft ready");
        ctx.outcome = Some(outcome);

        self.report(ctx, Stage::Extracted).await
    }

    async fn step_assemble(&self, ctx: &mut PipelineContext) -> Result<ExtractionJob, ExtractionError> {
        self.report(ctx, Stage::Saving).await?;

        // The cached record is canonical; fall back to what step 1 saw.
        let metadata = match self.metadata.cached(&ctx.job.normalized_url) {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => ctx.metadata.take(),
            Err(e) => {
                warn!(error = %e, "Metadata cache unreadable, using earlier lookup");
                ctx.metadata.take()
            }
        };

        let row = self
            .assembler
            .assemble(&ctx.job, ctx.outcome()?, metadata.as_ref())
            .await?;
        let recipe = Recipe::from_row(row.clone())?;
        let job = self.jobs.complete(&ctx.job.id, &row)?;
        info!(recipe_id = %recipe.id, "Job completed");

        self.assembler.record_completion(&job, &recipe).await;
        Ok(job)
    }

    async fn report(&self, ctx: &mut PipelineContext, stage: Stage) -> Result<(), ExtractionError> {
        ctx.job = self
            .jobs
            .advance(&ctx.job.id, stage.status(), stage.progress(), stage.message())?;
        if let Some(message) = stage.notification() {
            self.assembler.send(&ctx.job, message).await;
        }
        Ok(())
    }

    async fn fail(&self, job: &ExtractionJob, err: ExtractionError) -> Result<ExtractionJob, JobError> {
        match &err {
            ExtractionError::NotARecipe(reason) => info!(reason = %reason, "Video is not a recipe"),
            ExtractionError::Transcript(_) | ExtractionError::EmptyTranscript => {
                warn!(error = %err, "Transcript unavailable")
            }
            _ => error!(error = %err, "Job failed"),
        }

        let message = err.user_message();
        let failed = match self.jobs.fail(&job.id, &message) {
            Ok(failed) => failed,
            Err(JobError::InvalidTransition { .. }) => {
                // Already terminal, e.g. a panic after completion was recorded.
                return self
                    .jobs
                    .get(&job.id)?
                    .ok_or_else(|| JobError::NotFound(job.id.clone()));
            }
            Err(e) => return Err(e),
        };

        self.assembler
            .send(&failed, &messages::failure(&message))
            .await;
        Ok(failed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::JobProgressBroadcaster;
    use crate::db::{extraction_repo, recipe_repo, Database};
    use crate::error::GENERIC_FAILURE;
    use crate::job::{JobStatus, NewJob};
    use crate::language::{Language, TargetLanguage};
    use crate::link::Platform;
    use crate::llm::{LlmError, LlmProvider};
    use crate::metadata::{NoopMediaResolver, NoopMetadataProvider};
    use crate::notify::NoopNotifier;
    use crate::transcript::TranscriptError;
    use crate::usage::SqliteUsageRecorder;
    use async_trait::async_trait;

    const TRANSCRIPT: &str = "Today we make a quick tomato pasta. Boil the spaghetti in salted water, \
        fry two cloves of garlic in olive oil, add a can of tomatoes and simmer for ten minutes.";

    const REPLY: &str = r#"{"isRecipe": true, "confidence": 0.9, "title": "Tomato pasta",
        "ingredients": [{"name": "spaghetti"}, {"name": "garlic", "quantity": "2", "unit": "cloves"}],
        "instructions": ["Boil the spaghetti.", "Fry the garlic.", "Simmer with tomatoes."]}"#;

    struct FixedTranscript(Result<String, TranscriptError>);

    #[async_trait]
    impl TranscriptProvider for FixedTranscript {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        async fn fetch(
            &self,
            _source_url: &str,
            _language: Option<Language>,
        ) -> Result<String, TranscriptError> {
            self.0.clone()
        }
    }

    enum Reply {
        Text(&'static str),
        Panic,
    }

    struct FixedLlm(Reply);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            match self.0 {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Panic => panic!("model client blew up"),
            }
        }
    }

    struct Fixture {
        db: Database,
        jobs: JobStore,
        pipeline: Pipeline,
    }

    fn fixture(transcript: Result<String, TranscriptError>, reply: Reply) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let jobs = JobStore::new(db.clone(), JobProgressBroadcaster::default());
        let metadata = MetadataService::new(
            db.clone(),
            Arc::new(NoopMetadataProvider),
            Arc::new(NoopMediaResolver),
        );
        let assembler = RecipeAssembler::new(
            db.clone(),
            metadata.clone(),
            Arc::new(SqliteUsageRecorder::new(db.clone())),
            Arc::new(NoopNotifier),
        );
        let pipeline = Pipeline::new(
            Arc::new(PipelineConfig::default()),
            jobs.clone(),
            metadata,
            Arc::new(FixedTranscript(transcript)),
            RecipeExtractor::new(db.clone(), Arc::new(FixedLlm(reply))),
            assembler,
        );
        Fixture { db, jobs, pipeline }
    }

    impl Fixture {
        fn job(&self) -> ExtractionJob {
            self.jobs
                .create(NewJob {
                    user_id: "user-1".to_string(),
                    source_url: "https://www.youtube.com/shorts/abc123DEF45".to_string(),
                    normalized_url: "https://www.youtube.com/shorts/abc123DEF45".to_string(),
                    platform: Platform::Youtube,
                    target_language: TargetLanguage::Original,
                    notify_channel: None,
                })
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_run_completes_job() {
        let fx = fixture(Ok(TRANSCRIPT.to_string()), Reply::Text(REPLY));
        let job = fx.pipeline.run(fx.job()).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());
        let recipe = recipe_repo::find_by_id(&fx.db, job.recipe_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(recipe.title, "Tomato pasta");
        assert_eq!(recipe.language.as_deref(), Some("en"));
        // English video, keep-original request: stored under the English bucket.
        assert!(extraction_repo::find(&fx.db, &job.normalized_url, "en")
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_transcript_not_found_fails_job() {
        let fx = fixture(
            Err(TranscriptError::NotFound("No transcript is available for this video.".to_string())),
            Reply::Text(REPLY),
        );
        let job = fx.pipeline.run(fx.job()).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("No transcript is available for this video."));
        assert_eq!(job.progress, Stage::FetchingTranscript.progress());
        assert!(job.recipe_id.is_none());
        assert_eq!(extraction_repo::count_for_url(&fx.db, &job.normalized_url).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_transcript_fails_job() {
        let fx = fixture(Ok("  \n ".to_string()), Reply::Text(REPLY));
        let job = fx.pipeline.run(fx.job()).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(TranscriptError::GENERIC_MESSAGE));
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_failure() {
        let fx = fixture(Ok(TRANSCRIPT.to_string()), Reply::Panic);
        let job = fx.pipeline.run(fx.job()).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(GENERIC_FAILURE));
        assert_eq!(job.progress, Stage::Analyzing.progress());
    }

    #[tokio::test]
    async fn test_progress_events_never_decrease() {
        let fx = fixture(Ok(TRANSCRIPT.to_string()), Reply::Text(REPLY));
        let mut events = fx.jobs.broadcaster().subscribe();
        let job = fx.pipeline.run(fx.job()).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            assert_eq!(event.job_id, job.id);
            seen.push(event.progress);
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
