//! Test harness running the whole service against fakes.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reelchef::db::Database;
use reelchef::language::{Language, TargetLanguage};
use reelchef::usage::SqliteUsageRecorder;
use reelchef::{Collaborators, ExtractionJob, ExtractionRequest, ExtractionService, ServiceOptions};

use super::fakes::{FakeLlm, FakeMedia, FakeMetadata, FakeTranscripts, RecordingNotifier};
use super::{ENGLISH_TRANSCRIPT, RECIPE_REPLY};

const JOB_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestHarness {
    pub db: Database,
    pub service: ExtractionService,
    pub transcripts: Arc<FakeTranscripts>,
    pub llm: Arc<FakeLlm>,
    pub metadata: Arc<FakeMetadata>,
    pub notifier: Arc<RecordingNotifier>,
    pub usage: Arc<SqliteUsageRecorder>,
}

impl TestHarness {
    /// English transcript, a valid recipe reply, no metadata.
    pub fn new() -> Self {
        Self::build(FakeLlm::new(RECIPE_REPLY), FakeMedia::default(), Self::options())
    }

    pub fn with_llm(llm: FakeLlm) -> Self {
        Self::build(llm, FakeMedia::default(), Self::options())
    }

    pub fn with_media(media: FakeMedia) -> Self {
        Self::build(FakeLlm::new(RECIPE_REPLY), media, Self::options())
    }

    pub fn options() -> ServiceOptions {
        ServiceOptions {
            default_language: Language::En,
            max_concurrent_jobs: 4,
            single_flight: true,
            resolve_timeout: Duration::from_secs(1),
            stale_after: Duration::from_secs(30 * 60),
        }
    }

    pub fn build(llm: FakeLlm, media: FakeMedia, options: ServiceOptions) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let transcripts = Arc::new(FakeTranscripts::new(ENGLISH_TRANSCRIPT));
        let llm = Arc::new(llm);
        let metadata = Arc::new(FakeMetadata::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let usage = Arc::new(SqliteUsageRecorder::new(db.clone()));

        let service = ExtractionService::new(
            db.clone(),
            Collaborators {
                transcripts: transcripts.clone(),
                llm: llm.clone(),
                metadata: metadata.clone(),
                media: Arc::new(media),
                notifier: notifier.clone(),
                usage: usage.clone(),
            },
            options,
        );

        Self {
            db,
            service,
            transcripts,
            llm,
            metadata,
            notifier,
            usage,
        }
    }

    /// Submits a keep-original request and waits for the job to end.
    pub async fn extract(&self, user: &str, url: &str) -> ExtractionJob {
        self.extract_request(ExtractionRequest::new(user, url)).await
    }

    pub async fn extract_in(&self, user: &str, url: &str, target: TargetLanguage) -> ExtractionJob {
        self.extract_request(ExtractionRequest::new(user, url).with_target(target))
            .await
    }

    pub async fn extract_request(&self, request: ExtractionRequest) -> ExtractionJob {
        let job = self
            .service
            .submit(request)
            .await
            .expect("Failed to submit job");
        self.service
            .wait_for_terminal(&job.id, JOB_TIMEOUT)
            .await
            .expect("Job did not finish")
    }
}
