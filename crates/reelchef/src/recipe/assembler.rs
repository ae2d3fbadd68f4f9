use std::sync::Arc;

use log::warn;
use uuid::Uuid;

use super::Recipe;
use crate::db::recipe_repo::{self, RecipeRow};
use crate::db::{now_timestamp, to_json_column, Database, DatabaseError};
use crate::error::ExtractionError;
use crate::extraction::ExtractionOutcome;
use crate::job::ExtractionJob;
use crate::language::TargetLanguage;
use crate::metadata::{CachedMetadata, MetadataService};
use crate::notify::{messages, Notifier};
use crate::usage::UsageRecorder;

pub const UNTITLED: &str = "Untitled recipe";

/// Builds the final recipe from a draft plus whatever metadata is known,
/// and performs the side effects of a completed job.
#[derive(Clone)]
pub struct RecipeAssembler {
    db: Database,
    metadata: MetadataService,
    usage: Arc<dyn UsageRecorder>,
    notifier: Arc<dyn Notifier>,
}

impl RecipeAssembler {
    pub fn new(
        db: Database,
        metadata: MetadataService,
        usage: Arc<dyn UsageRecorder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            metadata,
            usage,
            notifier,
        }
    }

    /// Builds the recipe row for `job`. Saving it is left to
    /// [`JobStore::complete`](crate::job::JobStore::complete), which writes
    /// it together with the job's final state.
    ///
    /// A freshly looked-up thumbnail wins over the cached one; when neither
    /// exists the recipe has none.
    pub async fn assemble(
        &self,
        job: &ExtractionJob,
        outcome: &ExtractionOutcome,
        metadata: Option<&CachedMetadata>,
    ) -> Result<RecipeRow, ExtractionError> {
        let draft = &outcome.draft;
        let video = metadata.map(|m| &m.metadata);

        let fresh_thumbnail = self
            .metadata
            .fresh_thumbnail(job.platform, &job.source_url)
            .await;
        let thumbnail_url = fresh_thumbnail.or_else(|| video.and_then(|v| v.thumbnail_url.clone()));

        let avatar_url = match metadata {
            Some(entry) => self.metadata.author_avatar(entry).await?,
            None => None,
        };
        let author = video.and_then(|v| v.author.as_ref());

        let title = draft
            .title
            .clone()
            .or_else(|| video.and_then(|v| v.title.clone()).filter(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| UNTITLED.to_string());

        let language = match job.target_language {
            TargetLanguage::Language(lang) => Some(lang),
            TargetLanguage::Original => outcome.detected_language,
        };

        Ok(RecipeRow {
            id: Uuid::new_v4().to_string(),
            user_id: job.user_id.clone(),
            job_id: job.id.clone(),
            source_url: job.source_url.clone(),
            normalized_url: job.normalized_url.clone(),
            platform: job.platform.as_str().to_string(),
            language: language.map(|l| l.code().to_string()),
            title,
            description: draft.description.clone(),
            ingredients: to_json_column("ingredients", &draft.ingredients)?,
            instructions: to_json_column("instructions", &draft.instructions)?,
            equipment: to_json_column("equipment", &draft.equipment)?,
            tips: to_json_column("tips", &draft.tips)?,
            nutrition: draft.nutrition.as_ref().map(|n| to_json_column("nutrition", n)).transpose()?,
            confidence: outcome.confidence,
            thumbnail_url,
            author_id: metadata.and_then(|m| m.author_id),
            author_username: author.map(|a| a.username.clone()),
            author_display_name: author.and_then(|a| a.display_name.clone()),
            author_avatar_url: avatar_url,
            created_at: now_timestamp(),
        })
    }

    /// Usage accounting and the success notification. Neither can undo a
    /// completed job, so failures are only logged.
    pub async fn record_completion(&self, job: &ExtractionJob, recipe: &Recipe) {
        if let Err(e) = self.usage.record_extraction(&job.user_id) {
            warn!("Failed to record usage for job {}: {}", job.id, e);
        }
        self.send(job, &messages::success(&recipe.title)).await;
    }

    /// Sends `message` to the job's channel, if it has one.
    pub async fn send(&self, job: &ExtractionJob, message: &str) {
        let Some(channel) = job.notify_channel.as_deref() else {
            return;
        };
        if let Err(e) = self.notifier.notify(channel, message).await {
            warn!("Notification for job {} failed: {}", job.id, e);
        }
    }

    pub fn find(&self, recipe_id: &str) -> Result<Option<Recipe>, DatabaseError> {
        recipe_repo::find_by_id(&self.db, recipe_id)?
            .map(Recipe::from_row)
            .transpose()
    }

    /// The user's most recent recipe from `normalized_url`.
    pub fn find_existing(
        &self,
        user_id: &str,
        normalized_url: &str,
    ) -> Result<Option<Recipe>, DatabaseError> {
        recipe_repo::find_latest_for_source(&self.db, user_id, normalized_url)?
            .map(Recipe::from_row)
            .transpose()
    }
}
