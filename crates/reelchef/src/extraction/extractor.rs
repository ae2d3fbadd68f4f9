use std::sync::Arc;

use log::{debug, info, warn};

use super::draft::RecipeDraft;
use super::parse::parse_model_output;
use crate::db::extraction_repo::{self, RawExtractionRow};
use crate::db::{from_json_column, now_timestamp, to_json_column, Database};
use crate::error::ExtractionError;
use crate::language::{self, Language, TargetLanguage};
use crate::link::Platform;
use crate::llm::prompt::{build_extraction_prompt, build_user_message};
use crate::llm::LlmProvider;
use crate::sanitize;

/// Everything the model needs for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub normalized_url: &'a str,
    /// Already resolved through [`language::effective_target`].
    pub target: TargetLanguage,
    pub transcript: &'a str,
    pub source_url: &'a str,
    pub platform: Platform,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub draft: RecipeDraft,
    pub confidence: f64,
    pub detected_language: Option<Language>,
    pub cache_hit: bool,
}

/// Read-through cache in front of the language model.
#[derive(Clone)]
pub struct RecipeExtractor {
    db: Database,
    llm: Arc<dyn LlmProvider>,
}

impl RecipeExtractor {
    pub fn new(db: Database, llm: Arc<dyn LlmProvider>) -> Self {
        Self { db, llm }
    }

    /// Returns the cached draft for `(normalized_url, target)` or asks the
    /// model for one. Only successful drafts are cached.
    pub async fn get_or_extract(
        &self,
        input: &ExtractionInput<'_>,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let key = input.target.as_key();

        if let Some(row) = extraction_repo::find(&self.db, input.normalized_url, key)? {
            debug!(
                "Raw extraction cache hit for {} [{}]",
                sanitize::redact_url(input.normalized_url),
                key
            );
            return Ok(ExtractionOutcome {
                draft: from_json_column("draft", &row.draft)?,
                confidence: row.confidence,
                detected_language: row.detected_language.as_deref().and_then(Language::from_code),
                cache_hit: true,
            });
        }

        let detected = language::detect(input.transcript);
        let system_prompt = build_extraction_prompt(input.target, detected);
        let user_message = build_user_message(
            input.platform,
            input.source_url,
            input.description,
            input.transcript,
        );

        let raw = self
            .llm
            .complete(&system_prompt, &user_message)
            .await
            .map_err(|e| {
                warn!("{} completion failed: {}", self.llm.provider_name(), e);
                ExtractionError::Llm(e)
            })?;

        let parsed = parse_model_output(&raw).inspect_err(|e| {
            if matches!(e, ExtractionError::MalformedResponse(_)) {
                warn!(
                    "Unreadable reply from {} ({} chars): {}",
                    self.llm.provider_name(),
                    raw.len(),
                    e
                );
            }
        })?;

        let inserted = extraction_repo::insert(
            &self.db,
            &RawExtractionRow {
                normalized_url: input.normalized_url.to_string(),
                target_language: key.to_string(),
                detected_language: detected.map(|l| l.code().to_string()),
                draft: to_json_column("draft", &parsed.draft)?,
                confidence: parsed.confidence,
                created_at: now_timestamp(),
            },
        )?;
        info!(
            "Extracted recipe for {} [{}] with confidence {:.2}{}",
            sanitize::redact_url(input.normalized_url),
            key,
            parsed.confidence,
            if inserted { "" } else { " (cache already filled)" }
        );

        Ok(ExtractionOutcome {
            draft: parsed.draft,
            confidence: parsed.confidence,
            detected_language: detected,
            cache_hit: false,
        })
    }
}
