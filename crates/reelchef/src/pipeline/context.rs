use crate::error::ExtractionError;
use crate::extraction::ExtractionOutcome;
use crate::job::ExtractionJob;
use crate::language::{Language, TargetLanguage};
use crate::metadata::CachedMetadata;

/// State carried from one pipeline step to the next.
pub struct PipelineContext {
    // Input, refreshed after every transition
    pub job: ExtractionJob,

    // Step 1 result, absent when the video has no metadata
    pub metadata: Option<CachedMetadata>,

    // Step 2 result
    pub transcript: Option<String>,

    // Step 3 results
    pub detected_language: Option<Language>,
    pub target: Option<TargetLanguage>,

    // Step 4 result
    pub outcome: Option<ExtractionOutcome>,
}

impl PipelineContext {
    pub fn new(job: ExtractionJob) -> Self {
        Self {
            job,
            metadata: None,
            transcript: None,
            detected_language: None,
            target: None,
            outcome: None,
        }
    }

    /// Caption text from the video metadata.
    pub fn description(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.metadata.description.as_deref())
            .filter(|d| !d.trim().is_empty())
    }

    pub fn transcript(&self) -> Result<&str, ExtractionError> {
        self.transcript
            .as_deref()
            .ok_or_else(|| missing("transcript"))
    }

    pub fn target(&self) -> Result<TargetLanguage, ExtractionError> {
        self.target.ok_or_else(|| missing("target language"))
    }

    pub fn outcome(&self) -> Result<&ExtractionOutcome, ExtractionError> {
        self.outcome.as_ref().ok_or_else(|| missing("extraction outcome"))
    }
}

fn missing(what: &str) -> ExtractionError {
    ExtractionError::Internal(format!("pipeline step produced no {}", what))
}
