use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::job::JobError;
use crate::link::Platform;
use crate::llm::LlmError;
use crate::transcript::TranscriptError;

#[derive(Error, Debug)]
pub enum ReelchefError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Submission rejected: {0}")]
    Submit(#[from] SubmitError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Rejections raised before a job exists.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{reason}")]
    InvalidUrl { platform: Platform, reason: String },

    #[error("Failed to create job: {0}")]
    Database(#[from] DatabaseError),

    #[error("Failed to create job: {0}")]
    Job(#[from] JobError),
}

/// Anything that ends a running job.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Transcript unavailable: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Transcript was empty")]
    EmptyTranscript,

    #[error("Not a recipe: {0}")]
    NotARecipe(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Job bookkeeping failed: {0}")]
    Job(#[from] JobError),

    #[error("{0}")]
    Internal(String),
}

pub const GENERIC_FAILURE: &str = "Something went wrong while extracting the recipe.";

impl ExtractionError {
    /// Message recorded on the job and shown to the user. Upstream detail
    /// stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ExtractionError::Transcript(e) => e.user_message(),
            ExtractionError::EmptyTranscript => TranscriptError::GENERIC_MESSAGE.to_string(),
            ExtractionError::NotARecipe(reason) => reason.clone(),
            ExtractionError::MalformedResponse(_) => {
                "The recipe could not be read from the analysis. Please try again.".to_string()
            }
            ExtractionError::EmptyResponse => {
                "The analysis returned no result. Please try again.".to_string()
            }
            ExtractionError::Llm(_) => {
                "Recipe analysis is temporarily unavailable. Please try again later.".to_string()
            }
            ExtractionError::Database(_) | ExtractionError::Job(_) | ExtractionError::Internal(_) => {
                GENERIC_FAILURE.to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ReelchefError>;
