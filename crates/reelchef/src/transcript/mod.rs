//! Transcript retrieval for video links.

mod http;

pub use http::{HttpTranscriptClient, DEFAULT_BASE_URL};

use async_trait::async_trait;
use thiserror::Error;

use crate::language::Language;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Transcript not found: {0}")]
    NotFound(String),

    #[error("Transcript quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Transcript request failed: {0}")]
    Other(String),
}

impl TranscriptError {
    pub const GENERIC_MESSAGE: &'static str = "Could not fetch transcript";

    /// Message safe to show the user. Typed provider errors carry their own
    /// wording; anything else is replaced with a generic message.
    pub fn user_message(&self) -> String {
        match self {
            TranscriptError::NotFound(msg) | TranscriptError::QuotaExhausted(msg)
                if !msg.trim().is_empty() =>
            {
                msg.clone()
            }
            _ => Self::GENERIC_MESSAGE.to_string(),
        }
    }
}

/// Source of spoken-word transcripts.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Fetches the plain-text transcript of `source_url`, preferring
    /// `language` when the video has several caption tracks.
    async fn fetch(
        &self,
        source_url: &str,
        language: Option<Language>,
    ) -> Result<String, TranscriptError>;
}
