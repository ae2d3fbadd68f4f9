use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{TranscriptError, TranscriptProvider};
use crate::language::Language;
use crate::sanitize;

pub const DEFAULT_BASE_URL: &str = "https://api.supadata.ai/v1";

const NOT_FOUND_MESSAGE: &str = "No transcript is available for this video.";
const QUOTA_MESSAGE: &str =
    "The transcript service is temporarily unavailable. Please try again later.";

/// Client for a transcript API exposing
/// `GET {base}/transcript?url=&lang=&text=true`.
pub struct HttpTranscriptClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    content: TranscriptContent,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptContent {
    Text(String),
    Segments(Vec<Segment>),
}

#[derive(Deserialize)]
struct Segment {
    text: String,
}

impl TranscriptContent {
    fn into_text(self) -> String {
        match self {
            TranscriptContent::Text(text) => text,
            TranscriptContent::Segments(segments) => segments
                .into_iter()
                .map(|s| s.text.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl HttpTranscriptClient {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TranscriptProvider for HttpTranscriptClient {
    fn provider_name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        source_url: &str,
        language: Option<Language>,
    ) -> Result<String, TranscriptError> {
        let mut query = vec![("url", source_url), ("text", "true")];
        if let Some(lang) = language {
            query.push(("lang", lang.code()));
        }

        let response = self
            .client
            .get(format!("{}/transcript", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .query(&query)
            .send()
            .await
            .map_err(|e| TranscriptError::Other(e.to_string()))?;

        let status = response.status();
        debug!(
            "Transcript request for {} returned {}",
            sanitize::redact_url(source_url),
            status
        );

        match status {
            StatusCode::NOT_FOUND => return Err(TranscriptError::NotFound(NOT_FOUND_MESSAGE.into())),
            StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
                return Err(TranscriptError::QuotaExhausted(QUOTA_MESSAGE.into()))
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(TranscriptError::Other(format!("HTTP {}: {}", s, body)));
            }
            _ => {}
        }

        let body: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| TranscriptError::Other(format!("invalid transcript payload: {}", e)))?;

        Ok(body.content.into_text())
    }
}
