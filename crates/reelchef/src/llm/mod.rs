//! Language-model providers used to turn transcripts into recipe drafts.

mod anthropic;
mod factory;
mod open_ai;
pub mod prompt;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use open_ai::OpenAIProvider;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    InvalidPayload(String),

    #[error("Provider configuration error: {0}")]
    Config(String),
}

/// Unified trait for all LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Runs one completion and returns the raw text of the reply, which may
    /// be empty.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError>;
}

/// Truncates provider error bodies before they are logged or stored.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "é".repeat(400);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 503);
    }
}
