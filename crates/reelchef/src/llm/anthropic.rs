use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::{truncate_body, LlmError, LlmProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: SecretString,
        base_url: Option<&str>,
        model: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        AnthropicProvider {
            client,
            api_key,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: &str, base_url: &str, model: &str) -> Self {
        Self::new(
            SecretString::from(api_key.to_string()),
            Some(base_url),
            model,
            0.2,
            4000,
            Duration::from_secs(30),
        )
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": system_prompt,
                "messages": [
                    {
                        "role": "user",
                        "content": user_message
                    }
                ]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let response_body: Value = response.json().await?;
        debug!("Anthropic stop reason: {}", response_body["stop_reason"]);

        let Some(blocks) = response_body["content"].as_array() else {
            return Err(LlmError::InvalidPayload("missing content array".to_string()));
        };
        let text = blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_body(r#"{"content": [{"type": "text", "text": "{\"isRecipe\": false}"}], "stop_reason": "end_turn"}"#)
            .create_async()
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.url(), "claude-sonnet-4-5");
        let text = provider.complete("system", "transcript").await.unwrap();

        assert_eq!(text, r#"{"isRecipe": false}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_payload() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"type": "message"}"#)
            .create_async()
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.url(), "claude-sonnet-4-5");
        let err = provider.complete("system", "transcript").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_overloaded() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body(r#"{"type": "error", "error": {"type": "overloaded_error"}}"#)
            .create_async()
            .await;

        let provider = AnthropicProvider::with_base_url("test-key", &server.url(), "claude-sonnet-4-5");
        let err = provider.complete("system", "transcript").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 529, .. }));
    }
}
