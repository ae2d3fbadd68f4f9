use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::{truncate_body, LlmError, LlmProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
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
        OpenAIProvider {
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
            2000,
            Duration::from_secs(30),
        )
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_message}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
                "response_format": {"type": "json_object"}
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
        debug!("OpenAI usage: {}", response_body["usage"]);

        let message = &response_body["choices"][0]["message"];
        if message.is_null() {
            return Err(LlmError::InvalidPayload(
                "missing choices[0].message".to_string(),
            ));
        }
        // A null content (for example a refusal) counts as an empty reply.
        Ok(message["content"].as_str().unwrap_or_default().to_string())
    }
}
