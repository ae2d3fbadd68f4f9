use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::{NotifyError, Notifier};
use crate::llm::truncate_body;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends messages through the Telegram Bot API. The channel is a chat id.
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl TelegramNotifier {
    pub fn new(base_url: &str, token: SecretString) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!(
                "{}/bot{}/sendMessage",
                self.base_url,
                self.token.expose_secret()
            ))
            .json(&json!({
                "chat_id": channel,
                "text": message,
                "disable_web_page_preview": true
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(())
    }
}
