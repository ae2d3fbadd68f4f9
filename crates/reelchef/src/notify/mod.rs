//! Out-of-band status messages for jobs that carry a notification channel.

mod telegram;

pub use telegram::{TelegramNotifier, TELEGRAM_API_BASE};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a plain-text message to `channel`.
    async fn notify(&self, channel: &str, message: &str) -> Result<(), NotifyError>;
}

pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _channel: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Messages sent at each notable point of a job.
pub mod messages {
    pub const FETCHING_TRANSCRIPT: &str = "Getting the video transcript...";
    pub const ANALYZING: &str = "Reading the recipe from the video...";

    pub fn success(title: &str) -> String {
        format!("Your recipe \"{}\" is ready.", title)
    }

    pub fn failure(reason: &str) -> String {
        format!("Sorry, we couldn't extract a recipe. {}", reason)
    }
}
