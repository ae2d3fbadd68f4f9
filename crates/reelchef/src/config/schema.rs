use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Defaults to `~/.reelchef/data/reelchef.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Serialize jobs for the same normalized URL so duplicates reuse caches.
    #[serde(default = "default_true")]
    pub single_flight: bool,
    /// Unfinished jobs untouched this long are failed when a service starts.
    #[serde(default = "default_stale_job_minutes")]
    pub stale_job_minutes: u64,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    num_cpus::get()
}

fn default_stale_job_minutes() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(flatten)]
    pub key: SecretSource,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            base_url: None,
            key: SecretSource::env("OPENAI_API_KEY"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    #[serde(default = "default_transcript_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub key: SecretSource,
}

fn default_transcript_base_url() -> String {
    crate::transcript::DEFAULT_BASE_URL.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            base_url: default_transcript_base_url(),
            timeout_secs: default_http_timeout(),
            key: SecretSource::env("TRANSCRIPT_API_KEY"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u64,
}

fn default_metadata_timeout() -> u64 {
    10
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_metadata_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
    #[serde(flatten)]
    pub token: SecretSource,
}

fn default_telegram_base_url() -> String {
    crate::notify::TELEGRAM_API_BASE.to_string()
}

impl Config {
    /// A configuration with every default filled in.
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            default_language: default_language(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            single_flight: true,
            stale_job_minutes: default_stale_job_minutes(),
            llm: LlmConfig::default(),
            transcript: TranscriptConfig::default(),
            metadata: MetadataConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}
