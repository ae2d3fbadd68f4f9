use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::language::{Language, TargetLanguage};
use crate::llm::{LlmProvider, ProviderFactory};
use crate::metadata::{
    HttpMediaResolver, MediaResolver, MetadataProvider, NoopMediaResolver, NoopMetadataProvider,
    OEmbedProvider,
};
use crate::notify::{NoopNotifier, Notifier, TelegramNotifier};
use crate::secrets::SecretSource;
use crate::transcript::{HttpTranscriptClient, TranscriptProvider};
use crate::usage::{SqliteUsageRecorder, UsageRecorder};

pub const TRANSCRIPT_KEY_ENV: &str = "TRANSCRIPT_API_KEY";

/// What a caller supplies to start an extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub user_id: String,
    pub source_url: String,
    pub target_language: TargetLanguage,
    pub notify_channel: Option<String>,
}

impl ExtractionRequest {
    pub fn new(user_id: &str, source_url: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            source_url: source_url.to_string(),
            target_language: TargetLanguage::Original,
            notify_channel: None,
        }
    }

    pub fn with_target(mut self, target: TargetLanguage) -> Self {
        self.target_language = target;
        self
    }

    pub fn with_notify_channel(mut self, channel: &str) -> Self {
        self.notify_channel = Some(channel.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub default_language: Language,
    pub max_concurrent_jobs: usize,
    pub single_flight: bool,
    /// Timeout for short-link expansion.
    pub resolve_timeout: Duration,
    /// Age after which an unfinished job is presumed orphaned.
    pub stale_after: Duration,
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_language: Language::from_code(&config.default_language)
                .unwrap_or(Language::En),
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            single_flight: config.single_flight,
            resolve_timeout: Duration::from_secs(config.metadata.timeout_secs),
            stale_after: Duration::from_secs(config.stale_job_minutes.saturating_mul(60)),
        }
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            default_language: Language::En,
            max_concurrent_jobs: num_cpus::get(),
            single_flight: true,
            resolve_timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(30 * 60),
        }
    }
}

/// The external systems a job talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub media: Arc<dyn MediaResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub usage: Arc<dyn UsageRecorder>,
}

impl Collaborators {
    /// HTTP adapters for every collaborator named in the config.
    pub fn from_config(config: &Config, db: &Database) -> Result<Self> {
        let transcript_key = if config.transcript.key.is_configured() {
            config.transcript.key.clone()
        } else {
            SecretSource::env(TRANSCRIPT_KEY_ENV)
        };
        let transcripts = Arc::new(HttpTranscriptClient::new(
            &config.transcript.base_url,
            transcript_key.resolve()?,
            Duration::from_secs(config.transcript.timeout_secs),
        ));

        let llm = ProviderFactory::create(&config.llm)?;

        let (metadata, media): (Arc<dyn MetadataProvider>, Arc<dyn MediaResolver>) =
            if config.metadata.enabled {
                let timeout = Duration::from_secs(config.metadata.timeout_secs);
                (
                    Arc::new(OEmbedProvider::new(timeout)),
                    Arc::new(HttpMediaResolver::new(timeout)),
                )
            } else {
                (Arc::new(NoopMetadataProvider), Arc::new(NoopMediaResolver))
            };

        let notifier: Arc<dyn Notifier> = match &config.notifications.telegram {
            Some(telegram) => Arc::new(TelegramNotifier::new(
                &telegram.base_url,
                telegram.token.resolve()?,
            )),
            None => Arc::new(NoopNotifier),
        };

        Ok(Self {
            transcripts,
            llm,
            metadata,
            media,
            notifier,
            usage: Arc::new(SqliteUsageRecorder::new(db.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;
    use serial_test::serial;

    fn config() -> Config {
        let mut config = Config::with_defaults();
        config.llm.key = SecretSource::direct("sk-test");
        config.transcript.key = SecretSource::direct("tr-test");
        config
    }

    #[test]
    fn test_from_config_builds_adapters() {
        let db = Database::open_in_memory().unwrap();
        let collaborators = Collaborators::from_config(&config(), &db).unwrap();
        assert_eq!(collaborators.llm.provider_name(), "openai");
        assert_eq!(collaborators.transcripts.provider_name(), "http");
        assert_eq!(collaborators.metadata.provider_name(), "oembed");
    }

    #[test]
    fn test_metadata_disabled() {
        let mut config = config();
        config.metadata.enabled = false;
        let db = Database::open_in_memory().unwrap();
        let collaborators = Collaborators::from_config(&config, &db).unwrap();
        assert_eq!(collaborators.metadata.provider_name(), "noop");
    }

    #[test]
    #[serial]
    fn test_transcript_key_from_env() {
        let mut config = config();
        config.transcript.key = SecretSource::default();
        let db = Database::open_in_memory().unwrap();

        std::env::remove_var(TRANSCRIPT_KEY_ENV);
        assert!(Collaborators::from_config(&config, &db).is_err());

        std::env::set_var(TRANSCRIPT_KEY_ENV, "tr-env");
        assert!(Collaborators::from_config(&config, &db).is_ok());
        std::env::remove_var(TRANSCRIPT_KEY_ENV);
    }

    #[test]
    fn test_telegram_needs_token() {
        let mut config = config();
        config.notifications.telegram = Some(TelegramConfig {
            base_url: "https://api.telegram.org".to_string(),
            token: SecretSource::default(),
        });
        let db = Database::open_in_memory().unwrap();
        assert!(Collaborators::from_config(&config, &db).is_err());
    }

    #[test]
    fn test_request_builder() {
        let request = ExtractionRequest::new("u1", "https://youtu.be/abc")
            .with_target(TargetLanguage::Language(Language::De))
            .with_notify_channel("42");
        assert_eq!(request.target_language.as_key(), "de");
        assert_eq!(request.notify_channel.as_deref(), Some("42"));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = config();
        config.default_language = "es".to_string();
        config.max_concurrent_jobs = 3;
        config.single_flight = false;
        config.stale_job_minutes = 5;
        let options = ServiceOptions::from_config(&config);
        assert_eq!(options.default_language, Language::Es);
        assert_eq!(options.max_concurrent_jobs, 3);
        assert!(!options.single_flight);
        assert_eq!(options.stale_after, Duration::from_secs(300));
    }
}
