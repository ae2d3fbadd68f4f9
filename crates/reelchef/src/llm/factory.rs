use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::llm::{AnthropicProvider, LlmError, LlmProvider, OpenAIProvider};
use crate::secrets::SecretSource;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance from configuration
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let api_key = Self::key_source(config)
            .resolve()
            .map_err(|e| LlmError::Config(format!("{} API key: {}", config.provider, e)))?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let base_url = config.base_url.as_deref();

        match config.provider.as_str() {
            "openai" => Ok(Arc::new(OpenAIProvider::new(
                api_key,
                base_url,
                &config.model,
                config.temperature,
                config.max_tokens,
                timeout,
            ))),
            "anthropic" => Ok(Arc::new(AnthropicProvider::new(
                api_key,
                base_url,
                &config.model,
                config.temperature,
                config.max_tokens,
                timeout,
            ))),
            other => Err(LlmError::Config(format!("Unknown provider: {}", other))),
        }
    }

    /// Environment variable read when the config names no key source.
    pub fn default_key_env(provider: &str) -> &'static str {
        match provider {
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        }
    }

    fn key_source(config: &LlmConfig) -> SecretSource {
        if config.key.is_configured() {
            config.key.clone()
        } else {
            SecretSource::env(Self::default_key_env(&config.provider))
        }
    }

    /// List all available provider names
    pub fn available_providers() -> Vec<&'static str> {
        vec!["openai", "anthropic"]
    }
}
