use log::warn;

use crate::config::Config;
use crate::language::Language;

pub struct PipelineConfig {
    /// Language that a keep-original request collapses into when the video
    /// is already in it, and the transcript hint for default-language jobs.
    pub default_language: Language,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let default_language = Language::from_code(&config.default_language).unwrap_or_else(|| {
            warn!(
                "Unknown default language '{}', using English",
                config.default_language
            );
            Language::En
        });
        Self { default_language }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_language: Language::En,
        }
    }
}
