use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::language::Language;
use crate::llm::ProviderFactory;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub(crate) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if Language::from_code(&config.default_language).is_none() {
        return Err(ConfigError::Validation {
            message: format!("Unsupported default language: {}", config.default_language),
        });
    }

    if config.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation {
            message: "max_concurrent_jobs must be at least 1".to_string(),
        });
    }

    if !ProviderFactory::available_providers().contains(&config.llm.provider.as_str()) {
        return Err(ConfigError::Validation {
            message: format!("Unknown LLM provider: {}", config.llm.provider),
        });
    }

    for (section, secs) in [
        ("llm", config.llm.timeout_secs),
        ("transcript", config.transcript.timeout_secs),
        ("metadata", config.metadata.timeout_secs),
    ] {
        if secs == 0 {
            return Err(ConfigError::Validation {
                message: format!("{}.timeout_secs must be positive", section),
            });
        }
    }

    Ok(())
}
