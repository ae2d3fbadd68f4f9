//! API key resolution from multiple sources.
//!
//! Every external service (transcript API, language model, Telegram bot)
//! takes its credential from a [`SecretSource`] in priority order:
//!
//! 1. **Direct value** - for quick local testing (`"api_key": "sk-..."`)
//! 2. **File reference** - Docker secrets pattern (`"api_key_file": "/run/secrets/openai"`)
//! 3. **Env var reference** - production (`"api_key_env": "OPENAI_API_KEY"`)

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where a credential comes from, as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl SecretSource {
    /// A source that only reads the given environment variable.
    pub fn env(name: &str) -> Self {
        Self {
            api_key_env: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// A source holding the key inline.
    pub fn direct(value: &str) -> Self {
        Self {
            api_key: Some(value.to_string()),
            ..Default::default()
        }
    }

    pub fn resolve(&self) -> Result<SecretString> {
        resolve_secret(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env.as_deref(),
        )
    }

    pub fn resolve_optional(&self) -> Result<Option<SecretString>> {
        resolve_secret_optional(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env.as_deref(),
        )
    }

    pub fn is_configured(&self) -> bool {
        has_secret_source(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env.as_deref(),
        )
    }
}

/// Resolves a secret from multiple sources in priority order:
/// 1. Direct value (if provided and non-empty)
/// 2. File contents (if path provided)
/// 3. Environment variable (if name provided)
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(e) => Err(SecretError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    if let Some(var_name) = env_var {
        if !var_name.is_empty() {
            return match std::env::var(var_name) {
                // Env vars may carry trailing newlines
                Ok(value) => Ok(SecretString::from(value.trim())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: var_name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: var_name.to_string(),
                }),
            };
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves a secret, returning None if no source is provided instead of an error.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
