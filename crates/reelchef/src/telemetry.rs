//! Subscriber setup for binaries embedding the pipeline.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{fmt as layer_fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Filter from `RUST_LOG`, or `info` when unset or unparsable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber and routes `log` records into it.
///
/// Calling it twice is harmless: the second call returns `false`.
pub fn init_tracing(format: LogFormat) -> bool {
    let fmt_layer = match format {
        LogFormat::Pretty => layer_fmt::layer().with_target(true).boxed(),
        LogFormat::Json => layer_fmt::layer().json().with_current_span(true).boxed(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter());

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    tracing_log::LogTracer::init().is_ok()
}
