//! Platform metadata for videos: title, caption, author and media.
//!
//! Fetched once per normalized URL and kept in the metadata cache, with
//! the author recorded in the author directory.

mod media;
mod oembed;
mod service;

pub use media::HttpMediaResolver;
pub use oembed::OEmbedProvider;
pub use service::{CachedMetadata, MetadataService};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::link::Platform;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata is not available for {0}")]
    Unsupported(Platform),

    #[error("Metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata request returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub platform: Platform,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<AuthorInfo>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl VideoMetadata {
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            title: None,
            description: None,
            author: None,
            thumbnail_url: None,
            tags: Vec::new(),
        }
    }
}

/// Looks up metadata for a single video.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn fetch(
        &self,
        source_url: &str,
        platform: Platform,
    ) -> Result<VideoMetadata, MetadataError>;
}

/// Fresh avatar and thumbnail lookups. A `None` means "not found", and
/// callers fall back to whatever the metadata provider returned.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn avatar(&self, platform: Platform, username: &str) -> Option<String>;

    async fn thumbnail(&self, platform: Platform, source_url: &str) -> Option<String>;
}

/// Used when metadata lookups are disabled.
pub struct NoopMetadataProvider;

#[async_trait]
impl MetadataProvider for NoopMetadataProvider {
    fn provider_name(&self) -> &str {
        "noop"
    }

    async fn fetch(
        &self,
        _source_url: &str,
        platform: Platform,
    ) -> Result<VideoMetadata, MetadataError> {
        Err(MetadataError::Unsupported(platform))
    }
}

pub struct NoopMediaResolver;

#[async_trait]
impl MediaResolver for NoopMediaResolver {
    async fn avatar(&self, _platform: Platform, _username: &str) -> Option<String> {
        None
    }

    async fn thumbnail(&self, _platform: Platform, _source_url: &str) -> Option<String> {
        None
    }
}
