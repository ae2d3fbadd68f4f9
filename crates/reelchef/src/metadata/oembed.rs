use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{AuthorInfo, MetadataError, MetadataProvider, VideoMetadata};
use crate::link::Platform;

pub const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";
pub const TIKTOK_OEMBED: &str = "https://www.tiktok.com/oembed";

/// Metadata from the public oEmbed endpoints of YouTube and TikTok.
/// Instagram requires an app token for oEmbed and is reported unsupported.
pub struct OEmbedProvider {
    client: Client,
    youtube_endpoint: String,
    tiktok_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
    author_url: Option<String>,
    /// TikTok only.
    author_unique_id: Option<String>,
    thumbnail_url: Option<String>,
}

impl OEmbedProvider {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            youtube_endpoint: YOUTUBE_OEMBED.to_string(),
            tiktok_endpoint: TIKTOK_OEMBED.to_string(),
        }
    }

    #[doc(hidden)]
    pub fn with_endpoints(mut self, youtube: &str, tiktok: &str) -> Self {
        self.youtube_endpoint = youtube.to_string();
        self.tiktok_endpoint = tiktok.to_string();
        self
    }

    async fn request(&self, endpoint: &str, source_url: &str) -> Result<OEmbedResponse, MetadataError> {
        let response = self
            .client
            .get(endpoint)
            .query(&[("url", source_url), ("format", "json")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MetadataError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataProvider for OEmbedProvider {
    fn provider_name(&self) -> &str {
        "oembed"
    }

    async fn fetch(
        &self,
        source_url: &str,
        platform: Platform,
    ) -> Result<VideoMetadata, MetadataError> {
        let endpoint = match platform {
            Platform::Youtube => &self.youtube_endpoint,
            Platform::Tiktok => &self.tiktok_endpoint,
            other => return Err(MetadataError::Unsupported(other)),
        };

        let body = self.request(endpoint, source_url).await?;
        debug!("oEmbed {} returned title {:?}", platform, body.title);
        Ok(into_metadata(body, platform))
    }
}

fn into_metadata(body: OEmbedResponse, platform: Platform) -> VideoMetadata {
    let username = body
        .author_unique_id
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| body.author_url.as_deref().and_then(handle_from_profile_url));

    let author = username.map(|username| AuthorInfo {
        username,
        display_name: body.author_name.clone(),
        avatar_url: None,
        verified: false,
    });

    // TikTok has no separate caption field; the title is the caption.
    let description = match platform {
        Platform::Tiktok => body.title.clone(),
        _ => None,
    };

    VideoMetadata {
        platform,
        title: body.title,
        description,
        author,
        thumbnail_url: body.thumbnail_url,
        tags: Vec::new(),
    }
}

/// `https://www.youtube.com/@chef` -> `chef`
fn handle_from_profile_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let handle = last.trim_start_matches('@');
    (!handle.is_empty()).then(|| handle.to_string())
}
