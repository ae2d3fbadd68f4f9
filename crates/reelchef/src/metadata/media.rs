use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use scraper::{Html, Selector};

use super::MediaResolver;
use crate::link::{youtube_video_id, Platform};
use crate::sanitize;

static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());

const USER_AGENT: &str = "Mozilla/5.0 (compatible; reelchef/0.1)";

/// Resolves avatars and thumbnails by reading the `og:image` tag of the
/// relevant public page. YouTube thumbnails are derived from the video id.
pub struct HttpMediaResolver {
    client: Client,
    youtube_base: String,
    instagram_base: String,
    tiktok_base: String,
    youtube_thumbnail_base: String,
}

impl HttpMediaResolver {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            youtube_base: "https://www.youtube.com".to_string(),
            instagram_base: "https://www.instagram.com".to_string(),
            tiktok_base: "https://www.tiktok.com".to_string(),
            youtube_thumbnail_base: "https://i.ytimg.com".to_string(),
        }
    }

    /// Points every lookup at one host.
    #[doc(hidden)]
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        self.youtube_base = base.clone();
        self.instagram_base = base.clone();
        self.tiktok_base = base.clone();
        self.youtube_thumbnail_base = base;
        self
    }

    fn profile_url(&self, platform: Platform, username: &str) -> Option<String> {
        match platform {
            Platform::Youtube => Some(format!("{}/@{}", self.youtube_base, username)),
            Platform::Tiktok => Some(format!("{}/@{}", self.tiktok_base, username)),
            Platform::Instagram => Some(format!("{}/{}/", self.instagram_base, username)),
            Platform::Other => None,
        }
    }

    async fn og_image(&self, page_url: &str) -> Option<String> {
        let response = match self.client.get(page_url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(
                    "og:image lookup for {} returned {}",
                    sanitize::redact_url(page_url),
                    r.status()
                );
                return None;
            }
            Err(e) => {
                debug!("og:image lookup for {} failed: {}", sanitize::redact_url(page_url), e);
                return None;
            }
        };
        let body = response.text().await.ok()?;
        extract_og_image(&body)
    }
}

#[async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn avatar(&self, platform: Platform, username: &str) -> Option<String> {
        if username.is_empty() {
            return None;
        }
        let url = self.profile_url(platform, username)?;
        self.og_image(&url).await
    }

    async fn thumbnail(&self, platform: Platform, source_url: &str) -> Option<String> {
        match platform {
            Platform::Youtube => youtube_video_id(source_url)
                .map(|id| format!("{}/vi/{}/hqdefault.jpg", self.youtube_thumbnail_base, id)),
            Platform::Instagram | Platform::Tiktok => self.og_image(source_url).await,
            Platform::Other => None,
        }
    }
}

fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&OG_IMAGE)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
