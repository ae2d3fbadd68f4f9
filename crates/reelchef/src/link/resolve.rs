//! Short-link expansion.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use url::Url;

use super::normalize;
use crate::sanitize;

const SHORT_LINK_HOSTS: &[&str] = &["vm.tiktok.com", "vt.tiktok.com"];

/// Expands share links (`vm.tiktok.com/...`, `tiktok.com/t/...`) into the
/// canonical content URL they redirect to.
#[derive(Clone)]
pub struct LinkResolver {
    client: Client,
}

impl LinkResolver {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Returns the normalized canonical URL. Never fails: when the
    /// redirect cannot be followed the normalized input is returned.
    pub async fn resolve(&self, url: &str) -> String {
        if !is_short_link(url) {
            return normalize(url);
        }
        self.expand(url).await
    }

    /// Follows redirects with a HEAD request and normalizes where it lands.
    pub async fn expand(&self, url: &str) -> String {
        match self.client.head(url).send().await {
            Ok(response) => {
                let final_url = response.url().as_str();
                debug!(
                    "Expanded {} -> {}",
                    sanitize::redact_url(url),
                    sanitize::redact_url(final_url)
                );
                normalize(final_url)
            }
            Err(e) => {
                warn!(
                    "Could not expand short link {}: {}",
                    sanitize::redact_url(url),
                    e
                );
                normalize(url)
            }
        }
    }
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Whether the link is a share redirect rather than the content URL itself.
pub fn is_short_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.trim_start_matches("www.");

    if SHORT_LINK_HOSTS.contains(&host) {
        return true;
    }
    host == "tiktok.com" && parsed.path().starts_with("/t/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_is_short_link() {
        assert!(is_short_link("https://vm.tiktok.com/ZMabc123/"));
        assert!(is_short_link("https://vt.tiktok.com/ZSabc123"));
        assert!(is_short_link("https://www.tiktok.com/t/ZTabc123/"));
        assert!(!is_short_link("https://www.tiktok.com/@chef/video/123"));
        assert!(!is_short_link("https://youtu.be/abc123DEF45"));
        assert!(!is_short_link("garbage"));
    }

    #[tokio::test]
    async fn test_resolve_regular_link_only_normalizes() {
        let resolver = LinkResolver::default();
        assert_eq!(
            resolver
                .resolve("https://www.youtube.com/shorts/abc123DEF45?si=share")
                .await,
            "https://www.youtube.com/shorts/abc123DEF45"
        );
    }

    #[tokio::test]
    async fn test_expand_follows_redirect() {
        let mut server = Server::new_async().await;
        let redirect = server
            .mock("HEAD", "/ZMabc123/")
            .with_status(301)
            .with_header("location", "/@chef/video/7234567890123456789?is_from_webapp=1")
            .create_async()
            .await;
        let target = server
            .mock("HEAD", "/@chef/video/7234567890123456789")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let resolver = LinkResolver::default();
        let expanded = resolver.expand(&format!("{}/ZMabc123/", server.url())).await;

        assert_eq!(
            expanded,
            format!("{}/@chef/video/7234567890123456789", server.url())
        );
        redirect.assert_async().await;
        target.assert_async().await;
    }

    #[tokio::test]
    async fn test_expand_network_failure_falls_back() {
        let resolver = LinkResolver::new(Duration::from_millis(200));
        // Nothing listens on the discard port.
        let url = "http://127.0.0.1:9/ZMabc123/?x=1";
        assert_eq!(resolver.expand(url).await, "http://127.0.0.1:9/ZMabc123");
    }
}
