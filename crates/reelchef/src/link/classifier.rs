//! Platform classification of submitted video links.
//!
//! Each supported platform is a row in [`RULES`]: the hosts it owns, the
//! path patterns that point at a single piece of content, and a function
//! that explains why any other page on those hosts was rejected. Adding a
//! platform means adding a row.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use super::Platform;

pub const INVALID_URL_FORMAT: &str = "Invalid URL format";
pub const UNSUPPORTED_PLATFORM: &str = "URL is not from a supported platform";

/// Result of classifying a submitted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub platform: Platform,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Classification {
    fn valid(platform: Platform) -> Self {
        Self {
            platform,
            is_valid: true,
            error: None,
        }
    }

    fn rejected(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            platform,
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

struct PlatformRule {
    platform: Platform,
    hosts: &'static [&'static str],
    /// Matched against `host + path [+ "?" + query]` with the host lowercased
    /// and any `www.`/`m.`/`mobile.` prefix removed.
    content: Vec<Regex>,
    reject: fn(&Url) -> &'static str,
}

static RULES: LazyLock<Vec<PlatformRule>> = LazyLock::new(|| {
    vec![
        PlatformRule {
            platform: Platform::Youtube,
            hosts: &["youtube.com", "music.youtube.com", "youtu.be", "youtube-nocookie.com"],
            content: vec![
                Regex::new(r"(?i)^(?:music\.)?youtube\.com/watch/?\?(?:[^#]*&)?v=[\w-]{6,}").unwrap(),
                Regex::new(r"(?i)^youtube\.com/(?:shorts|embed|live|v)/[\w-]{6,}/?(?:\?.*)?$").unwrap(),
                Regex::new(r"(?i)^youtube-nocookie\.com/embed/[\w-]{6,}/?(?:\?.*)?$").unwrap(),
                Regex::new(r"(?i)^youtu\.be/[\w-]{6,}/?(?:\?.*)?$").unwrap(),
            ],
            reject: reject_youtube,
        },
        PlatformRule {
            platform: Platform::Instagram,
            hosts: &["instagram.com", "instagr.am"],
            content: vec![Regex::new(
                r"(?i)^(?:instagram\.com|instagr\.am)/(?:[\w.]+/)?(?:p|reel|reels|tv)/[\w-]+/?(?:\?.*)?$",
            )
            .unwrap()],
            reject: reject_instagram,
        },
        PlatformRule {
            platform: Platform::Tiktok,
            hosts: &["tiktok.com", "vm.tiktok.com", "vt.tiktok.com"],
            content: vec![
                Regex::new(r"(?i)^tiktok\.com/@[\w.-]+/video/\d+/?(?:\?.*)?$").unwrap(),
                Regex::new(r"(?i)^tiktok\.com/(?:t|embed/v2|embed)/[\w-]+/?(?:\?.*)?$").unwrap(),
                Regex::new(r"(?i)^(?:vm|vt)\.tiktok\.com/[\w-]+/?(?:\?.*)?$").unwrap(),
            ],
            reject: reject_tiktok,
        },
    ]
});

/// Classifies a submitted link into a supported platform.
pub fn classify(url: &str) -> Classification {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
        _ => return Classification::rejected(Platform::Other, INVALID_URL_FORMAT),
    };

    let Some(host) = parsed.host_str().map(canonical_host) else {
        return Classification::rejected(Platform::Other, INVALID_URL_FORMAT);
    };

    let Some(rule) = RULES.iter().find(|r| r.hosts.contains(&host.as_str())) else {
        return Classification::rejected(Platform::Other, UNSUPPORTED_PLATFORM);
    };

    let locator = match parsed.query() {
        Some(query) => format!("{}{}?{}", host, parsed.path(), query),
        None => format!("{}{}", host, parsed.path()),
    };

    if rule.content.iter().any(|re| re.is_match(&locator)) {
        Classification::valid(rule.platform)
    } else {
        Classification::rejected(rule.platform, (rule.reject)(&parsed))
    }
}

/// Extracts the video id from any YouTube content link.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = canonical_host(parsed.host_str()?);

    if host == "youtu.be" {
        return first_segment(&parsed).map(str::to_string);
    }
    let on_youtube = host == "youtube.com" || host.ends_with(".youtube.com");
    if !on_youtube && host != "youtube-nocookie.com" {
        return None;
    }

    let mut segments = parsed.path_segments()?;
    match segments.next()? {
        "watch" => parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned()),
        "shorts" | "embed" | "live" | "v" => segments
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn canonical_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    for prefix in ["www.", "m.", "mobile."] {
        if let Some(rest) = host.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    host
}

fn first_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.next().filter(|s| !s.is_empty())
}

fn reject_youtube(url: &Url) -> &'static str {
    let first = first_segment(url).map(str::to_ascii_lowercase);
    let has_list = url.query_pairs().any(|(k, _)| k == "list");

    match first.as_deref() {
        Some("playlist") => "This link is a YouTube playlist. Please share a single video or Short.",
        _ if has_list => "This link is a YouTube playlist. Please share a single video or Short.",
        Some(seg) if seg.starts_with('@') => {
            "This link is a YouTube channel page. Please share a single video or Short."
        }
        Some("channel" | "c" | "user") => {
            "This link is a YouTube channel page. Please share a single video or Short."
        }
        _ => "This link looks like a YouTube profile, channel, or settings page, not a video.",
    }
}

fn reject_instagram(_url: &Url) -> &'static str {
    "This link looks like an Instagram profile, explore, or settings page, not a post or reel."
}

fn reject_tiktok(_url: &Url) -> &'static str {
    "This link looks like a TikTok profile page, not a video. Please share a single video."
}
