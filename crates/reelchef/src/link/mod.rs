//! Video link handling: platform classification, normalization and
//! short-link expansion.

pub mod classifier;
pub mod normalize;
pub mod resolve;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use classifier::{classify, youtube_video_id, Classification};
pub use normalize::normalize;
pub use resolve::LinkResolver;

/// Video platforms the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Other => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            "other" => Ok(Platform::Other),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}
