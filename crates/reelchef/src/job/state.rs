//! Job status machine and the typed job record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::JobRow;
use crate::language::TargetLanguage;
use crate::link::Platform;

/// Stage of an extraction job.
///
/// `pending -> fetching_transcript -> analyzing -> completed`, with `failed`
/// reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    FetchingTranscript,
    Analyzing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::FetchingTranscript => "fetching_transcript",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::FetchingTranscript => 1,
            JobStatus::Analyzing => 2,
            JobStatus::Completed => 3,
            JobStatus::Failed => 4,
        }
    }

    /// Whether a job in `self` may move to `next`.
    ///
    /// Stages advance one at a time. The two working stages may be
    /// re-entered to report more progress. Terminal stages never change.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStatus::Failed => true,
            JobStatus::FetchingTranscript | JobStatus::Analyzing if next == *self => true,
            _ => next.rank() == self.rank() + 1,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "fetching_transcript" => Ok(JobStatus::FetchingTranscript),
            "analyzing" => Ok(JobStatus::Analyzing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// An extraction job as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionJob {
    pub id: String,
    pub user_id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: Platform,
    pub target_language: TargetLanguage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_channel: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn from_row(row: &JobRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|e| {
            log::warn!("{} for job {}, treating it as failed", e, row.id);
            JobStatus::Failed
        });
        let platform = row.platform.parse().unwrap_or_else(|e| {
            log::warn!("{} for job {}", e, row.id);
            Platform::Other
        });
        let target_language = row.target_language.parse().unwrap_or_else(|e| {
            log::warn!("{} for job {}", e, row.id);
            TargetLanguage::Original
        });

        Self {
            id: row.id.clone(),
            user_id: row.user_id.clone(),
            source_url: row.source_url.clone(),
            normalized_url: row.normalized_url.clone(),
            platform,
            target_language,
            notify_channel: row.notify_channel.clone(),
            status,
            progress: row.progress,
            message: row.message.clone(),
            recipe_id: row.recipe_id.clone(),
            error: row.error.clone(),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}
