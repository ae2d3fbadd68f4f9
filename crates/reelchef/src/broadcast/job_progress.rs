//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{ExtractionJob, JobStatus};

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Owner of the job.
    pub user_id: String,
    pub status: JobStatus,
    /// 0-100.
    pub progress: u8,
    /// Human-readable message describing current activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// Snapshot of a job's current state.
    pub fn from_job(job: &ExtractionJob) -> Self {
        Self {
            job_id: job.id.clone(),
            user_id: job.user_id.clone(),
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            recipe_id: job.recipe_id.clone(),
            error: job.error.clone(),
            timestamp: job.updated_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
