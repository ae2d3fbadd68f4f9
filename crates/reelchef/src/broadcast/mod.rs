//! Broadcasting modules for real-time event streaming.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
