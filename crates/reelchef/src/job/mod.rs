//! Extraction jobs: the state machine and its persistent store.

mod state;
mod store;

pub use state::{ExtractionJob, JobStatus};
pub use store::{JobPage, JobQuery, JobStore, NewJob};

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Timed out waiting for job {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
