use crate::job::JobStatus;
use crate::notify::messages;

/// Non-terminal checkpoints of a job, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LookingUp,
    FetchingTranscript,
    TranscriptReady,
    Analyzing,
    Extracted,
    Saving,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::LookingUp,
        Stage::FetchingTranscript,
        Stage::TranscriptReady,
        Stage::Analyzing,
        Stage::Extracted,
        Stage::Saving,
    ];

    pub fn status(&self) -> JobStatus {
        match self {
            Stage::LookingUp | Stage::FetchingTranscript | Stage::TranscriptReady => {
                JobStatus::FetchingTranscript
            }
            Stage::Analyzing | Stage::Extracted | Stage::Saving => JobStatus::Analyzing,
        }
    }

    pub fn progress(&self) -> u8 {
        match self {
            Stage::LookingUp => 10,
            Stage::FetchingTranscript => 20,
            Stage::TranscriptReady => 30,
            Stage::Analyzing => 40,
            Stage::Extracted => 70,
            Stage::Saving => 80,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Stage::LookingUp => "Looking up video details",
            Stage::FetchingTranscript => "Fetching transcript",
            Stage::TranscriptReady => "Transcript ready",
            Stage::Analyzing => "Analyzing recipe",
            Stage::Extracted => "Recipe extracted",
            Stage::Saving => "Saving recipe",
        }
    }

    /// Message pushed to the job's notification channel on entering this stage.
    pub fn notification(&self) -> Option<&'static str> {
        match self {
            Stage::FetchingTranscript => Some(messages::FETCHING_TRANSCRIPT),
            Stage::Analyzing => Some(messages::ANALYZING),
            _ => None,
        }
    }
}
