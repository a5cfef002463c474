use serde::{Deserialize, Serialize};

/// Status string reported by the job endpoint.
///
/// The server reports `processing` while ingestion runs and either
/// `completed`/`success` or `error` once done. Anything it may add later
/// lands in `Unknown` and is treated as still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// Collapsed view of [`JobStatus`] that drives the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Keep polling.
    Running,
    /// Ingestion finished; metadata is available.
    Succeeded,
    /// Ingestion failed on the server.
    Failed,
}

impl JobStatus {
    pub fn phase(self) -> JobPhase {
        match self {
            JobStatus::Completed | JobStatus::Success => JobPhase::Succeeded,
            JobStatus::Error => JobPhase::Failed,
            JobStatus::Pending | JobStatus::Processing | JobStatus::Unknown => JobPhase::Running,
        }
    }
}
