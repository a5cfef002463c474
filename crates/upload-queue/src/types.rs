//! Data types shared by the queue and its callers.

use std::time::Duration;

use serde::Serialize;

/// Interval between job status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the queue event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Tuning for an [`UploadQueue`](crate::UploadQueue).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Fixed wait before every job status request.
    pub poll_interval: Duration,
    /// Give up on a job still running after this long. `None` polls forever.
    pub max_poll_duration: Option<Duration>,
    /// Capacity of the channel returned by `take_events`.
    pub event_buffer: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_duration: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Coarse status of a queued transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Read-only view of one queued transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub identity: String,
    pub status: TaskStatus,
    pub progress_percent: u8,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Change notification emitted by the queue.
///
/// Events are sent in the order the queue applied the changes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// A file was accepted and appended to the queue.
    Added { identity: String },
    /// Upload progress moved forward.
    Progress { identity: String, percent: u8 },
    /// The task entered a new status.
    StatusChanged { identity: String, status: TaskStatus },
    /// The task left the queue (cancelled or cleared).
    Removed { identity: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_polling() {
        let config = QueueConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.max_poll_duration.is_none());
        assert_eq!(config.event_buffer, 256);
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Uploading.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn snapshot_json_omits_missing_metadata() {
        let snap = TaskSnapshot {
            identity: "game.iso".into(),
            status: TaskStatus::Uploading,
            progress_percent: 42,
            size_bytes: 4_700_000_000,
            display_title: None,
            cover_url: None,
            error: None,
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(
            json,
            r#"{"identity":"game.iso","status":"uploading","progress_percent":42,"size_bytes":4700000000}"#
        );
    }
}
