//! Per-file transfer: state machine and execution unit.
//!
//! A task moves `Pending → Uploading → Processing → Completed | Failed`.
//! Cancellation is not a state: a cancelled task is removed from the queue
//! and whatever its execution unit reports afterwards is discarded.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use romen_transfer::{ProgressCallback, SourceFile};

use crate::error::UploadError;
use crate::poller::JobPoller;
use crate::queue::{SharedQueue, TaskKey};
use crate::types::TaskStatus;

/// Lifecycle state of one transfer.
///
/// Each variant carries only the data valid in that state, so a completed
/// task always has a title and a pending one never has progress.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    Uploading {
        progress: u8,
    },
    /// The upload finished and the server is ingesting the image.
    /// `job_id` is known once the server has acknowledged the upload.
    Processing {
        job_id: Option<String>,
    },
    Completed {
        title: String,
        cover_url: Option<String>,
    },
    Failed {
        reason: String,
        /// 0 when the transfer itself failed, 100 when ingestion did.
        progress: u8,
    },
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Pending => TaskStatus::Pending,
            TaskState::Uploading { .. } => TaskStatus::Uploading,
            TaskState::Processing { .. } => TaskStatus::Processing,
            TaskState::Completed { .. } => TaskStatus::Completed,
            TaskState::Failed { .. } => TaskStatus::Failed,
        }
    }

    pub fn progress_percent(&self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Uploading { progress } => *progress,
            TaskState::Processing { .. } | TaskState::Completed { .. } => 100,
            TaskState::Failed { progress, .. } => *progress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Whether `next` is a legal successor of this state.
    ///
    /// Progress only moves forward, and nothing leaves a terminal state.
    pub fn can_become(&self, next: &TaskState) -> bool {
        use TaskState::*;

        match (self, next) {
            (Pending, Uploading { .. }) => true,
            (Uploading { progress: from }, Uploading { progress: to }) => to > from,
            (Pending | Uploading { .. }, Processing { .. }) => true,
            (Processing { job_id: None }, Processing { job_id: Some(_) }) => true,
            (Processing { .. }, Completed { .. }) => true,
            (Pending | Uploading { .. } | Processing { .. }, Failed { .. }) => true,
            _ => false,
        }
    }

    /// The failed state an error leads to.
    pub fn failed(err: &UploadError) -> Self {
        TaskState::Failed {
            reason: err.to_string(),
            progress: if err.during_transfer() { 0 } else { 100 },
        }
    }
}

/// Execution unit for one queued file.
///
/// Owns the source handle and the task's cancellation token; every state
/// change goes through the shared queue, keyed by this task's [`TaskKey`].
pub(crate) struct TransferTask {
    key: TaskKey,
    identity: String,
    source: SourceFile,
    cancel: CancellationToken,
    queue: Arc<SharedQueue>,
}

impl TransferTask {
    pub(crate) fn new(
        key: TaskKey,
        identity: String,
        source: SourceFile,
        cancel: CancellationToken,
        queue: Arc<SharedQueue>,
    ) -> Self {
        Self {
            key,
            identity,
            source,
            cancel,
            queue,
        }
    }

    /// Drives the task to a terminal state or until cancelled.
    pub(crate) async fn run(self) {
        match self.execute().await {
            Ok(()) => {}
            Err(UploadError::Cancelled) => {
                debug!(identity = %self.identity, "transfer cancelled");
            }
            Err(e) => {
                warn!(identity = %self.identity, error = %e, "transfer failed");
                self.queue.apply(self.key, TaskState::failed(&e));
            }
        }
    }

    async fn execute(&self) -> Result<(), UploadError> {
        self.check_cancelled()?;
        self.queue
            .apply(self.key, TaskState::Uploading { progress: 0 });

        let on_progress = self.progress_callback();
        let upload = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            resp = self.queue.client().upload(&self.source, on_progress) => {
                resp.map_err(UploadError::Transport)?
            }
        };

        info!(identity = %self.identity, job_id = %upload.job_id, "upload accepted");
        self.queue.apply(
            self.key,
            TaskState::Processing {
                job_id: Some(upload.job_id.clone()),
            },
        );

        let config = self.queue.config();
        let outcome = JobPoller::new(self.queue.client(), config.poll_interval)
            .with_max_duration(config.max_poll_duration)
            .wait(&upload.job_id, &self.cancel)
            .await?;

        let title = outcome.title.unwrap_or_else(|| self.identity.clone());
        info!(identity = %self.identity, %title, "ingestion completed");
        self.queue.apply(
            self.key,
            TaskState::Completed {
                title,
                cover_url: outcome.cover_url,
            },
        );
        Ok(())
    }

    /// Maps upload percentages onto queue state; 100 means processing.
    fn progress_callback(&self) -> ProgressCallback {
        let queue = Arc::clone(&self.queue);
        let key = self.key;
        Arc::new(move |percent| {
            let next = if percent >= 100 {
                TaskState::Processing { job_id: None }
            } else {
                TaskState::Uploading { progress: percent }
            };
            queue.apply(key, next);
        })
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}
