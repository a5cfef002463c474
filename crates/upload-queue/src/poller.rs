//! Fixed-interval polling of a server-side ingestion job.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use romen_protocol::JobPhase;

use crate::client::IngestClient;
use crate::error::UploadError;

/// Metadata the server returned for a finished job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobOutcome {
    pub title: Option<String>,
    pub cover_url: Option<String>,
}

/// Polls one job until it reaches a terminal status.
///
/// Waits a fixed interval before every request; there is no backoff and,
/// unless a maximum duration is set, no attempt cap.
pub struct JobPoller<'a> {
    client: &'a dyn IngestClient,
    interval: Duration,
    max_duration: Option<Duration>,
}

impl<'a> JobPoller<'a> {
    pub fn new(client: &'a dyn IngestClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            max_duration: None,
        }
    }

    /// Fails the job with [`UploadError::PollTimeout`] once `max` has
    /// elapsed without a terminal status.
    pub fn with_max_duration(mut self, max: Option<Duration>) -> Self {
        self.max_duration = max;
        self
    }

    /// Polls `job_id` until it succeeds, fails, or `cancel` fires.
    ///
    /// Cancellation is checked before each wait and before each request,
    /// and an in-flight request is dropped as soon as the token fires.
    pub async fn wait(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, UploadError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            check_cancelled(cancel)?;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
            check_cancelled(cancel)?;

            if let Some(max) = self.max_duration
                && started.elapsed() >= max
            {
                return Err(UploadError::PollTimeout(max));
            }

            attempt += 1;
            let resp = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                resp = self.client.job_status(job_id) => resp.map_err(UploadError::PollTransport)?,
            };

            match resp.status.phase() {
                JobPhase::Succeeded => {
                    debug!(%job_id, attempt, "job finished");
                    return Ok(JobOutcome {
                        title: resp.title,
                        cover_url: resp.cover_url,
                    });
                }
                JobPhase::Failed => {
                    let reason = resp
                        .message
                        .unwrap_or_else(|| "job reported an error".into());
                    return Err(UploadError::RemoteProcessing(reason));
                }
                JobPhase::Running => {
                    trace!(%job_id, attempt, status = ?resp.status, "job still running");
                }
            }
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Cancelled)
    } else {
        Ok(())
    }
}
