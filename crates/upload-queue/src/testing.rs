//! Scripted `IngestClient` used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use romen_protocol::{JobStatus, JobStatusResponse, UploadResponse};
use romen_transfer::{ProgressCallback, SourceFile};

use crate::client::{ClientFuture, IngestClient};
use crate::error::ClientError;

/// How the mock answers an upload, keyed by source file name.
pub(crate) enum UploadScript {
    /// Reports `steps`, then returns `job_id`.
    Accept { steps: Vec<u8>, job_id: String },
    /// Reports `steps`, then fails with a 503.
    Reject { steps: Vec<u8> },
    /// Reports `steps`, waits for `release`, then returns `job_id`.
    Gated {
        steps: Vec<u8>,
        job_id: String,
        release: Arc<Notify>,
    },
    /// Reports `steps`, then never finishes.
    Stall { steps: Vec<u8> },
}

/// Scripted reply to one job status request.
pub(crate) enum JobReply {
    Status(JobStatusResponse),
    Unreachable,
}

impl JobReply {
    pub(crate) fn pending() -> Self {
        JobReply::Status(JobStatusResponse::with_status(JobStatus::Pending))
    }

    pub(crate) fn completed(title: &str, cover_url: &str) -> Self {
        JobReply::Status(JobStatusResponse {
            status: JobStatus::Completed,
            title: Some(title.into()),
            cover_url: Some(cover_url.into()),
            message: None,
        })
    }

    pub(crate) fn error(message: &str) -> Self {
        JobReply::Status(JobStatusResponse {
            status: JobStatus::Error,
            title: None,
            cover_url: None,
            message: Some(message.into()),
        })
    }
}

/// Mock ingestion service. Jobs without scripted replies stay pending.
#[derive(Default)]
pub(crate) struct MockClient {
    uploads: Mutex<HashMap<String, UploadScript>>,
    jobs: Mutex<HashMap<String, VecDeque<JobReply>>>,
    status_calls: Mutex<HashMap<String, usize>>,
    aborted_uploads: Arc<AtomicUsize>,
}

impl MockClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script_upload(&self, name: &str, script: UploadScript) {
        self.uploads.lock().unwrap().insert(name.into(), script);
    }

    pub(crate) fn script_job(&self, job_id: &str, replies: Vec<JobReply>) {
        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.into(), replies.into_iter().collect());
    }

    /// Number of status requests made for `job_id`.
    pub(crate) fn status_calls(&self, job_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .get(job_id)
            .copied()
            .unwrap_or(0)
    }

    /// Number of upload futures dropped before they finished.
    pub(crate) fn aborted_uploads(&self) -> usize {
        self.aborted_uploads.load(Ordering::SeqCst)
    }
}

/// Counts an upload as aborted if dropped while still armed.
struct AbortGuard {
    counter: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn report(steps: &[u8], on_progress: &ProgressCallback) {
    for &percent in steps {
        on_progress(percent);
        tokio::task::yield_now().await;
    }
}

impl IngestClient for MockClient {
    fn upload<'a>(
        &'a self,
        source: &'a SourceFile,
        on_progress: ProgressCallback,
    ) -> ClientFuture<'a, UploadResponse> {
        let script = self
            .uploads
            .lock()
            .unwrap()
            .remove(source.name())
            .unwrap_or(UploadScript::Accept {
                steps: vec![0, 100],
                job_id: format!("job-{}", source.name()),
            });
        let guard = AbortGuard {
            counter: Arc::clone(&self.aborted_uploads),
            armed: true,
        };

        Box::pin(async move {
            // Bind the whole guard so the block owns it, not just `armed`.
            let mut guard = guard;
            let result = match script {
                UploadScript::Accept { steps, job_id } => {
                    report(&steps, &on_progress).await;
                    Ok(UploadResponse { job_id })
                }
                UploadScript::Reject { steps } => {
                    report(&steps, &on_progress).await;
                    Err(ClientError::Api {
                        status: 503,
                        body: "upstream unavailable".into(),
                    })
                }
                UploadScript::Gated {
                    steps,
                    job_id,
                    release,
                } => {
                    report(&steps, &on_progress).await;
                    release.notified().await;
                    Ok(UploadResponse { job_id })
                }
                UploadScript::Stall { steps } => {
                    report(&steps, &on_progress).await;
                    std::future::pending::<()>().await;
                    unreachable!("stalled upload resumed")
                }
            };
            guard.armed = false;
            result
        })
    }

    fn job_status<'a>(&'a self, job_id: &'a str) -> ClientFuture<'a, JobStatusResponse> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default() += 1;
        let reply = self
            .jobs
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(JobReply::pending);

        Box::pin(async move {
            match reply {
                JobReply::Status(resp) => Ok(resp),
                JobReply::Unreachable => Err(ClientError::Api {
                    status: 502,
                    body: "bad gateway".into(),
                }),
            }
        })
    }
}

/// A source handle for a file the mock never opens.
pub(crate) fn source(name: &str, size: u64) -> SourceFile {
    SourceFile::from_parts(name, format!("/images/{name}"), size).unwrap()
}
