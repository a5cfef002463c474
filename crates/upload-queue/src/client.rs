//! Ingestion service client.
//!
//! `IngestClient` is the seam between transfer tasks and the network.
//! [`HttpIngestClient`] talks to the real service over `reqwest`; tests
//! substitute scripted implementations.

use std::future::Future;
use std::pin::Pin;

use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use romen_protocol::{JobStatusResponse, UPLOAD_FIELD, UPLOAD_PATH, UploadResponse, job_path};
use romen_transfer::{ProgressCallback, ProgressTracker, SourceFile};

use crate::error::ClientError;

/// Boxed future returned by [`IngestClient`] methods.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// Abstract connection to the ingestion service.
///
/// Dropping a returned future must abort the underlying request; task
/// cancellation relies on it to tear down in-flight transfers.
pub trait IngestClient: Send + Sync {
    /// Uploads one image and returns the server-side job handle.
    ///
    /// `on_progress` receives a strictly increasing whole percentage of the
    /// payload sent so far, ending at 100 once every byte has left.
    fn upload<'a>(
        &'a self,
        source: &'a SourceFile,
        on_progress: ProgressCallback,
    ) -> ClientFuture<'a, UploadResponse>;

    /// Fetches the current status of an ingestion job.
    fn job_status<'a>(&'a self, job_id: &'a str) -> ClientFuture<'a, JobStatusResponse>;
}

/// `reqwest`-backed client for the ingestion HTTP API.
pub struct HttpIngestClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIngestClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wraps an existing `reqwest` client.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_upload(
        &self,
        source: &SourceFile,
        on_progress: ProgressCallback,
    ) -> Result<UploadResponse, ClientError> {
        let mut tracker = ProgressTracker::new(source.size());
        let stream = source.byte_stream().await?;

        if let Some(percent) = tracker.start() {
            on_progress(percent);
        }
        // Bytes count as sent once hyper pulls them off the body stream.
        let counted = stream.inspect_ok(move |chunk| {
            if let Some(percent) = tracker.record(chunk.len() as u64) {
                on_progress(percent);
            }
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(counted), source.size())
            .file_name(source.name().to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = format!("{}{}", self.base_url, UPLOAD_PATH);
        debug!(file = %source.name(), bytes = source.size(), %url, "starting upload");

        let resp = self.http.post(&url).multipart(form).send().await?;
        let body = read_success_body(resp).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<JobStatusResponse, ClientError> {
        let url = format!("{}{}", self.base_url, job_path(job_id));
        let resp = self.http.get(&url).send().await?;
        let body = read_success_body(resp).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl IngestClient for HttpIngestClient {
    fn upload<'a>(
        &'a self,
        source: &'a SourceFile,
        on_progress: ProgressCallback,
    ) -> ClientFuture<'a, UploadResponse> {
        Box::pin(self.send_upload(source, on_progress))
    }

    fn job_status<'a>(&'a self, job_id: &'a str) -> ClientFuture<'a, JobStatusResponse> {
        Box::pin(self.fetch_job_status(job_id))
    }
}

/// Returns the body of a 2xx response, or an API error carrying the body.
async fn read_success_body(resp: reqwest::Response) -> Result<Vec<u8>, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.bytes().await?.to_vec())
}
