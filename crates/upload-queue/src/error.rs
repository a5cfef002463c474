//! Error types for the ingestion client and upload tasks.

use std::time::Duration;

/// Errors returned by an [`IngestClient`](crate::IngestClient) call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source file error: {0}")]
    Source(#[from] romen_transfer::TransferError),
}

/// Why a transfer task stopped before completing.
///
/// Every variant except [`Cancelled`](UploadError::Cancelled) ends the task
/// in the failed state; a cancelled task is removed instead.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Transport(#[source] ClientError),

    #[error("job status request failed: {0}")]
    PollTransport(#[source] ClientError),

    #[error("server could not process image: {0}")]
    RemoteProcessing(String),

    #[error("job did not finish within {0:?}")]
    PollTimeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// Whether the failure happened while the payload was still in flight.
    ///
    /// Those failures reset the visible progress to zero; failures after
    /// the upload was accepted keep it at 100.
    pub fn during_transfer(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }
}
