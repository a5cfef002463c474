//! Disc-image upload queue: transfer, ingestion polling, cancellation.
//!
//! This crate implements the **business logic** for sending disc images to
//! an ingestion server. It has no UI dependencies; callers submit local
//! files, read snapshots or follow the event stream, and cancel tasks.
//!
//! # Pipeline
//!
//! 1. **Queue**: each file becomes a pending task with a unique identity
//! 2. **Upload**: stream the image as multipart form data with byte progress
//! 3. **Poll**: ask the server for the job status at a fixed interval
//! 4. **Finish**: record the title and cover, or the failure reason
//!
//! The HTTP side sits behind [`IngestClient`], so tests and alternative
//! transports can stand in for [`HttpIngestClient`].

pub mod client;
pub mod error;
pub mod poller;
pub mod queue;
pub mod task;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use client::{ClientFuture, HttpIngestClient, IngestClient};
pub use error::{ClientError, UploadError};
pub use poller::{JobOutcome, JobPoller};
pub use queue::UploadQueue;
pub use task::TaskState;
pub use types::{
    DEFAULT_EVENT_BUFFER, DEFAULT_POLL_INTERVAL, QueueConfig, QueueEvent, TaskSnapshot,
    TaskStatus,
};
