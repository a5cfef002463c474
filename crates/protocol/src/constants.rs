//! Endpoint paths and form field names of the ingestion service.

/// Base URL the reference server listens on.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Multipart upload endpoint.
pub const UPLOAD_PATH: &str = "/upload";

/// Name of the multipart part carrying the image bytes.
pub const UPLOAD_FIELD: &str = "file";

/// Returns the status path for an ingestion job.
pub fn job_path(job_id: &str) -> String {
    format!("/job/{job_id}")
}
