use serde::{Deserialize, Serialize};

use crate::types::JobStatus;

/// Body returned by `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
}

/// Body returned by `GET /job/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Server-side error description, present with `status: "error"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobStatusResponse {
    /// A bare status with no metadata.
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            title: None,
            cover_url: None,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_parses_job_id() {
        let resp: UploadResponse =
            serde_json::from_str(r#"{"job_id":"9b1c0c7e-5d2a-4c55-8d0e-2b6b3f1a7c11"}"#).unwrap();
        assert_eq!(resp.job_id, "9b1c0c7e-5d2a-4c55-8d0e-2b6b3f1a7c11");
    }

    #[test]
    fn completed_job_carries_metadata() {
        let json = r#"{"status":"completed","title":"Game X","cover_url":"/covers/SLUS_200.62.jpg"}"#;
        let resp: JobStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, JobStatus::Completed);
        assert_eq!(resp.title.as_deref(), Some("Game X"));
        assert_eq!(resp.cover_url.as_deref(), Some("/covers/SLUS_200.62.jpg"));
        assert!(resp.message.is_none());
    }

    #[test]
    fn processing_job_has_no_metadata() {
        let resp: JobStatusResponse = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert_eq!(resp, JobStatusResponse::with_status(JobStatus::Processing));
    }

    #[test]
    fn error_job_keeps_message() {
        let json = r#"{"status":"error","message":"not a PS2 disc image"}"#;
        let resp: JobStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, JobStatus::Error);
        assert_eq!(resp.message.as_deref(), Some("not a PS2 disc image"));
    }

    #[test]
    fn omits_empty_metadata_when_serialized() {
        let json =
            serde_json::to_string(&JobStatusResponse::with_status(JobStatus::Pending)).unwrap();
        assert_eq!(json, r#"{"status":"pending"}"#);
    }
}
