pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{DEFAULT_SERVER_URL, UPLOAD_FIELD, UPLOAD_PATH, job_path};
pub use messages::{JobStatusResponse, UploadResponse};
pub use types::{JobPhase, JobStatus};
