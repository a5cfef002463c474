//! Local source files and byte-level upload progress.
//!
//! A [`SourceFile`] is the handle a caller submits for upload: a disc image
//! on local disk whose size is known up front and whose bytes can be
//! streamed. [`ProgressTracker`] turns acknowledged byte counts into the
//! whole-percent values the queue exposes.

mod naming;
mod progress;
mod source;

pub use naming::{disambiguate_name, validate_file_name};
pub use progress::{ProgressCallback, ProgressTracker, percent_of};
pub use source::SourceFile;

/// Read buffer used when streaming a source file: 256 KiB.
///
/// Each buffer read is one progress sample, so this also bounds how often
/// progress is recomputed for multi-gigabyte images.
pub const STREAM_CHUNK_SIZE: usize = 256 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),
}
