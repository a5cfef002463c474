use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{STREAM_CHUNK_SIZE, TransferError, validate_file_name};

/// A local disc image queued for upload.
///
/// Deliberately not `Clone`: each handle belongs to exactly one transfer.
#[derive(Debug)]
pub struct SourceFile {
    name: String,
    path: PathBuf,
    size: u64,
}

impl SourceFile {
    /// Opens a handle for the file at `path`, reading its size.
    ///
    /// The handle's name is the final path component.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidName(path.display().to_string()))?;

        Ok(Self {
            name,
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }

    /// Builds a handle from already-known parts.
    pub fn from_parts(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        size: u64,
    ) -> Result<Self, TransferError> {
        let name = name.into();
        validate_file_name(&name)?;
        Ok(Self {
            name,
            path: path.into(),
            size,
        })
    }

    /// File name the server will store the image under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes, as measured when the handle was created.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Opens the file and returns its contents as a stream of byte chunks.
    pub async fn byte_stream(&self) -> Result<ReaderStream<File>, TransferError> {
        let file = File::open(&self.path).await?;
        Ok(ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE))
    }
}
