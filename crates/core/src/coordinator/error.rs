//! Error types for the pipeline coordinator.

use thiserror::Error;

use super::types::ErrorKind;
use crate::catalog::CatalogError;
use crate::fetcher::DownloadError;
use crate::publisher::PublishError;
use crate::transcoder::CompressionError;

/// Errors returned to callers of the coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The submission is missing its source.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
}

/// Failure of a single stage, recorded on the job.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The media was published but the catalog was not updated.
    #[error("published but catalog update failed: {0}")]
    Persistence(#[from] CatalogError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StageError {
    /// Category recorded on the job.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Download(_) => ErrorKind::Download,
            Self::Compression(_) => ErrorKind::Compression,
            Self::Publish(_) => ErrorKind::Publish,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
