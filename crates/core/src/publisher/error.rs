//! Error types for the publisher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while publishing an artifact.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The artifact to upload does not exist.
    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: PathBuf },

    /// The backend refused the upload.
    #[error("Backend rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request could not be completed.
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered with something we could not understand.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Reading the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
