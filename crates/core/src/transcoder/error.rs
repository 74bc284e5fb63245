//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during transcoding.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The quality ladder has no tiers.
    #[error("No quality tiers configured")]
    EmptyLadder,

    /// FFmpeg exited unsuccessfully. `diagnostics` holds its captured stderr.
    #[error("{reason}: {diagnostics}")]
    ProcessFailed { reason: String, diagnostics: String },

    /// FFmpeg ran longer than the configured timeout.
    #[error("Transcode timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while driving the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressionError {
    /// Creates a process failure with captured diagnostics.
    pub fn process_failed(reason: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::ProcessFailed {
            reason: reason.into(),
            diagnostics: diagnostics.into(),
        }
    }
}
