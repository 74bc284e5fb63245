//! Error types for the fetcher module.

use thiserror::Error;

/// Errors that can occur while downloading a source.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    /// The server answered with a status other than 200 or 206.
    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The request could not be sent or the body stream broke.
    #[error("Request failed: {0}")]
    Request(String),

    /// A single attempt exceeded its time budget.
    #[error("Download attempt timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The stream ended before the announced total was written.
    #[error("Download incomplete: wrote {written} of {expected} bytes")]
    Incomplete { written: u64, expected: u64 },

    /// A 206 response started somewhere other than the requested offset.
    #[error("Server resumed at byte {served}, requested {requested}")]
    RangeMismatch { requested: u64, served: u64 },

    /// The server sent more bytes than it announced.
    #[error("Download overran the announced {expected} bytes")]
    Overrun { expected: u64 },

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// All attempts failed.
    #[error("Download failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl DownloadError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_) | Self::Exhausted { .. })
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
