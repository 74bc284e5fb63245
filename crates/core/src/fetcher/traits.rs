//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::DownloadError;
use crate::progress::ProgressSink;

/// Acquires a remote source into local storage.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads `url` for `job_id` and returns the local path.
    ///
    /// The returned file is closed and complete. The caller owns it and is
    /// responsible for deleting it.
    async fn download(
        &self,
        url: &str,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError>;
}
