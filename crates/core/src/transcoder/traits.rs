//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::Path;

use super::error::CompressionError;
use super::types::TranscodeOutcome;
use crate::progress::ProgressSink;

/// Shrinks a source artifact into something the publisher accepts.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Transcodes `input` for `job_id`.
    ///
    /// Returns [`TranscodeOutcome::SkippedTooLarge`] when no tier fits under
    /// the size cap; that is a terminal outcome, not a failure. The input
    /// file is left untouched either way.
    async fn compress(
        &self,
        input: &Path,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<TranscodeOutcome, CompressionError>;
}
