//! Trait definitions for the publisher module.

use async_trait::async_trait;
use std::path::Path;

use super::error::PublishError;

/// Uploads a finished artifact and returns a durable remote reference.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Publishes `artifact` on behalf of `job_ref`.
    ///
    /// The artifact stays on disk; the caller owns deletion.
    async fn publish(&self, artifact: &Path, job_ref: &str) -> Result<String, PublishError>;
}
