//! Mock publisher for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::InFlightTracker;
use crate::publisher::{PublishError, Publisher};

/// A recorded publish for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub artifact: PathBuf,
    pub job_ref: String,
    /// Whether the artifact existed on disk when published.
    pub artifact_existed: bool,
}

/// Mock implementation of the Publisher trait.
///
/// Returns `mock://<job_ref>` references unless told to fail.
#[derive(Debug)]
pub struct MockPublisher {
    publishes: Arc<RwLock<Vec<RecordedPublish>>>,
    next_error: Arc<RwLock<Option<PublishError>>>,
    delay_ms: Arc<RwLock<u64>>,
    tracker: InFlightTracker,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    /// Create a new mock publisher.
    pub fn new() -> Self {
        Self {
            publishes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay_ms: Arc::new(RwLock::new(10)),
            tracker: InFlightTracker::new(),
        }
    }

    /// Get all recorded publishes.
    pub async fn recorded_publishes(&self) -> Vec<RecordedPublish> {
        self.publishes.read().await.clone()
    }

    /// Get the number of publishes performed.
    pub async fn publish_count(&self) -> usize {
        self.publishes.read().await.len()
    }

    /// Configure the next publish to fail with the given error.
    pub async fn set_next_error(&self, error: PublishError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated upload duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Highest number of concurrent publishes seen.
    pub fn max_in_flight(&self) -> usize {
        self.tracker.peak()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(&self, artifact: &Path, job_ref: &str) -> Result<String, PublishError> {
        let _guard = self.tracker.enter();
        let artifact_existed = tokio::fs::metadata(artifact).await.is_ok();
        self.publishes.write().await.push(RecordedPublish {
            artifact: artifact.to_path_buf(),
            job_ref: job_ref.to_string(),
            artifact_existed,
        });

        let delay = *self.delay_ms.read().await;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        Ok(format!("mock://{}", job_ref))
    }
}
