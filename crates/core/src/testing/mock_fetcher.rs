//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{InFlightGuard, InFlightTracker};
use crate::fetcher::{DownloadError, Fetcher};
use crate::progress::{ProgressSink, StageProgress};

/// A recorded download for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedDownload {
    pub url: String,
    pub job_id: String,
}

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Track downloads for assertions
/// - Fail or panic for specific URLs
/// - Simulate download duration
/// - Optionally write real source files into a work directory
#[derive(Debug)]
pub struct MockFetcher {
    downloads: Arc<RwLock<Vec<RecordedDownload>>>,
    failures: Arc<RwLock<HashMap<String, String>>>,
    panics: Arc<RwLock<HashSet<String>>>,
    delay_ms: Arc<RwLock<u64>>,
    work_dir: Option<PathBuf>,
    tracker: InFlightTracker,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a mock fetcher that returns paths without touching the disk.
    pub fn new() -> Self {
        Self {
            downloads: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            panics: Arc::new(RwLock::new(HashSet::new())),
            delay_ms: Arc::new(RwLock::new(10)),
            work_dir: None,
            tracker: InFlightTracker::new(),
        }
    }

    /// Write a small source file per job into `work_dir`.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    /// Get all recorded downloads.
    pub async fn recorded_downloads(&self) -> Vec<RecordedDownload> {
        self.downloads.read().await.clone()
    }

    /// Fail every download of `url` with `message`.
    pub async fn fail_on(&self, url: &str, message: &str) {
        self.failures
            .write()
            .await
            .insert(url.to_string(), message.to_string());
    }

    /// Panic inside every download of `url`.
    pub async fn panic_on(&self, url: &str) {
        self.panics.write().await.insert(url.to_string());
    }

    /// Set the simulated download duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Highest number of concurrent downloads seen.
    pub fn max_in_flight(&self) -> usize {
        self.tracker.peak()
    }

    /// Path this mock returns for a job.
    pub fn source_path(&self, job_id: &str) -> PathBuf {
        let dir = self
            .work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/mock"));
        dir.join(format!("{}_source.mp4", job_id))
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn download(
        &self,
        url: &str,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError> {
        let _guard: InFlightGuard = self.tracker.enter();
        self.downloads.write().await.push(RecordedDownload {
            url: url.to_string(),
            job_id: job_id.to_string(),
        });

        let delay = *self.delay_ms.read().await;
        progress.report(StageProgress::from_bytes(0, Some(1024)));
        tokio::time::sleep(Duration::from_millis(delay / 2)).await;
        progress.report(StageProgress::from_bytes(512, Some(1024)));
        tokio::time::sleep(Duration::from_millis(delay - delay / 2)).await;

        if self.panics.read().await.contains(url) {
            panic!("mock fetcher panic for {}", url);
        }
        if let Some(message) = self.failures.read().await.get(url) {
            return Err(DownloadError::Exhausted {
                attempts: 4,
                last_error: message.clone(),
            });
        }

        let path = self.source_path(job_id);
        if self.work_dir.is_some() {
            tokio::fs::write(&path, vec![0u8; 1024]).await?;
        }
        progress.report(StageProgress::from_bytes(1024, Some(1024)));
        Ok(path)
    }
}
