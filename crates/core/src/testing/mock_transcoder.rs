//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::InFlightTracker;
use crate::progress::{ProgressSink, StageProgress};
use crate::transcoder::{CompressionError, TranscodeOutcome, Transcoder};

/// A recorded compression for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCompression {
    pub input: PathBuf,
    pub job_id: String,
}

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Track compressions for assertions
/// - Simulate failure or a too-large skip
/// - Simulate transcode duration
/// - Optionally write real output files into a work directory
#[derive(Debug)]
pub struct MockTranscoder {
    compressions: Arc<RwLock<Vec<RecordedCompression>>>,
    next_error: Arc<RwLock<Option<CompressionError>>>,
    skip_all: Arc<RwLock<bool>>,
    delay_ms: Arc<RwLock<u64>>,
    work_dir: Option<PathBuf>,
    tracker: InFlightTracker,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self {
            compressions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            skip_all: Arc::new(RwLock::new(false)),
            delay_ms: Arc::new(RwLock::new(10)),
            work_dir: None,
            tracker: InFlightTracker::new(),
        }
    }

    /// Write a small output file per job into `work_dir`.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    /// Get all recorded compressions.
    pub async fn recorded_compressions(&self) -> Vec<RecordedCompression> {
        self.compressions.read().await.clone()
    }

    /// Configure the next compression to fail with the given error.
    pub async fn set_next_error(&self, error: CompressionError) {
        *self.next_error.write().await = Some(error);
    }

    /// Report every input as too large for all tiers.
    pub async fn set_skip_all(&self, skip: bool) {
        *self.skip_all.write().await = skip;
    }

    /// Set the simulated transcode duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Highest number of concurrent compressions seen.
    pub fn max_in_flight(&self) -> usize {
        self.tracker.peak()
    }

    /// Path this mock returns for a job.
    pub fn output_path(&self, job_id: &str) -> PathBuf {
        let dir = self
            .work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/mock"));
        dir.join(format!("{}_compressed.mp4", job_id))
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compress(
        &self,
        input: &Path,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<TranscodeOutcome, CompressionError> {
        let _guard = self.tracker.enter();
        self.compressions.write().await.push(RecordedCompression {
            input: input.to_path_buf(),
            job_id: job_id.to_string(),
        });

        let delay = *self.delay_ms.read().await;
        progress.report(StageProgress::percent(
            50.0,
            Some("Compressing [mock] 50%".to_string()),
        ));
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if *self.skip_all.read().await {
            return Ok(TranscodeOutcome::SkippedTooLarge {
                smallest_bytes: 4096,
                limit_bytes: 1024,
            });
        }

        let path = self.output_path(job_id);
        if self.work_dir.is_some() {
            tokio::fs::write(&path, vec![0u8; 512]).await?;
        }
        progress.report(StageProgress::percent(
            100.0,
            Some("Compressing [mock] 100%".to_string()),
        ));
        Ok(TranscodeOutcome::Compressed {
            path,
            size_bytes: 512,
            tier: "mock".to_string(),
        })
    }
}
