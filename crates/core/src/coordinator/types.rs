//! Types for the pipeline coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::progress::JobProgress;

/// Lifecycle status of a job.
///
/// Variants are ordered; a job only moves forward, except into `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Compressing,
    Uploading,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Compressing => "compressing",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Whether the job has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether moving to `next` keeps the progression monotonic.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() && (next == Self::Error || next > *self)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A processing stage, each with its own lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Compress,
    Upload,
}

impl Stage {
    /// Stages in pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Download, Stage::Compress, Stage::Upload];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Compress => "compress",
            Self::Upload => "upload",
        }
    }

    /// Status a job must hold to be claimed by this stage's lane.
    pub fn entry_status(&self) -> JobStatus {
        match self {
            Self::Download => JobStatus::Queued,
            Self::Compress => JobStatus::Compressing,
            Self::Upload => JobStatus::Uploading,
        }
    }

    /// Status a job holds while this stage runs.
    pub fn running_status(&self) -> JobStatus {
        match self {
            Self::Download => JobStatus::Downloading,
            Self::Compress => JobStatus::Compressing,
            Self::Upload => JobStatus::Uploading,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a `done` job finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// The artifact was published and `result` holds its reference.
    Published,
    /// No quality tier fit under the size cap; nothing was published.
    SkippedTooLarge,
}

/// Category of the failure recorded on an `error` job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Download,
    Compression,
    Publish,
    /// Media was published but the catalog write failed.
    Persistence,
    Internal,
}

/// A job moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub source_url: String,
    /// Whether the input was supplied locally, skipping the download stage.
    pub local_input: bool,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// Downloaded source, owned by the compress stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<PathBuf>,
    /// Compressed artifact, owned by the upload stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_path: Option<PathBuf>,
    /// Lane currently holding the job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_stage: Option<Stage>,
    /// Remote reference of the published artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a job. A local input skips straight to the compress stage.
    pub fn new(id: String, source_url: String, local_file: Option<PathBuf>) -> Self {
        let (status, local_input) = match local_file {
            Some(_) => (JobStatus::Compressing, true),
            None => (JobStatus::Queued, false),
        };

        Self {
            id,
            source_url,
            local_input,
            status,
            progress: JobProgress::default(),
            download_path: local_file,
            compressed_path: None,
            active_stage: None,
            result: None,
            outcome: None,
            error: None,
            error_kind: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Whether `stage`'s lane may claim this job.
    pub fn is_eligible_for(&self, stage: Stage) -> bool {
        if self.active_stage.is_some() || self.status != stage.entry_status() {
            return false;
        }
        match stage {
            Stage::Download => true,
            Stage::Compress => self.download_path.is_some(),
            Stage::Upload => self.compressed_path.is_some(),
        }
    }
}

/// A job currently held by a lane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveJob {
    pub job_id: String,
    pub source_url: String,
    pub status: JobStatus,
    pub progress: JobProgress,
}

impl From<&Job> for ActiveJob {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            source_url: job.source_url.clone(),
            status: job.status,
            progress: job.progress.clone(),
        }
    }
}

/// Jobs held by each lane. Lists are empty when a lane is idle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageActivity {
    pub download: Vec<ActiveJob>,
    pub compress: Vec<ActiveJob>,
    pub upload: Vec<ActiveJob>,
}

/// Point-in-time snapshot of the coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    /// Jobs waiting for the download lane.
    pub queued_count: usize,
    pub per_stage: StageActivity,
    pub done_count: usize,
    pub error_count: usize,
    pub total: usize,
}
