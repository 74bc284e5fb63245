//! Stage progress reporting.
//!
//! Stages never touch job records directly. They report through a
//! [`ProgressSink`], which the coordinator binds to a single job and stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A single progress report emitted by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Completion percentage (0-100) within the current stage.
    pub percentage: f32,
    /// Megabytes processed so far, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_current_mb: Option<f64>,
    /// Total megabytes expected, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_total_mb: Option<f64>,
    /// Human readable status line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StageProgress {
    /// Progress expressed as a percentage with an optional message.
    pub fn percent(percentage: f32, message: Option<String>) -> Self {
        Self {
            percentage: percentage.clamp(0.0, 100.0),
            message,
            ..Default::default()
        }
    }

    /// Progress derived from byte counts. The percentage stays at 0 when the
    /// total is unknown.
    pub fn from_bytes(current: u64, total: Option<u64>) -> Self {
        let percentage = match total {
            Some(total) if total > 0 => ((current as f64 / total as f64) * 100.0).min(100.0) as f32,
            _ => 0.0,
        };
        Self {
            percentage,
            size_current_mb: Some(bytes_to_mb(current)),
            size_total_mb: total.map(bytes_to_mb),
            message: None,
        }
    }

    /// Attaches a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Progress as stored on a job, stamped with the time of the last report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(flatten)]
    pub current: StageProgress,
    /// When the last report arrived. A value that stops moving while the job
    /// is in a stage means the lane is stuck.
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    /// Zeroed progress, used at every stage entry.
    pub fn reset() -> Self {
        Self {
            current: StageProgress::default(),
            updated_at: Utc::now(),
        }
    }
}

impl Default for JobProgress {
    fn default() -> Self {
        Self::reset()
    }
}

/// Receives progress reports from a running stage.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: StageProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(StageProgress) + Send + Sync,
{
    fn report(&self, progress: StageProgress) {
        self(progress)
    }
}

/// A sink that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _progress: StageProgress) {}
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}
