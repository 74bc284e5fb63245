//! Coordinator configuration.

use serde::{Deserialize, Serialize};

use super::types::Stage;

/// Configuration for the pipeline coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Jobs allowed in the download lane at once.
    #[serde(default = "default_lanes")]
    pub download_lanes: usize,

    /// Jobs allowed in the compress lane at once.
    #[serde(default = "default_lanes")]
    pub compress_lanes: usize,

    /// Jobs allowed in the upload lane at once.
    #[serde(default = "default_lanes")]
    pub upload_lanes: usize,

    /// How long finished jobs stay queryable (seconds).
    /// Unset keeps them for the life of the process.
    #[serde(default)]
    pub retention_secs: Option<u64>,

    /// Delete artifacts of jobs that end in error.
    /// Disable to keep them around for inspection.
    #[serde(default = "default_cleanup")]
    pub cleanup_artifacts: bool,
}

fn default_lanes() -> usize {
    1
}

fn default_cleanup() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            download_lanes: default_lanes(),
            compress_lanes: default_lanes(),
            upload_lanes: default_lanes(),
            retention_secs: None,
            cleanup_artifacts: default_cleanup(),
        }
    }
}

impl CoordinatorConfig {
    /// Concurrency ceiling of a stage's lane.
    pub fn lanes(&self, stage: Stage) -> usize {
        match stage {
            Stage::Download => self.download_lanes,
            Stage::Compress => self.compress_lanes,
            Stage::Upload => self.upload_lanes,
        }
    }

    /// Sets the concurrency ceiling of a stage's lane.
    pub fn with_lanes(mut self, stage: Stage, lanes: usize) -> Self {
        match stage {
            Stage::Download => self.download_lanes = lanes,
            Stage::Compress => self.compress_lanes = lanes,
            Stage::Upload => self.upload_lanes = lanes,
        }
        self
    }

    /// Sets the retention window for finished jobs.
    pub fn with_retention(mut self, secs: u64) -> Self {
        self.retention_secs = Some(secs);
        self
    }
}
