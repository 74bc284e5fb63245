//! Configuration for the stream admission gate.

use serde::{Deserialize, Serialize};

/// Configuration for [`super::StreamGate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamGateConfig {
    /// Maximum number of streams running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    10
}

impl Default for StreamGateConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl StreamGateConfig {
    /// Sets the concurrency ceiling.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }
}
