//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One rung of the quality ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    /// Label used in logs and progress messages.
    pub name: String,
    /// Constant rate factor (higher is smaller and worse).
    pub crf: u8,
    /// Maximum output height in pixels. `None` keeps the source resolution.
    #[serde(default)]
    pub max_height: Option<u32>,
}

impl QualityTier {
    pub fn new(name: impl Into<String>, crf: u8, max_height: Option<u32>) -> Self {
        Self {
            name: name.into(),
            crf,
            max_height,
        }
    }
}

/// Result of a transcode that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscodeOutcome {
    /// An artifact within the size cap was produced.
    Compressed {
        path: PathBuf,
        size_bytes: u64,
        tier: String,
    },
    /// Every tier produced an artifact over the cap. Nothing is left on disk.
    SkippedTooLarge {
        smallest_bytes: u64,
        limit_bytes: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_deserialize_without_height() {
        let tier: QualityTier = toml::from_str("name = \"source\"\ncrf = 23").unwrap();
        assert_eq!(tier, QualityTier::new("source", 23, None));
    }
}
