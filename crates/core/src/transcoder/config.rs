//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::QualityTier;

/// Configuration for the ffmpeg-based transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Directory that holds `{job_id}_compressed.<ext>` files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Video encoder.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Audio encoder.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate, e.g. "128k".
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Encoder preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Encoder threads (0 lets ffmpeg pick).
    #[serde(default)]
    pub threads: u32,

    /// Output container extension.
    #[serde(default = "default_container")]
    pub container: String,

    /// Largest artifact the publisher accepts.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: u64,

    /// Timeout for a single ffmpeg run in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Tiers tried in order until the output fits.
    #[serde(default = "default_ladder")]
    pub ladder: Vec<QualityTier>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("stagehand")
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_container() -> String {
    "mp4".to_string()
}

fn default_max_output_bytes() -> u64 {
    2000 * 1024 * 1024
}

fn default_timeout() -> u64 {
    4 * 3600 // 4 hours
}

fn default_ladder() -> Vec<QualityTier> {
    vec![
        QualityTier::new("source", 23, None),
        QualityTier::new("720p", 28, Some(720)),
        QualityTier::new("480p", 32, Some(480)),
    ]
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            work_dir: default_work_dir(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            preset: default_preset(),
            threads: 0,
            container: default_container(),
            max_output_bytes: default_max_output_bytes(),
            timeout_secs: default_timeout(),
            ladder: default_ladder(),
        }
    }
}

impl TranscoderConfig {
    /// Sets the ffmpeg binary.
    pub fn with_ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = path;
        self
    }

    /// Sets the work directory.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Sets the output size cap.
    pub fn with_max_output_bytes(mut self, max: u64) -> Self {
        self.max_output_bytes = max;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Replaces the quality ladder.
    pub fn with_ladder(mut self, ladder: Vec<QualityTier>) -> Self {
        self.ladder = ladder;
        self
    }
}
