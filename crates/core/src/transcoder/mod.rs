//! Transcoder module for shrinking downloaded sources.
//!
//! The [`FfmpegTranscoder`] walks a quality ladder from best to smallest.
//! Each tier is a full ffmpeg run; the first output at or under
//! `max_output_bytes` wins. When every tier is too large the outcome is
//! [`TranscodeOutcome::SkippedTooLarge`] and no artifact is left behind.
//!
//! Progress is parsed from ffmpeg's stderr stats lines. Non-progress lines
//! are kept in a bounded tail and attached to [`CompressionError::ProcessFailed`]
//! when ffmpeg exits unsuccessfully.
//!
//! # Example
//!
//! ```ignore
//! use stagehand_core::transcoder::{FfmpegTranscoder, Transcoder, TranscoderConfig};
//! use stagehand_core::progress::NoopProgress;
//!
//! let transcoder = FfmpegTranscoder::new(TranscoderConfig::default());
//! transcoder.validate().await?;
//!
//! match transcoder.compress(Path::new("/tmp/job_source.mp4"), "job", &NoopProgress).await? {
//!     TranscodeOutcome::Compressed { path, size_bytes, tier } => { /* upload */ }
//!     TranscodeOutcome::SkippedTooLarge { .. } => { /* give up */ }
//! }
//! ```

mod config;
mod error;
mod ffmpeg;
mod progress;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::CompressionError;
pub use ffmpeg::FfmpegTranscoder;
pub use progress::{DiagnosticTail, ProgressParser};
pub use traits::Transcoder;
pub use types::{QualityTier, TranscodeOutcome};
