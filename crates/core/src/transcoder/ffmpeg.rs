//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::TranscoderConfig;
use super::error::CompressionError;
use super::progress::{DiagnosticTail, ProgressParser};
use super::traits::Transcoder;
use super::types::{QualityTier, TranscodeOutcome};
use crate::artifacts::remove_artifact;
use crate::metrics;
use crate::progress::{ProgressSink, StageProgress};

/// Number of stderr lines kept for error reports.
const DIAGNOSTIC_LINES: usize = 40;

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Local path used for the given job's compressed artifact.
    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.config
            .work_dir
            .join(format!("{}_compressed.{}", job_id, self.config.container))
    }

    /// Checks that the ffmpeg binary can be executed.
    pub async fn validate(&self) -> Result<(), CompressionError> {
        let result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CompressionError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            }
            Err(e) => Err(CompressionError::Io(e)),
        }
    }

    /// Builds ffmpeg arguments for one ladder tier.
    fn build_args(&self, input: &Path, output: &Path, tier: &QualityTier) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
        ];

        // Video: constant quality
        args.extend([
            "-c:v".to_string(),
            self.config.video_codec.clone(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-crf".to_string(),
            tier.crf.to_string(),
        ]);

        // Downscale only when the source is taller than the tier allows
        if let Some(height) = tier.max_height {
            args.extend(["-vf".to_string(), format!("scale=-2:'min({},ih)'", height)]);
        }

        // Audio
        args.extend([
            "-c:a".to_string(),
            self.config.audio_codec.clone(),
            "-b:a".to_string(),
            self.config.audio_bitrate.clone(),
        ]);

        args.extend([
            "-threads".to_string(),
            self.config.threads.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-stats".to_string(),
        ]);

        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Runs ffmpeg once, streaming stderr into the progress parser.
    async fn run(
        &self,
        args: &[String],
        label: &str,
        progress: &dyn ProgressSink,
    ) -> Result<(), CompressionError> {
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CompressionError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    CompressionError::Io(e)
                }
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            CompressionError::Io(std::io::Error::other("ffmpeg stderr was not captured"))
        })?;

        // Stats lines end in '\r', diagnostics in '\n'
        let mut segments = BufReader::new(stderr).split(b'\r');
        let mut parser = ProgressParser::new(label);
        let mut tail = DiagnosticTail::new(DIAGNOSTIC_LINES);

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            while let Some(segment) = segments.next_segment().await? {
                let text = String::from_utf8_lossy(&segment);
                for line in text.lines() {
                    if ProgressParser::is_progress_line(line) {
                        if let Some(update) = parser.feed(line) {
                            debug!("{}", update.message.as_deref().unwrap_or_default());
                            progress.report(update);
                        }
                    } else {
                        parser.feed(line);
                        tail.push(line);
                    }
                }
            }
            child.wait().await
        })
        .await;

        match result {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                Err(CompressionError::process_failed(
                    format!("FFmpeg exited with code {}", code),
                    tail.render(),
                ))
            }
            Ok(Err(e)) => Err(CompressionError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                Err(CompressionError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn compress(
        &self,
        input: &Path,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<TranscodeOutcome, CompressionError> {
        if tokio::fs::metadata(input).await.is_err() {
            return Err(CompressionError::InputNotFound {
                path: input.to_path_buf(),
            });
        }
        if self.config.ladder.is_empty() {
            return Err(CompressionError::EmptyLadder);
        }

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let output = self.output_path(job_id);
        let limit = self.config.max_output_bytes;
        let mut smallest = u64::MAX;

        for tier in &self.config.ladder {
            let start = Instant::now();
            info!(
                "Transcoding job {} at tier {} (crf {})",
                job_id, tier.name, tier.crf
            );
            metrics::TRANSCODE_TIER_ATTEMPTS
                .with_label_values(&[tier.name.as_str()])
                .inc();
            progress.report(StageProgress::percent(
                0.0,
                Some(format!("Compressing [{}] 0%", tier.name)),
            ));

            let args = self.build_args(input, &output, tier);
            if let Err(e) = self.run(&args, &tier.name, progress).await {
                remove_artifact(&output).await;
                return Err(e);
            }

            let size = match tokio::fs::metadata(&output).await {
                Ok(meta) => meta.len(),
                Err(_) => {
                    return Err(CompressionError::process_failed(
                        "FFmpeg exited successfully but produced no output",
                        output.to_string_lossy(),
                    ))
                }
            };

            if size <= limit {
                info!(
                    "Transcoded job {} at tier {}: {} bytes in {:?}",
                    job_id,
                    tier.name,
                    size,
                    start.elapsed()
                );
                return Ok(TranscodeOutcome::Compressed {
                    path: output,
                    size_bytes: size,
                    tier: tier.name.clone(),
                });
            }

            warn!(
                "Job {} output is {} bytes at tier {}, over the {} byte cap",
                job_id, size, tier.name, limit
            );
            smallest = smallest.min(size);
            remove_artifact(&output).await;
        }

        Ok(TranscodeOutcome::SkippedTooLarge {
            smallest_bytes: smallest,
            limit_bytes: limit,
        })
    }
}
