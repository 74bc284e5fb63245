//! Configuration for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the resumable HTTP fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Directory that holds `{job_id}_source.<ext>` files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Retries after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay in milliseconds. Retry `n` waits `n * retry_delay_ms`.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Timeout for a single download attempt in seconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Minimum interval between progress reports in milliseconds.
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// File extension used when the URL does not carry one.
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("stagehand")
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

fn default_attempt_timeout() -> u64 {
    3600 // 1 hour
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_progress_interval() -> u64 {
    2000
}

fn default_user_agent() -> String {
    format!("stagehand/{}", env!("CARGO_PKG_VERSION"))
}

fn default_extension() -> String {
    "mp4".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            attempt_timeout_secs: default_attempt_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            progress_interval_ms: default_progress_interval(),
            user_agent: default_user_agent(),
            default_extension: default_extension(),
        }
    }
}

impl FetcherConfig {
    /// Sets the work directory.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Sets the base retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the number of retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the progress reporting interval.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(retry as u64))
    }
}
