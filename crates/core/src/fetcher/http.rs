//! Resumable HTTP fetcher implementation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::FetcherConfig;
use super::error::DownloadError;
use super::traits::Fetcher;
use crate::artifacts::remove_artifact;
use crate::metrics;
use crate::progress::{bytes_to_mb, ProgressSink, StageProgress};

/// Downloads sources over HTTP(S), resuming partial files with range requests.
pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    /// Creates a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self, DownloadError> {
        Self::new(FetcherConfig::default())
    }

    /// Local path used for the given job's source file.
    pub fn source_path(&self, url: &str, job_id: &str) -> PathBuf {
        let ext = extension_from_url(url).unwrap_or_else(|| self.config.default_extension.clone());
        self.config
            .work_dir
            .join(format!("{}_source.{}", job_id, ext))
    }

    /// Runs one attempt, appending to `path` when it already holds bytes.
    async fn attempt(
        &self,
        url: &str,
        path: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        let existing = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let mut request = self.client.get(url);
        if existing > 0 {
            debug!("Resuming {} from byte {}", url, existing);
            request = request.header(RANGE, format!("bytes={}-", existing));
        }

        let response = request.send().await?;
        let status = response.status();

        let (start, total) = match status {
            StatusCode::PARTIAL_CONTENT => {
                let range = content_range(response.headers());
                let served_from = range.map_or(existing, |r| r.start);
                if served_from != existing && served_from != 0 {
                    // Neither our offset nor a fresh start; the partial is useless now
                    remove_artifact(path).await;
                    return Err(DownloadError::RangeMismatch {
                        requested: existing,
                        served: served_from,
                    });
                }
                if served_from == 0 && existing > 0 {
                    warn!(
                        "Server answered range request for {} from byte 0, restarting",
                        url
                    );
                }
                let total = range
                    .and_then(|r| r.total)
                    .or_else(|| response.content_length().map(|len| len + served_from));
                (served_from, total)
            }
            StatusCode::OK => {
                if existing > 0 {
                    warn!(
                        "Server ignored range request for {}, restarting from zero",
                        url
                    );
                }
                (0, response.content_length())
            }
            other => {
                return Err(DownloadError::UnexpectedStatus {
                    status: other.as_u16(),
                    url: url.to_string(),
                })
            }
        };

        let mut file = if start > 0 {
            OpenOptions::new().append(true).open(path).await?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await?
        };

        let interval = Duration::from_millis(self.config.progress_interval_ms);
        let mut last_report = Instant::now();
        let mut written = start;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(expected) = total {
                if written + chunk.len() as u64 > expected {
                    drop(file);
                    remove_artifact(path).await;
                    return Err(DownloadError::Overrun { expected });
                }
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            metrics::DOWNLOADED_BYTES.inc_by(chunk.len() as u64);

            if last_report.elapsed() >= interval {
                progress.report(download_progress(written, total));
                last_report = Instant::now();
            }
        }

        file.flush().await?;
        drop(file);

        if let Some(expected) = total {
            if written < expected {
                return Err(DownloadError::Incomplete { written, expected });
            }
        }

        progress.report(download_progress(written, Some(written)));
        Ok(())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn download(
        &self,
        url: &str,
        job_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, DownloadError> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let path = self.source_path(url, job_id);
        let attempts = self.config.max_retries + 1;
        let attempt_timeout = Duration::from_secs(self.config.attempt_timeout_secs);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let result = match timeout(attempt_timeout, self.attempt(url, &path, progress)).await
            {
                Ok(result) => result,
                Err(_) => Err(DownloadError::Timeout {
                    timeout_secs: self.config.attempt_timeout_secs,
                }),
            };

            match result {
                Ok(()) => {
                    info!("Downloaded {} to {:?} (attempt {})", url, path, attempt);
                    return Ok(path);
                }
                Err(e) if !e.is_retryable() => {
                    remove_artifact(&path).await;
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Download attempt {}/{} for job {} failed: {}",
                        attempt, attempts, job_id, e
                    );
                    last_error = e.to_string();
                    if attempt < attempts {
                        metrics::DOWNLOAD_RETRIES.inc();
                        tokio::time::sleep(self.config.retry_delay(attempt)).await;
                    }
                }
            }
        }

        // Giving up; the partial file is no longer anyone's to resume
        remove_artifact(&path).await;
        Err(DownloadError::Exhausted {
            attempts,
            last_error,
        })
    }
}

fn download_progress(written: u64, total: Option<u64>) -> StageProgress {
    let message = match total {
        Some(total) => format!(
            "Downloading {:.1} / {:.1} MB",
            bytes_to_mb(written),
            bytes_to_mb(total)
        ),
        None => format!("Downloading {:.1} MB", bytes_to_mb(written)),
    };
    StageProgress::from_bytes(written, total).with_message(message)
}

/// Parsed `Content-Range: bytes S-E/T` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContentRange {
    start: u64,
    /// Complete length; `None` for `*`.
    total: Option<u64>,
}

fn content_range(headers: &HeaderMap) -> Option<ContentRange> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()
        .and_then(parse_content_range)
}

fn parse_content_range(value: &str) -> Option<ContentRange> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = spec.rsplit_once('/')?;
    let (start, _end) = range.trim().split_once('-')?;
    Some(ContentRange {
        start: start.trim().parse().ok()?,
        total: total.trim().parse().ok(),
    })
}

/// Short alphanumeric extension of the URL's last path segment.
fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    let (_, ext) = name.rsplit_once('.')?;
    if (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_ascii_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(
            parse_content_range("bytes 4194304-10485759/10485760"),
            Some(ContentRange {
                start: 4194304,
                total: Some(10485760)
            })
        );
        assert_eq!(
            parse_content_range("bytes 0-99/*"),
            Some(ContentRange {
                start: 0,
                total: None
            })
        );
        assert_eq!(parse_content_range("bytes */1000"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/media/clip.MKV?token=1"),
            Some("mkv".to_string())
        );
        assert_eq!(extension_from_url("https://example.com/watch"), None);
        assert_eq!(extension_from_url("https://example.com/a.b.c.verylongext"), None);
    }

    #[test]
    fn test_source_path_uses_job_id() {
        let config = FetcherConfig::default().with_work_dir(PathBuf::from("/work"));
        let fetcher = HttpFetcher::new(config).unwrap();
        assert_eq!(
            fetcher.source_path("https://example.com/v.webm", "job-1"),
            PathBuf::from("/work/job-1_source.webm")
        );
        assert_eq!(
            fetcher.source_path("https://example.com/watch?v=1", "job-2"),
            PathBuf::from("/work/job-2_source.mp4")
        );
    }

    #[test]
    fn test_download_progress_message() {
        let p = download_progress(1024 * 1024, Some(4 * 1024 * 1024));
        assert_eq!(p.percentage, 25.0);
        assert_eq!(p.message.as_deref(), Some("Downloading 1.0 / 4.0 MB"));

        let p = download_progress(1024 * 1024, None);
        assert_eq!(p.percentage, 0.0);
        assert_eq!(p.message.as_deref(), Some("Downloading 1.0 MB"));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_scheme() {
        let fetcher = HttpFetcher::with_defaults().unwrap();
        let result = fetcher
            .download("ftp://example.com/file.mp4", "job", &crate::progress::NoopProgress)
            .await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl(_))));
    }
}
