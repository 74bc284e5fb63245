//! Fetcher module for acquiring remote sources.
//!
//! The [`HttpFetcher`] streams a URL into `{work_dir}/{job_id}_source.<ext>`.
//! When a partial file for the job already exists it resumes with a
//! `Range: bytes=<size>-` request and appends. Failed attempts are retried
//! with linear backoff; progress is reported at a bounded rate.
//!
//! # Example
//!
//! ```ignore
//! use stagehand_core::fetcher::{Fetcher, FetcherConfig, HttpFetcher};
//! use stagehand_core::progress::NoopProgress;
//!
//! let fetcher = HttpFetcher::new(FetcherConfig::default())?;
//! let path = fetcher
//!     .download("https://example.com/video.mp4", "job-1", &NoopProgress)
//!     .await?;
//! ```

mod config;
mod error;
mod http;
mod traits;

pub use config::FetcherConfig;
pub use error::DownloadError;
pub use http::HttpFetcher;
pub use traits::Fetcher;
