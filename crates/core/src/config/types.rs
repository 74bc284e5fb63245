use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::coordinator::CoordinatorConfig;
use crate::fetcher::FetcherConfig;
use crate::publisher::PublisherConfig;
use crate::streams::StreamGateConfig;
use crate::transcoder::{QualityTier, TranscoderConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub streams: StreamGateConfig,
    /// Content database. Without it published references are not written back.
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Content catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("stagehand.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub coordinator: CoordinatorConfig,
    pub fetcher: SanitizedFetcherConfig,
    pub transcoder: SanitizedTranscoderConfig,
    pub publisher: SanitizedPublisherConfig,
    pub streams: StreamGateConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,
}

/// Fetcher settings worth showing to operators.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetcherConfig {
    pub work_dir: PathBuf,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub attempt_timeout_secs: u64,
    pub progress_interval_ms: u64,
}

/// Transcoder settings worth showing to operators.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranscoderConfig {
    pub ffmpeg_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub container: String,
    pub max_output_bytes: u64,
    pub timeout_secs: u64,
    pub ladder: Vec<QualityTier>,
}

/// Publisher config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPublisherConfig {
    pub endpoint: String,
    pub credentials_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            coordinator: config.coordinator.clone(),
            fetcher: SanitizedFetcherConfig {
                work_dir: config.fetcher.work_dir.clone(),
                max_retries: config.fetcher.max_retries,
                retry_delay_ms: config.fetcher.retry_delay_ms,
                attempt_timeout_secs: config.fetcher.attempt_timeout_secs,
                progress_interval_ms: config.fetcher.progress_interval_ms,
            },
            transcoder: SanitizedTranscoderConfig {
                ffmpeg_path: config.transcoder.ffmpeg_path.clone(),
                video_codec: config.transcoder.video_codec.clone(),
                audio_codec: config.transcoder.audio_codec.clone(),
                container: config.transcoder.container.clone(),
                max_output_bytes: config.transcoder.max_output_bytes,
                timeout_secs: config.transcoder.timeout_secs,
                ladder: config.transcoder.ladder.clone(),
            },
            publisher: SanitizedPublisherConfig {
                endpoint: config.publisher.endpoint.clone(),
                credentials_configured: config.publisher.credentials.is_some(),
                timeout_secs: config.publisher.timeout_secs,
            },
            streams: config.streams.clone(),
            catalog: config.catalog.clone(),
        }
    }
}
