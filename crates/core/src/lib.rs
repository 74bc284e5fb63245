pub mod active;
pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod fetcher;
pub mod metrics;
pub mod progress;
pub mod publisher;
pub mod streams;
pub mod testing;
pub mod transcoder;

pub use active::{ActiveSet, ActiveSnapshot, SubscriptionId};
pub use catalog::{CatalogError, ContentCatalog, MediaItem, SqliteCatalog};
pub use config::{
    load_config, load_config_from_str, validate_config, CatalogConfig, Config, ConfigError,
    SanitizedConfig, ServerConfig,
};
pub use coordinator::{
    CoordinatorConfig, CoordinatorError, CoordinatorStatus, ErrorKind, Job, JobOutcome,
    JobStatus, JobUpdateCallback, PipelineCoordinator, Stage, StageError,
};
pub use fetcher::{DownloadError, Fetcher, FetcherConfig, HttpFetcher};
pub use progress::{JobProgress, NoopProgress, ProgressSink, StageProgress};
pub use publisher::{Credentials, PublishError, Publisher, PublisherConfig, RemotePublisher};
pub use streams::{
    StreamAdmission, StreamGate, StreamGateConfig, StreamGateStatus, StreamRelease,
};
pub use transcoder::{
    CompressionError, FfmpegTranscoder, QualityTier, TranscodeOutcome, Transcoder,
    TranscoderConfig,
};
