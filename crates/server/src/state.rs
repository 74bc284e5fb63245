use std::path::Path;
use std::sync::Arc;
use stagehand_core::{ActiveSet, Config, PipelineCoordinator, SanitizedConfig, StreamGate};

/// Shared application state
pub struct AppState {
    config: Config,
    coordinator: Arc<PipelineCoordinator>,
    streams: Arc<StreamGate>,
    active: Arc<ActiveSet>,
}

impl AppState {
    pub fn new(
        config: Config,
        coordinator: Arc<PipelineCoordinator>,
        streams: Arc<StreamGate>,
        active: Arc<ActiveSet>,
    ) -> Self {
        Self {
            config,
            coordinator,
            streams,
            active,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Directory local inputs must live in
    pub fn work_dir(&self) -> &Path {
        &self.config.fetcher.work_dir
    }

    pub fn coordinator(&self) -> &Arc<PipelineCoordinator> {
        &self.coordinator
    }

    pub fn streams(&self) -> &StreamGate {
        self.streams.as_ref()
    }

    /// Ids currently playing; the stream gate marks them on start
    pub fn active(&self) -> &ActiveSet {
        self.active.as_ref()
    }
}
