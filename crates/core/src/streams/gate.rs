//! Bounded-concurrency admission for playback streams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::config::StreamGateConfig;
use super::types::{StreamAdmission, StreamGateStatus, StreamRelease};
use crate::metrics;

/// Callback fired whenever a stream gets a slot.
pub type StartCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct GateState {
    active: Vec<String>,
    queue: VecDeque<String>,
}

/// FIFO admission gate with a fixed ceiling of concurrent streams.
pub struct StreamGate {
    max_concurrent: usize,
    state: Mutex<GateState>,
    on_start: Option<StartCallback>,
}

impl StreamGate {
    /// Create a gate with the given configuration.
    pub fn new(config: StreamGateConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            state: Mutex::new(GateState::default()),
            on_start: None,
        }
    }

    /// Set the callback fired on immediate starts and on promotions.
    pub fn with_start_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(callback));
        self
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_gauges(state: &GateState) {
        metrics::STREAMS_ACTIVE.set(state.active.len() as i64);
        metrics::STREAMS_QUEUED.set(state.queue.len() as i64);
    }

    fn notify_started(&self, id: &str) {
        if let Some(callback) = &self.on_start {
            callback(id);
        }
    }

    /// Start `id` if a slot is free, otherwise queue it.
    ///
    /// Requests for ids already active or queued change nothing.
    pub fn request_stream(&self, id: &str) -> StreamAdmission {
        let admission = {
            let mut state = self.lock();
            if state.active.iter().any(|a| a == id) {
                return StreamAdmission::AlreadyActive;
            }
            if state.queue.iter().any(|q| q == id) {
                return StreamAdmission::AlreadyQueued;
            }

            let admission = if state.active.len() < self.max_concurrent {
                state.active.push(id.to_string());
                StreamAdmission::Started
            } else {
                state.queue.push_back(id.to_string());
                StreamAdmission::Queued {
                    position: state.queue.len(),
                }
            };
            Self::record_gauges(&state);
            admission
        };

        match &admission {
            StreamAdmission::Started => {
                info!("Stream {} started", id);
                self.notify_started(id);
            }
            StreamAdmission::Queued { position } => {
                debug!("Stream {} queued at position {}", id, position);
            }
            _ => {}
        }
        admission
    }

    /// Release `id`. Frees its slot and promotes the next queued stream,
    /// or withdraws it from the queue if it was still waiting.
    ///
    /// Returns `None` when `id` was neither active nor queued.
    pub fn finish(&self, id: &str) -> Option<StreamRelease> {
        let promoted = {
            let mut state = self.lock();

            if let Some(pos) = state.active.iter().position(|a| a == id) {
                state.active.remove(pos);
                let promoted = if state.active.len() < self.max_concurrent {
                    state.queue.pop_front()
                } else {
                    None
                };
                if let Some(next) = &promoted {
                    state.active.push(next.clone());
                }
                Self::record_gauges(&state);
                promoted
            } else {
                let pos = state.queue.iter().position(|q| q == id)?;
                state.queue.remove(pos);
                Self::record_gauges(&state);
                debug!("Stream {} withdrawn from queue", id);
                return Some(StreamRelease::Withdrawn);
            }
        };

        info!("Stream {} finished", id);
        if let Some(next) = &promoted {
            info!("Stream {} promoted from queue", next);
            self.notify_started(next);
        }
        Some(StreamRelease::Finished { promoted })
    }

    /// Whether `id` currently holds a slot.
    pub fn is_active(&self, id: &str) -> bool {
        self.lock().active.iter().any(|a| a == id)
    }

    /// Snapshot of the gate.
    pub fn status(&self) -> StreamGateStatus {
        let state = self.lock();
        StreamGateStatus {
            max_concurrent: self.max_concurrent,
            active: state.active.clone(),
            queued: state.queue.iter().cloned().collect(),
        }
    }
}

impl Default for StreamGate {
    fn default() -> Self {
        Self::new(StreamGateConfig::default())
    }
}
