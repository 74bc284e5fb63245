//! Types for the stream admission gate.

use serde::{Deserialize, Serialize};

/// Result of asking the gate to start a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamAdmission {
    /// A slot was free and the stream started.
    Started,
    /// The gate is full; the stream waits at `position` (1-based).
    Queued { position: usize },
    /// The id already holds a slot.
    AlreadyActive,
    /// The id is already waiting.
    AlreadyQueued,
}

/// What a finish call released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "released", rename_all = "snake_case")]
pub enum StreamRelease {
    /// An active stream gave up its slot; `promoted` took it over.
    Finished { promoted: Option<String> },
    /// A queued request was withdrawn before it started.
    Withdrawn,
}

impl StreamRelease {
    /// The stream promoted into the freed slot, if any.
    pub fn promoted(&self) -> Option<&str> {
        match self {
            Self::Finished { promoted } => promoted.as_deref(),
            Self::Withdrawn => None,
        }
    }
}

/// Point-in-time view of the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamGateStatus {
    pub max_concurrent: usize,
    /// Active ids in admission order.
    pub active: Vec<String>,
    /// Waiting ids in FIFO order.
    pub queued: Vec<String>,
}
