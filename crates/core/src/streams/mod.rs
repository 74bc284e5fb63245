//! Stream admission gate.
//!
//! Limits how many playback sessions may be live at once. Requests beyond
//! the ceiling wait in a FIFO queue and are promoted as slots free up.

mod config;
mod gate;
mod types;

pub use config::StreamGateConfig;
pub use gate::{StartCallback, StreamGate};
pub use types::{StreamAdmission, StreamGateStatus, StreamRelease};
