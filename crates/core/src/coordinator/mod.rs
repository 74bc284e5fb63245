//! Pipeline coordinator for staged job processing.
//!
//! The coordinator owns all job records and runs one lane per stage:
//! - **Download**: fetch the source into the work directory
//! - **Compress**: transcode it down the quality ladder
//! - **Upload**: publish the artifact and record the reference
//!
//! Each lane has its own concurrency ceiling, so different jobs occupy
//! different stages at the same time. Stage failures end the job in
//! `error` without affecting other jobs. There is no cancellation: a
//! submitted job runs until it is `done` or `error`.

mod config;
mod error;
mod runner;
mod types;

pub use config::CoordinatorConfig;
pub use error::{CoordinatorError, StageError};
pub use runner::{JobUpdateCallback, PipelineCoordinator};
pub use types::{
    ActiveJob, CoordinatorStatus, ErrorKind, Job, JobOutcome, JobStatus, Stage, StageActivity,
};
