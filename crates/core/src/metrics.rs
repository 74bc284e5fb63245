//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Coordinator (submissions, stage runs, lane occupancy)
//! - Stages (download volume and retries, transcode tiers)
//! - Stream admission (active and queued streams)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts};

// =============================================================================
// Coordinator Metrics
// =============================================================================

/// Jobs accepted by the coordinator.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("stagehand_jobs_submitted_total", "Total jobs submitted").unwrap()
});

/// Stage runs by stage and result.
pub static STAGE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stagehand_stage_runs_total", "Total stage executions"),
        &["stage", "result"], // result: "success", "skipped", "failed"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stagehand_stage_duration_seconds",
            "Duration of a single stage execution",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["stage"],
    )
    .unwrap()
});

/// Jobs currently held by each lane.
pub static LANE_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("stagehand_lane_active", "Jobs currently running per stage lane"),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Bytes written by the fetcher.
pub static DOWNLOADED_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("stagehand_downloaded_bytes_total", "Total bytes downloaded").unwrap()
});

/// Download attempts retried after a failure.
pub static DOWNLOAD_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("stagehand_download_retries_total", "Total download retries").unwrap()
});

/// Transcode attempts by ladder tier.
pub static TRANSCODE_TIER_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stagehand_transcode_tier_attempts_total",
            "Total transcode runs per quality tier",
        ),
        &["tier"],
    )
    .unwrap()
});

// =============================================================================
// Stream Admission Metrics
// =============================================================================

/// Streams currently admitted.
pub static STREAMS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("stagehand_streams_active", "Streams currently running").unwrap()
});

/// Streams waiting for a slot.
pub static STREAMS_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("stagehand_streams_queued", "Streams waiting for admission").unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Coordinator
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(STAGE_RUNS.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(LANE_ACTIVE.clone()),
        // Stages
        Box::new(DOWNLOADED_BYTES.clone()),
        Box::new(DOWNLOAD_RETRIES.clone()),
        Box::new(TRANSCODE_TIER_ATTEMPTS.clone()),
        // Streams
        Box::new(STREAMS_ACTIVE.clone()),
        Box::new(STREAMS_QUEUED.clone()),
    ]
}
