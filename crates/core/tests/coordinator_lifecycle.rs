//! Coordinator lifecycle integration tests.
//!
//! These tests drive the pipeline coordinator with mock stages:
//! - Pipelining across lanes (different jobs in different stages)
//! - Per-lane concurrency ceilings
//! - Skip, stage failure and persistence failure outcomes
//! - Local-file submissions bypassing the download lane
//! - Monotonic status updates

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio_test::assert_ok;

use stagehand_core::{
    testing::{MockCatalog, MockFetcher, MockPublisher, MockTranscoder},
    CompressionError, ContentCatalog, CoordinatorConfig, ErrorKind, JobOutcome, JobStatus,
    JobUpdateCallback, PipelineCoordinator, Stage,
};

/// Test helper wiring a coordinator to mock stages that write real files.
struct TestHarness {
    coordinator: Arc<PipelineCoordinator>,
    fetcher: Arc<MockFetcher>,
    transcoder: Arc<MockTranscoder>,
    publisher: Arc<MockPublisher>,
    updates: Arc<Mutex<Vec<(String, JobStatus)>>>,
    work_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(CoordinatorConfig::default(), None)
    }

    fn with_config(config: CoordinatorConfig, catalog: Option<Arc<dyn ContentCatalog>>) -> Self {
        let work_dir = TempDir::new().expect("Failed to create work dir");
        let fetcher = Arc::new(MockFetcher::new().with_work_dir(work_dir.path().to_path_buf()));
        let transcoder =
            Arc::new(MockTranscoder::new().with_work_dir(work_dir.path().to_path_buf()));
        let publisher = Arc::new(MockPublisher::new());

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let callback: JobUpdateCallback = Arc::new(move |job_id: &str, status: JobStatus| {
            sink.lock().unwrap().push((job_id.to_string(), status));
        });

        let mut coordinator = PipelineCoordinator::new(
            config,
            fetcher.clone(),
            transcoder.clone(),
            publisher.clone(),
        )
        .with_update_callback(callback);
        if let Some(catalog) = catalog {
            coordinator = coordinator.with_catalog(catalog);
        }

        Self {
            coordinator: Arc::new(coordinator),
            fetcher,
            transcoder,
            publisher,
            updates,
            work_dir,
        }
    }

    async fn wait_for_terminal(&self, job_id: &str) -> JobStatus {
        for _ in 0..500 {
            if let Some(job) = self.coordinator.get_job(job_id) {
                if job.status.is_terminal() {
                    return job.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal status", job_id);
    }

    fn statuses_for(&self, job_id: &str) -> Vec<JobStatus> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[tokio::test]
async fn test_single_job_reaches_done_with_reference() {
    let harness = TestHarness::new();

    let job_id = assert_ok!(harness
        .coordinator
        .submit("https://example.com/clip.mp4", None));
    let status = harness.wait_for_terminal(&job_id).await;
    assert_eq!(status, JobStatus::Done);

    let job = harness.coordinator.get_job(&job_id).unwrap();
    assert_eq!(job.outcome, Some(JobOutcome::Published));
    let reference = job.result.expect("done job should carry a reference");
    assert!(reference.starts_with("mock://"), "got {}", reference);
    assert!(job.error.is_none());
    assert!(job.active_stage.is_none());
    assert!(job.completed_at.is_some());

    // Every intermediate artifact is gone once the job is done
    assert!(!harness.fetcher.source_path(&job_id).exists());
    assert!(!harness.transcoder.output_path(&job_id).exists());

    let publishes = harness.publisher.recorded_publishes().await;
    assert_eq!(publishes.len(), 1);
    assert!(publishes[0].artifact_existed);
}

#[tokio::test]
async fn test_statuses_only_move_forward() {
    let harness = TestHarness::new();

    let job_id = assert_ok!(harness
        .coordinator
        .submit("https://example.com/clip.mp4", None));
    harness.wait_for_terminal(&job_id).await;

    let statuses = harness.statuses_for(&job_id);
    assert_eq!(statuses.first(), Some(&JobStatus::Queued));
    assert_eq!(statuses.last(), Some(&JobStatus::Done));
    for pair in statuses.windows(2) {
        assert!(
            pair[0] <= pair[1],
            "status regressed from {} to {}",
            pair[0],
            pair[1]
        );
    }
    assert!(statuses.contains(&JobStatus::Downloading));
    assert!(statuses.contains(&JobStatus::Compressing));
    assert!(statuses.contains(&JobStatus::Uploading));
}

#[tokio::test]
async fn test_jobs_pipeline_across_lanes() {
    let harness = TestHarness::new();
    harness.fetcher.set_delay(Duration::from_millis(150)).await;
    harness.transcoder.set_delay(Duration::from_millis(150)).await;
    harness.publisher.set_delay(Duration::from_millis(20)).await;

    let first = assert_ok!(harness
        .coordinator
        .submit("https://example.com/one.mp4", None));
    let second = assert_ok!(harness
        .coordinator
        .submit("https://example.com/two.mp4", None));

    // Wait until the first job has moved on and the second took its lane
    let mut overlapped = false;
    for _ in 0..200 {
        let status = harness.coordinator.get_status();
        let compressing: Vec<_> = status
            .per_stage
            .compress
            .iter()
            .map(|j| j.job_id.clone())
            .collect();
        let downloading: Vec<_> = status
            .per_stage
            .download
            .iter()
            .map(|j| j.job_id.clone())
            .collect();
        if compressing.contains(&first) && downloading.contains(&second) {
            overlapped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(overlapped, "second job never downloaded while first compressed");

    assert_eq!(harness.wait_for_terminal(&first).await, JobStatus::Done);
    assert_eq!(harness.wait_for_terminal(&second).await, JobStatus::Done);

    let status = harness.coordinator.get_status();
    assert_eq!(status.done_count, 2);
    assert_eq!(status.total, 2);
    assert!(status.per_stage.download.is_empty());
    assert!(status.per_stage.compress.is_empty());
    assert!(status.per_stage.upload.is_empty());
}

#[tokio::test]
async fn test_lane_ceilings_are_respected() {
    let harness = TestHarness::new();
    harness.fetcher.set_delay(Duration::from_millis(20)).await;
    harness.transcoder.set_delay(Duration::from_millis(30)).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let url = format!("https://example.com/{}.mp4", i);
        ids.push(assert_ok!(harness.coordinator.submit(&url, None)));
    }

    // Everything beyond the first job waits in queued
    let queued = harness.coordinator.get_status().queued_count;
    assert!(queued >= 3, "expected most jobs queued, got {}", queued);

    for id in &ids {
        assert_eq!(harness.wait_for_terminal(id).await, JobStatus::Done);
    }

    assert_eq!(harness.fetcher.max_in_flight(), 1);
    assert_eq!(harness.transcoder.max_in_flight(), 1);
    assert_eq!(harness.publisher.max_in_flight(), 1);
}

#[tokio::test]
async fn test_wider_lane_runs_in_parallel() {
    let config = CoordinatorConfig::default().with_lanes(Stage::Download, 3);
    let harness = TestHarness::with_config(config, None);
    harness.fetcher.set_delay(Duration::from_millis(100)).await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let url = format!("https://example.com/{}.mp4", i);
        ids.push(assert_ok!(harness.coordinator.submit(&url, None)));
    }
    for id in &ids {
        harness.wait_for_terminal(id).await;
    }

    assert_eq!(harness.fetcher.max_in_flight(), 3);
    assert_eq!(harness.transcoder.max_in_flight(), 1);
}

#[tokio::test]
async fn test_first_in_first_out_per_lane() {
    let harness = TestHarness::new();

    let mut ids = Vec::new();
    for i in 0..3 {
        let url = format!("https://example.com/{}.mp4", i);
        ids.push(assert_ok!(harness.coordinator.submit(&url, None)));
    }
    for id in &ids {
        harness.wait_for_terminal(id).await;
    }

    let downloads: Vec<_> = harness
        .fetcher
        .recorded_downloads()
        .await
        .into_iter()
        .map(|d| d.job_id)
        .collect();
    assert_eq!(downloads, ids);

    let compressions: Vec<_> = harness
        .transcoder
        .recorded_compressions()
        .await
        .into_iter()
        .map(|c| c.job_id)
        .collect();
    assert_eq!(compressions, ids);
}

#[tokio::test]
async fn test_skip_outcome_never_publishes() {
    let harness = TestHarness::new();
    harness.transcoder.set_skip_all(true).await;

    let job_id = assert_ok!(harness
        .coordinator
        .submit("https://example.com/huge.mp4", None));
    assert_eq!(harness.wait_for_terminal(&job_id).await, JobStatus::Done);

    let job = harness.coordinator.get_job(&job_id).unwrap();
    assert_eq!(job.outcome, Some(JobOutcome::SkippedTooLarge));
    assert!(job.result.is_none());
    assert!(job.error.is_none());
    assert_eq!(harness.publisher.publish_count().await, 0);
    assert!(!harness.fetcher.source_path(&job_id).exists());
}

#[tokio::test]
async fn test_compression_failure_carries_diagnostics() {
    let harness = TestHarness::new();
    harness
        .transcoder
        .set_next_error(CompressionError::process_failed(
            "FFmpeg exited with code 1",
            "moov atom not found",
        ))
        .await;

    let job_id = assert_ok!(harness
        .coordinator
        .submit("https://example.com/broken.mp4", None));
    assert_eq!(harness.wait_for_terminal(&job_id).await, JobStatus::Error);

    let job = harness.coordinator.get_job(&job_id).unwrap();
    assert_eq!(job.error_kind, Some(ErrorKind::Compression));
    let message = job.error.unwrap();
    assert!(message.contains("moov atom not found"), "got {}", message);
    assert!(job.result.is_none());
    assert_eq!(harness.publisher.publish_count().await, 0);

    // The downloaded input is cleaned up on failure
    assert!(!harness.fetcher.source_path(&job_id).exists());
}

#[tokio::test]
async fn test_failure_does_not_affect_other_jobs() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .fail_on("https://example.com/bad.mp4", "connection reset")
        .await;

    let bad = assert_ok!(harness
        .coordinator
        .submit("https://example.com/bad.mp4", None));
    let good = assert_ok!(harness
        .coordinator
        .submit("https://example.com/good.mp4", None));

    assert_eq!(harness.wait_for_terminal(&bad).await, JobStatus::Error);
    assert_eq!(harness.wait_for_terminal(&good).await, JobStatus::Done);

    let bad_job = harness.coordinator.get_job(&bad).unwrap();
    assert_eq!(bad_job.error_kind, Some(ErrorKind::Download));
    assert!(bad_job.error.unwrap().contains("connection reset"));

    let status = harness.coordinator.get_status();
    assert_eq!(status.error_count, 1);
    assert_eq!(status.done_count, 1);
}

#[tokio::test]
async fn test_persistence_failure_keeps_reference() {
    let catalog = Arc::new(MockCatalog::new());
    catalog.set_fail_writes(true);
    let harness = TestHarness::with_config(
        CoordinatorConfig::default(),
        Some(catalog.clone() as Arc<dyn ContentCatalog>),
    );

    let job_id = assert_ok!(harness
        .coordinator
        .submit("https://example.com/clip.mp4", None));
    assert_eq!(harness.wait_for_terminal(&job_id).await, JobStatus::Error);

    let job = harness.coordinator.get_job(&job_id).unwrap();
    assert_eq!(job.error_kind, Some(ErrorKind::Persistence));
    assert!(job.result.is_some(), "published reference must be kept");
    assert_eq!(harness.publisher.publish_count().await, 1);
}

#[tokio::test]
async fn test_catalog_records_published_reference() {
    let catalog = Arc::new(MockCatalog::new());
    let harness = TestHarness::with_config(
        CoordinatorConfig::default(),
        Some(catalog.clone() as Arc<dyn ContentCatalog>),
    );
    let url = "https://example.com/clip.mp4";
    assert_ok!(catalog.upsert_item(url, "Clip"));

    let job_id = assert_ok!(harness.coordinator.submit(url, None));
    assert!(assert_ok!(catalog.get_item(url)).in_progress);
    assert_eq!(harness.wait_for_terminal(&job_id).await, JobStatus::Done);

    let item = assert_ok!(catalog.get_item(url));
    assert!(!item.in_progress);
    assert_eq!(item.title, "Clip");
    assert_eq!(item.remote_ref, harness.coordinator.get_job(&job_id).unwrap().result);
}

#[tokio::test]
async fn test_slow_catalog_write_does_not_stall_runtime() {
    // Single-threaded runtime: a blocking write on it would freeze the ticker
    let catalog = Arc::new(MockCatalog::new());
    catalog.set_write_delay(Duration::from_millis(300));
    let harness = TestHarness::with_config(
        CoordinatorConfig::default(),
        Some(catalog.clone() as Arc<dyn ContentCatalog>),
    );
    let url = "https://example.com/clip.mp4";
    assert_ok!(catalog.upsert_item(url, "Clip"));

    let ticks = Arc::new(Mutex::new(vec![Instant::now()]));
    let ticker = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ticks.lock().unwrap().push(Instant::now());
            }
        })
    };

    let job_id = assert_ok!(harness.coordinator.submit(url, None));
    assert_eq!(harness.wait_for_terminal(&job_id).await, JobStatus::Done);
    ticker.abort();

    assert!(assert_ok!(catalog.get_item(url)).remote_ref.is_some());
    let ticks = ticks.lock().unwrap();
    let longest = ticks
        .windows(2)
        .map(|pair| pair[1].duration_since(pair[0]))
        .max()
        .unwrap();
    assert!(
        longest < Duration::from_millis(150),
        "runtime stalled for {:?}",
        longest
    );
}

#[tokio::test]
async fn test_local_file_skips_download() {
    let harness = TestHarness::new();
    let local: PathBuf = harness.work_dir.path().join("upload.mov");
    std::fs::write(&local, b"local bytes").unwrap();

    let job_id = assert_ok!(harness
        .coordinator
        .submit("upload.mov", Some(local.clone())));

    let job = harness.coordinator.get_job(&job_id).unwrap();
    assert!(job.local_input);
    assert_ne!(job.status, JobStatus::Queued);

    assert_eq!(harness.wait_for_terminal(&job_id).await, JobStatus::Done);
    assert!(harness.fetcher.recorded_downloads().await.is_empty());

    let compressions = harness.transcoder.recorded_compressions().await;
    assert_eq!(compressions.len(), 1);
    assert_eq!(compressions[0].input, local);
    assert!(!local.exists(), "consumed local file should be deleted");

    let statuses = harness.statuses_for(&job_id);
    assert!(!statuses.contains(&JobStatus::Downloading));
}

#[tokio::test]
async fn test_list_jobs_in_submission_order() {
    let harness = TestHarness::new();

    let mut ids = Vec::new();
    for i in 0..3 {
        let url = format!("https://example.com/{}.mp4", i);
        ids.push(assert_ok!(harness.coordinator.submit(&url, None)));
    }

    let listed: Vec<_> = harness
        .coordinator
        .list_jobs()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(listed, ids);

    let mut sources: HashMap<String, String> = HashMap::new();
    for job in harness.coordinator.list_jobs() {
        sources.insert(job.id, job.source_url);
    }
    assert_eq!(sources[&ids[1]], "https://example.com/1.mp4");

    for id in &ids {
        harness.wait_for_terminal(id).await;
    }
}

#[tokio::test]
async fn test_unknown_job_is_none() {
    let harness = TestHarness::new();
    assert!(harness.coordinator.get_job("does-not-exist").is_none());
    assert_eq!(harness.coordinator.get_status().total, 0);
}
