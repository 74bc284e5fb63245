//! Pipeline coordinator implementation.
//!
//! Every stage has its own lane. A sweep runs after each submission and
//! after every stage completion: for each lane with free capacity it claims
//! the oldest eligible job and spawns the stage. Jobs in different lanes
//! progress independently, so one job can upload while another compresses
//! and a third downloads.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration as ChronoDuration, Utc};
use futures::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifacts::remove_artifact;
use crate::catalog::ContentCatalog;
use crate::fetcher::Fetcher;
use crate::metrics;
use crate::progress::{JobProgress, ProgressSink, StageProgress};
use crate::publisher::Publisher;
use crate::transcoder::{TranscodeOutcome, Transcoder};

use super::config::CoordinatorConfig;
use super::error::{CoordinatorError, StageError};
use super::types::{
    ActiveJob, CoordinatorStatus, Job, JobOutcome, JobStatus, Stage, StageActivity,
};

/// Called with the job id and new status on every status change.
pub type JobUpdateCallback = Arc<dyn Fn(&str, JobStatus) + Send + Sync>;

/// Job map plus submission order.
#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, Job>,
    order: Vec<String>,
}

impl JobTable {
    fn occupied(&self, stage: Stage) -> usize {
        self.jobs
            .values()
            .filter(|job| job.active_stage == Some(stage))
            .count()
    }

    fn oldest_eligible(&self, stage: Stage) -> Option<String> {
        self.order
            .iter()
            .find(|id| {
                self.jobs
                    .get(*id)
                    .is_some_and(|job| job.is_eligible_for(stage))
            })
            .cloned()
    }

    fn ordered(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|id| self.jobs.get(id))
    }
}

/// Work handed to a stage when its lane claims a job.
#[derive(Debug, Clone)]
enum StageInput {
    Download { url: String },
    Compress { input: PathBuf },
    Upload { artifact: PathBuf },
}

impl StageInput {
    fn stage(&self) -> Stage {
        match self {
            Self::Download { .. } => Stage::Download,
            Self::Compress { .. } => Stage::Compress,
            Self::Upload { .. } => Stage::Upload,
        }
    }
}

#[derive(Debug)]
struct Claim {
    job_id: String,
    source_url: String,
    input: StageInput,
}

/// What a stage produced.
enum StageOutput {
    Downloaded(PathBuf),
    Compressed(TranscodeOutcome),
    Published(String),
}

/// Writes stage progress into one job's record.
struct JobProgressSink {
    table: Arc<Mutex<JobTable>>,
    job_id: String,
}

impl ProgressSink for JobProgressSink {
    fn report(&self, progress: StageProgress) {
        let mut table = lock_table(&self.table);
        if let Some(job) = table.jobs.get_mut(&self.job_id) {
            if !job.status.is_terminal() {
                job.progress = JobProgress {
                    current: progress,
                    updated_at: Utc::now(),
                };
            }
        }
    }
}

fn lock_table(table: &Mutex<JobTable>) -> MutexGuard<'_, JobTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Moves a job forward, refusing regressions.
fn transition(job: &mut Job, next: JobStatus) -> bool {
    if !job.status.can_transition_to(next) {
        warn!(
            "Refusing transition of job {} from {} to {}",
            job.id, job.status, next
        );
        return false;
    }
    debug!("Job {}: {} -> {}", job.id, job.status, next);
    job.status = next;
    if next.is_terminal() {
        job.completed_at = Some(Utc::now());
        job.active_stage = None;
    }
    true
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage panicked".to_string()
    }
}

fn new_job_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Drives jobs through download, compress and upload.
pub struct PipelineCoordinator {
    config: CoordinatorConfig,
    fetcher: Arc<dyn Fetcher>,
    transcoder: Arc<dyn Transcoder>,
    publisher: Arc<dyn Publisher>,
    catalog: Option<Arc<dyn ContentCatalog>>,
    on_update: Option<JobUpdateCallback>,
    table: Arc<Mutex<JobTable>>,
}

impl PipelineCoordinator {
    /// Create a new coordinator.
    pub fn new(
        config: CoordinatorConfig,
        fetcher: Arc<dyn Fetcher>,
        transcoder: Arc<dyn Transcoder>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            fetcher,
            transcoder,
            publisher,
            catalog: None,
            on_update: None,
            table: Arc::new(Mutex::new(JobTable::default())),
        }
    }

    /// Write published references back to a content catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn ContentCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set the callback for status changes.
    pub fn with_update_callback(mut self, callback: JobUpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// The coordinator's configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, JobTable> {
        lock_table(&self.table)
    }

    fn notify(&self, job_id: &str, status: JobStatus) {
        if let Some(callback) = &self.on_update {
            callback(job_id, status);
        }
    }

    /// Submit a job and return its id.
    ///
    /// With `local_file` the download stage is skipped and the file becomes
    /// the compress stage's input. The file is deleted once consumed. Never
    /// waits for any stage; must be called from within a Tokio runtime.
    pub fn submit(
        self: &Arc<Self>,
        source_url: &str,
        local_file: Option<PathBuf>,
    ) -> Result<String, CoordinatorError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(CoordinatorError::InvalidSubmission(
                "source_url must not be empty".to_string(),
            ));
        }

        let job = Job::new(new_job_id(), source_url.to_string(), local_file);
        let job_id = job.id.clone();
        let status = job.status;
        {
            let mut table = self.lock();
            table.order.push(job_id.clone());
            table.jobs.insert(job_id.clone(), job);
        }
        metrics::JOBS_SUBMITTED.inc();
        info!("Submitted job {} for {} ({})", job_id, source_url, status);

        if let Some(catalog) = &self.catalog {
            if let Err(e) = catalog.mark_in_progress(source_url) {
                warn!("Could not mark {} as in progress: {}", source_url, e);
            }
        }

        self.notify(&job_id, status);
        self.sweep();
        Ok(job_id)
    }

    /// Point-in-time snapshot of all lanes and counts.
    pub fn get_status(&self) -> CoordinatorStatus {
        let table = self.lock();
        let mut status = CoordinatorStatus {
            total: table.jobs.len(),
            ..Default::default()
        };
        let mut per_stage = StageActivity::default();

        for job in table.ordered() {
            match job.status {
                JobStatus::Queued => status.queued_count += 1,
                JobStatus::Done => status.done_count += 1,
                JobStatus::Error => status.error_count += 1,
                _ => {}
            }
            match job.active_stage {
                Some(Stage::Download) => per_stage.download.push(ActiveJob::from(job)),
                Some(Stage::Compress) => per_stage.compress.push(ActiveJob::from(job)),
                Some(Stage::Upload) => per_stage.upload.push(ActiveJob::from(job)),
                None => {}
            }
        }

        status.per_stage = per_stage;
        status
    }

    /// Get a job by id.
    pub fn get_job(&self, job_id: &str) -> Option<Job> {
        self.lock().jobs.get(job_id).cloned()
    }

    /// All retained jobs in submission order.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.lock().ordered().cloned().collect()
    }

    /// Fill every free lane with the oldest eligible job.
    fn sweep(self: &Arc<Self>) {
        let mut claims = Vec::new();
        let mut started = Vec::new();
        {
            let mut table = self.lock();
            self.prune_expired(&mut table);

            for stage in Stage::ALL {
                let limit = self.config.lanes(stage);
                while table.occupied(stage) < limit {
                    let Some(job_id) = table.oldest_eligible(stage) else {
                        break;
                    };
                    let Some(job) = table.jobs.get_mut(&job_id) else {
                        break;
                    };

                    let input = match stage {
                        Stage::Download => StageInput::Download {
                            url: job.source_url.clone(),
                        },
                        Stage::Compress => match &job.download_path {
                            Some(path) => StageInput::Compress { input: path.clone() },
                            None => break,
                        },
                        Stage::Upload => match &job.compressed_path {
                            Some(path) => StageInput::Upload {
                                artifact: path.clone(),
                            },
                            None => break,
                        },
                    };

                    job.active_stage = Some(stage);
                    job.progress = JobProgress::reset();
                    job.started_at.get_or_insert_with(Utc::now);
                    if job.status != stage.running_status()
                        && transition(job, stage.running_status())
                    {
                        started.push((job_id.clone(), job.status));
                    }

                    debug!("Lane {} claimed job {}", stage, job_id);
                    claims.push(Claim {
                        job_id,
                        source_url: job.source_url.clone(),
                        input,
                    });
                }
            }
        }

        for (job_id, status) in started {
            self.notify(&job_id, status);
        }

        for claim in claims {
            let coordinator = Arc::clone(self);
            tokio::spawn(async move {
                coordinator.drive(claim).await;
            });
        }
    }

    /// Drop terminal jobs older than the retention window.
    fn prune_expired(&self, table: &mut JobTable) {
        let Some(secs) = self.config.retention_secs else {
            return;
        };
        let cutoff = Utc::now() - ChronoDuration::seconds(secs as i64);

        let expired: Vec<String> = table
            .jobs
            .values()
            .filter(|job| job.status.is_terminal() && job.completed_at.is_some_and(|t| t < cutoff))
            .map(|job| job.id.clone())
            .collect();

        if expired.is_empty() {
            return;
        }
        for id in &expired {
            table.jobs.remove(id);
        }
        table.order.retain(|id| table.jobs.contains_key(id));
        debug!("Pruned {} finished jobs", expired.len());
    }

    /// Run one claimed stage to completion, then sweep again.
    async fn drive(self: Arc<Self>, claim: Claim) {
        let stage = claim.input.stage();
        let lane_gauge = metrics::LANE_ACTIVE.with_label_values(&[stage.as_str()]);
        lane_gauge.inc();
        let timer = metrics::STAGE_DURATION
            .with_label_values(&[stage.as_str()])
            .start_timer();

        info!("Job {} entering {} stage", claim.job_id, stage);
        let sink = JobProgressSink {
            table: Arc::clone(&self.table),
            job_id: claim.job_id.clone(),
        };

        let result = AssertUnwindSafe(self.execute(&claim, &sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                error!("Stage {} panicked for job {}", stage, claim.job_id);
                Err(StageError::Internal(panic_message(panic)))
            });

        timer.observe_duration();
        lane_gauge.dec();

        self.complete(claim, result).await;
        self.sweep();
    }

    /// Stage handler table.
    async fn execute(
        &self,
        claim: &Claim,
        sink: &JobProgressSink,
    ) -> Result<StageOutput, StageError> {
        match &claim.input {
            StageInput::Download { url } => {
                let path = self.fetcher.download(url, &claim.job_id, sink).await?;
                Ok(StageOutput::Downloaded(path))
            }
            StageInput::Compress { input } => {
                let outcome = self.transcoder.compress(input, &claim.job_id, sink).await?;
                Ok(StageOutput::Compressed(outcome))
            }
            StageInput::Upload { artifact } => {
                let reference = self.publisher.publish(artifact, &claim.job_id).await?;
                Ok(StageOutput::Published(reference))
            }
        }
    }

    /// Write the published reference back to the catalog, if one is set.
    /// Catalog calls block, so they run on the blocking pool.
    async fn persist(&self, source_url: &str, reference: &str) -> Result<(), StageError> {
        let Some(catalog) = self.catalog.clone() else {
            return Ok(());
        };
        let source_url = source_url.to_string();
        let reference = reference.to_string();

        tokio::task::spawn_blocking(move || catalog.record_published(&source_url, &reference))
            .await
            .map_err(|e| StageError::Internal(format!("catalog write aborted: {}", e)))?
            .map_err(StageError::from)
    }

    /// Record a stage's result on the job and release its lane.
    async fn complete(&self, claim: Claim, result: Result<StageOutput, StageError>) {
        let stage = claim.input.stage();

        let persist_error = match &result {
            Ok(StageOutput::Published(reference)) => {
                self.persist(&claim.source_url, reference).await.err()
            }
            _ => None,
        };

        let (status, run_result, to_delete) = {
            let mut table = self.lock();
            let Some(job) = table.jobs.get_mut(&claim.job_id) else {
                warn!("Job {} vanished while in {} stage", claim.job_id, stage);
                return;
            };
            job.active_stage = None;
            let mut to_delete = Vec::new();

            let run_result = match result {
                Ok(StageOutput::Downloaded(path)) => {
                    job.download_path = Some(path);
                    job.progress = JobProgress::reset();
                    transition(job, JobStatus::Compressing);
                    "success"
                }
                Ok(StageOutput::Compressed(TranscodeOutcome::Compressed {
                    path,
                    size_bytes,
                    tier,
                })) => {
                    info!(
                        "Job {} compressed to {} bytes at tier {}",
                        job.id, size_bytes, tier
                    );
                    to_delete.extend(job.download_path.take());
                    job.compressed_path = Some(path);
                    job.progress = JobProgress::reset();
                    transition(job, JobStatus::Uploading);
                    "success"
                }
                Ok(StageOutput::Compressed(TranscodeOutcome::SkippedTooLarge {
                    smallest_bytes,
                    limit_bytes,
                })) => {
                    warn!(
                        "Job {} skipped: smallest output {} bytes exceeds {} byte cap",
                        job.id, smallest_bytes, limit_bytes
                    );
                    to_delete.extend(job.download_path.take());
                    job.outcome = Some(JobOutcome::SkippedTooLarge);
                    transition(job, JobStatus::Done);
                    "skipped"
                }
                Ok(StageOutput::Published(reference)) => {
                    to_delete.extend(job.compressed_path.take());
                    job.result = Some(reference);
                    match &persist_error {
                        None => {
                            job.outcome = Some(JobOutcome::Published);
                            transition(job, JobStatus::Done);
                            "success"
                        }
                        Some(e) => {
                            error!(
                                "Job {} published as {:?} but not recorded: {}",
                                job.id, job.result, e
                            );
                            fail(job, e);
                            "failed"
                        }
                    }
                }
                Err(e) => {
                    error!("Job {} failed in {} stage: {}", job.id, stage, e);
                    fail(job, &e);
                    if self.config.cleanup_artifacts {
                        to_delete.extend(job.download_path.take());
                        to_delete.extend(job.compressed_path.take());
                    }
                    "failed"
                }
            };

            (job.status, run_result, to_delete)
        };

        metrics::STAGE_RUNS
            .with_label_values(&[stage.as_str(), run_result])
            .inc();

        for path in &to_delete {
            remove_artifact(path).await;
        }

        if status.is_terminal() {
            info!("Job {} finished: {}", claim.job_id, status);
        }
        self.notify(&claim.job_id, status);
    }
}

fn fail(job: &mut Job, err: &StageError) {
    job.error = Some(err.to_string());
    job.error_kind = Some(err.kind());
    transition(job, JobStatus::Error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ErrorKind;
    use crate::testing::{MockFetcher, MockPublisher, MockTranscoder};
    use std::time::Duration;

    async fn wait_terminal(coordinator: &PipelineCoordinator, job_id: &str) -> Job {
        for _ in 0..200 {
            if let Some(job) = coordinator.get_job(job_id) {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    #[test]
    fn test_job_id_format() {
        let id = new_job_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
        assert_ne!(new_job_id(), id);
    }

    #[test]
    fn test_transition_refuses_regression() {
        let mut job = Job::new("1-a".to_string(), "https://x/v.mp4".to_string(), None);
        assert!(transition(&mut job, JobStatus::Downloading));
        assert!(!transition(&mut job, JobStatus::Queued));
        assert!(transition(&mut job, JobStatus::Error));
        assert!(job.completed_at.is_some());
        assert!(!transition(&mut job, JobStatus::Done));
        assert_eq!(job.status, JobStatus::Error);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42)), "stage panicked");
    }

    #[tokio::test]
    async fn test_empty_source_rejected() {
        let coordinator = Arc::new(PipelineCoordinator::new(
            CoordinatorConfig::default(),
            Arc::new(MockFetcher::new()),
            Arc::new(MockTranscoder::new()),
            Arc::new(MockPublisher::new()),
        ));
        assert!(matches!(
            coordinator.submit("  ", None),
            Err(CoordinatorError::InvalidSubmission(_))
        ));
        assert_eq!(coordinator.get_status().total, 0);
    }

    #[tokio::test]
    async fn test_stage_panic_fails_only_that_job() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.panic_on("https://example.com/bad.mp4").await;

        let coordinator = Arc::new(PipelineCoordinator::new(
            CoordinatorConfig::default(),
            fetcher,
            Arc::new(MockTranscoder::new()),
            Arc::new(MockPublisher::new()),
        ));

        let bad = coordinator.submit("https://example.com/bad.mp4", None).unwrap();
        let good = coordinator.submit("https://example.com/good.mp4", None).unwrap();

        let bad = wait_terminal(&coordinator, &bad).await;
        assert_eq!(bad.status, JobStatus::Error);
        assert_eq!(bad.error_kind, Some(ErrorKind::Internal));

        let good = wait_terminal(&coordinator, &good).await;
        assert_eq!(good.status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_retention_prunes_finished_jobs() {
        let coordinator = Arc::new(PipelineCoordinator::new(
            CoordinatorConfig::default().with_retention(0),
            Arc::new(MockFetcher::new()),
            Arc::new(MockTranscoder::new()),
            Arc::new(MockPublisher::new()),
        ));

        let first = coordinator.submit("https://example.com/a.mp4", None).unwrap();
        // The sweep after completion may already have pruned it
        for _ in 0..200 {
            match coordinator.get_job(&first) {
                Some(job) if !job.status.is_terminal() => {
                    tokio::time::sleep(Duration::from_millis(10)).await
                }
                _ => break,
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The next sweep drops the expired job
        let second = coordinator.submit("https://example.com/b.mp4", None).unwrap();
        assert!(coordinator.get_job(&first).is_none());
        assert!(coordinator.get_job(&second).is_some());
    }
}
