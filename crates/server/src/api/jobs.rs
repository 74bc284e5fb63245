//! Job submission and status handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use stagehand_core::{CoordinatorError, CoordinatorStatus, Job};
use tracing::{info, warn};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job
#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    /// Remote URL to fetch, or a label when `local_file_path` is given
    pub source_url: String,
    /// Already-downloaded file inside the work directory; skips the
    /// download stage and is deleted once consumed
    pub local_file_path: Option<PathBuf>,
}

/// Response for an accepted job
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
) -> (StatusCode, Json<JobErrorResponse>) {
    (
        status,
        Json(JobErrorResponse {
            error: error.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Resolve a caller-supplied input file. The coordinator deletes its input
/// once consumed, so only files inside the work directory are accepted.
async fn resolve_local_file(work_dir: &FsPath, path: &FsPath) -> Result<PathBuf, String> {
    let resolved = match tokio::fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(_) => return Err(format!("local file not found: {}", path.display())),
    };
    let is_file = tokio::fs::metadata(&resolved)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(format!("local file is not a regular file: {}", path.display()));
    }

    let inside = match tokio::fs::canonicalize(work_dir).await {
        Ok(root) => resolved.starts_with(&root),
        Err(_) => false,
    };
    if !inside {
        warn!("Rejected local file outside the work directory: {:?}", path);
        return Err(format!(
            "local file must be inside the work directory: {}",
            path.display()
        ));
    }
    Ok(resolved)
}

/// Submit a job. Returns as soon as the job is recorded.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobBody>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), impl IntoResponse> {
    let local_file = match &body.local_file_path {
        Some(path) => match resolve_local_file(state.work_dir(), path).await {
            Ok(resolved) => Some(resolved),
            Err(msg) => return Err(error_response(StatusCode::BAD_REQUEST, msg)),
        },
        None => None,
    };

    match state.coordinator().submit(&body.source_url, local_file) {
        Ok(job_id) => {
            info!("Accepted job {} via API", job_id);
            Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })))
        }
        Err(CoordinatorError::InvalidSubmission(msg)) => {
            Err(error_response(StatusCode::BAD_REQUEST, msg))
        }
    }
}

/// Aggregate snapshot of all lanes
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<CoordinatorStatus> {
    Json(state.coordinator().get_status())
}

/// All retained jobs in submission order
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    let jobs = state.coordinator().list_jobs();
    let total = jobs.len();
    Json(ListJobsResponse { jobs, total })
}

/// Get a job by id
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, impl IntoResponse> {
    state
        .coordinator()
        .get_job(&id)
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Job not found: {}", id)))
}
