//! Stream admission handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use stagehand_core::{StreamAdmission, StreamGateStatus};

use crate::state::AppState;

/// Response for a finished stream
#[derive(Debug, Serialize)]
pub struct FinishStreamResponse {
    pub id: String,
    /// Stream started in the freed slot, if any
    pub promoted: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct StreamErrorResponse {
    pub error: String,
}

/// Ask to start a stream; it starts now or waits in the queue
pub async fn request_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<StreamAdmission> {
    Json(state.streams().request_stream(&id))
}

/// Release a stream slot, or withdraw a queued request
pub async fn finish_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FinishStreamResponse>, impl IntoResponse> {
    let Some(release) = state.streams().finish(&id) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(StreamErrorResponse {
                error: format!("Stream not found: {}", id),
            }),
        ));
    };

    state.active().clear_active(&id);
    let promoted = release.promoted().map(str::to_string);
    Ok(Json(FinishStreamResponse { id, promoted }))
}

/// Current gate occupancy
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StreamGateStatus> {
    Json(state.streams().status())
}
