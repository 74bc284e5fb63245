//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with mock stages injected, so job and stream endpoints can be exercised
//! without network access or an ffmpeg binary.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use stagehand_core::{
    testing::{MockFetcher, MockPublisher, MockTranscoder},
    ActiveSet, Config, PipelineCoordinator, StreamGate, StreamGateConfig,
};
use stagehand_server::{api::create_router, state::AppState};

/// Test fixture for API testing with mock stages.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/jobs", json!({
///         "source_url": "https://example.com/a.mp4"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - control download delays and failures
    pub fetcher: Arc<MockFetcher>,
    /// Mock transcoder - control skip and failure outcomes
    pub transcoder: Arc<MockTranscoder>,
    /// Mock publisher - inspect publish calls
    pub publisher: Arc<MockPublisher>,
    /// Active set shared with the stream gate
    pub active: Arc<ActiveSet>,
    /// Scratch directory for stage artifacts
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub fn new() -> Self {
        Self::with_max_streams(StreamGateConfig::default().max_concurrent)
    }

    /// Create a fixture whose stream gate admits `max_streams` at once.
    pub fn with_max_streams(max_streams: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let fetcher = Arc::new(MockFetcher::new().with_work_dir(temp_dir.path().to_path_buf()));
        let transcoder =
            Arc::new(MockTranscoder::new().with_work_dir(temp_dir.path().to_path_buf()));
        let publisher = Arc::new(MockPublisher::new());

        let mut config = Config::default();
        config.streams = StreamGateConfig::default().with_max_concurrent(max_streams);
        config.fetcher.work_dir = temp_dir.path().to_path_buf();

        let coordinator = Arc::new(PipelineCoordinator::new(
            config.coordinator.clone(),
            fetcher.clone(),
            transcoder.clone(),
            publisher.clone(),
        ));

        let active = Arc::new(ActiveSet::new());
        let active_for_gate = Arc::clone(&active);
        let streams = Arc::new(
            StreamGate::new(config.streams.clone()).with_start_callback(move |id: &str| {
                active_for_gate.request_active(id);
            }),
        );

        let state = Arc::new(AppState::new(
            config,
            coordinator,
            streams,
            Arc::clone(&active),
        ));
        let router = create_router(state);

        Self {
            router,
            fetcher,
            transcoder,
            publisher,
            active,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Fetch the raw text body of a GET request.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Poll a job until it reaches `done` or `error`.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        for _ in 0..300 {
            let response = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            let status = response.body["status"].as_str().unwrap_or_default();
            if status == "done" || status == "error" {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", job_id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
