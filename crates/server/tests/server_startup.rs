//! Startup tests against the real `stagehand` binary.

use std::io::Write;
use std::net::TcpListener;
use std::process::Output;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};
use tokio::process::{Child, Command};

struct RunningServer {
    port: u16,
    child: Child,
    client: reqwest::Client,
    // Held so the config and work dir outlive the process
    _config: NamedTempFile,
    _work_dir: TempDir,
}

impl RunningServer {
    /// Start the binary with `extra` appended to a minimal config and
    /// wait until health answers.
    async fn start(extra: &str) -> Self {
        let port = free_port();
        let work_dir = TempDir::new().unwrap();
        let config = write_config(&format!(
            r#"
[server]
host = "127.0.0.1"
port = {port}

[fetcher]
work_dir = "{dir}"

[transcoder]
work_dir = "{dir}"
ffmpeg_path = "/nonexistent/ffmpeg"
{extra}"#,
            dir = work_dir.path().display(),
        ));

        let child = Command::new(env!("CARGO_BIN_EXE_stagehand"))
            .env("STAGEHAND_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .kill_on_drop(true)
            .spawn()
            .expect("stagehand binary should spawn");

        let server = Self {
            port,
            child,
            client: reqwest::Client::new(),
            _config: config,
            _work_dir: work_dir,
        };
        server.wait_ready().await;
        server
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    async fn wait_ready(&self) {
        for _ in 0..60 {
            if self.client.get(self.url("/api/v1/health")).send().await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("server on port {} never became ready", self.port);
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("request should reach the server")
    }

    async fn stop(mut self) {
        self.child.kill().await.ok();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap()
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Run the binary to completion; it must exit on its own.
async fn run_until_exit(command: &mut Command) -> Output {
    tokio::time::timeout(
        Duration::from_secs(5),
        command.env("RUST_LOG", "error").output(),
    )
    .await
    .expect("binary should exit within the timeout")
    .expect("binary should run")
}

#[tokio::test]
async fn test_health_without_ffmpeg() {
    // A missing ffmpeg is a startup warning, not a failure
    let server = RunningServer::start("").await;

    let response = server.get("/api/v1/health").await;
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_config_hides_publisher_credentials() {
    let server = RunningServer::start(
        r#"
[publisher.credentials]
session_token = "super-secret-token"
app_id = "app"
session_id = "super-secret-session"
"#,
    )
    .await;

    let response = server.get("/api/v1/config").await;
    assert!(response.status().is_success());

    let text = response.text().await.unwrap();
    assert!(!text.contains("super-secret"));

    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["server"]["port"], server.port);
    assert_eq!(body["publisher"]["credentials_configured"], true);

    server.stop().await;
}

#[tokio::test]
async fn test_missing_config_file_fails_startup() {
    let output = run_until_exit(
        Command::new(env!("CARGO_BIN_EXE_stagehand"))
            .env("STAGEHAND_CONFIG", "/nonexistent/stagehand.toml"),
    )
    .await;

    assert!(!output.status.success());
}

#[tokio::test]
async fn test_zero_lane_config_fails_startup() {
    let config = write_config(
        r#"
[server]
port = 8080

[coordinator]
download_lanes = 0
"#,
    );

    let output = run_until_exit(
        Command::new(env!("CARGO_BIN_EXE_stagehand")).arg(config.path()),
    )
    .await;

    assert!(!output.status.success());
}
