//! Publisher backed by a remote object-storage HTTP API.

use async_trait::async_trait;
use reqwest::{multipart, Body, Client, RequestBuilder};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::config::{Credentials, PublisherConfig};
use super::error::PublishError;
use super::traits::Publisher;

/// Response of `POST {endpoint}/upload`.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_id: String,
    #[serde(default)]
    url: Option<String>,
}

/// Response of `GET {endpoint}/files/{file_id}`.
#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    url: Option<String>,
}

/// Uploads artifacts as multipart form data.
///
/// Without credentials no request is made and a placeholder reference of
/// the form `<placeholder_scheme>://<job_ref>/<file_name>` is returned.
pub struct RemotePublisher {
    client: Client,
    config: PublisherConfig,
}

impl RemotePublisher {
    /// Creates a new publisher with the given configuration.
    pub fn new(config: PublisherConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Whether a credential bundle is configured.
    pub fn is_offline(&self) -> bool {
        self.config.credentials.is_none()
    }

    fn placeholder_reference(&self, artifact: &Path, job_ref: &str) -> String {
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact".to_string());
        format!("{}://{}/{}", self.config.placeholder_scheme, job_ref, file_name)
    }

    fn authorized(&self, request: RequestBuilder, creds: &Credentials) -> RequestBuilder {
        request
            .bearer_auth(&creds.session_token)
            .header("X-App-Id", creds.app_id.as_str())
            .header("X-Session-Id", creds.session_id.as_str())
    }

    async fn upload(
        &self,
        artifact: &Path,
        creds: &Credentials,
    ) -> Result<UploadResponse, PublishError> {
        let file = match tokio::fs::File::open(artifact).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PublishError::ArtifactNotFound {
                    path: artifact.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let length = file.metadata().await?.len();
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact".to_string());

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = multipart::Part::stream_with_length(body, length).file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/upload", self.config.base_url());
        debug!("Uploading {:?} ({} bytes) to {}", artifact, length, url);

        let response = self
            .authorized(self.client.post(&url), creds)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<UploadResponse>()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))
    }

    /// One follow-up call for the durable reference. Failures are not fatal.
    async fn lookup(&self, file_id: &str, creds: &Credentials) -> Option<String> {
        let url = format!("{}/files/{}", self.config.base_url(), file_id);
        let response = match self.authorized(self.client.get(&url), creds).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Reference lookup for {} failed: {}", file_id, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Reference lookup for {} returned status {}",
                file_id,
                response.status()
            );
            return None;
        }

        match response.json::<FileInfo>().await {
            Ok(info) => info.url.filter(|u| !u.is_empty()),
            Err(e) => {
                warn!("Reference lookup for {} returned invalid body: {}", file_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl Publisher for RemotePublisher {
    fn name(&self) -> &str {
        "remote"
    }

    async fn publish(&self, artifact: &Path, job_ref: &str) -> Result<String, PublishError> {
        let Some(creds) = &self.config.credentials else {
            let reference = self.placeholder_reference(artifact, job_ref);
            info!(
                "No backend credentials configured, using placeholder {}",
                reference
            );
            return Ok(reference);
        };

        let uploaded = self.upload(artifact, creds).await?;
        info!("Uploaded {:?} as file {}", artifact, uploaded.file_id);

        if let Some(url) = uploaded.url.filter(|u| !u.is_empty()) {
            return Ok(url);
        }

        if let Some(url) = self.lookup(&uploaded.file_id, creds).await {
            return Ok(url);
        }

        let fallback = format!("{}://{}", self.config.reference_scheme, uploaded.file_id);
        warn!(
            "Backend returned no reference for {}, falling back to {}",
            uploaded.file_id, fallback
        );
        Ok(fallback)
    }
}
