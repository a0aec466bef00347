use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::app::ports::ArtifactStorePort;
use crate::artifact::{
    validate_artifact_name, ArtifactHandle, ArtifactRef, ArtifactSpec, RunRecord,
    VersionSelector,
};
use crate::common::error::{CleaningError, Result};

const DURABILITY_POLL_ATTEMPTS: u32 = 30;
const DURABILITY_POLL_DELAY_MS: u64 = 500;

/// Remote artifact store spoken to over HTTP with bearer-token auth.
///
/// Content goes to a content-addressed staging area first, then a version
/// commit registers it under the artifact name. Resolved files land in a
/// cache directory under the local data root.
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct CommitVersionRequest<'a> {
    artifact_type: &'a str,
    description: &'a str,
    file_name: String,
    sha256: &'a str,
    size_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct CommitVersionResponse {
    version: u32,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: u32,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct VersionStatus {
    durable: bool,
}

impl HttpArtifactStore {
    pub fn new(base_url: &str, api_key: Option<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            cache_dir: cache_dir.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("Authorization", format!("Bearer {}", key))
                .header("apikey", key.clone()),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CleaningError::Store {
            message: format!("store returned {}: {}", status, body),
        })
    }

    async fn version_info(
        &self,
        name: &str,
        selector: &str,
        reference: &str,
    ) -> Result<VersionInfo> {
        let url = self.endpoint(&format!("artifacts/{}/versions/{}", name, selector));
        let response = self.with_auth(self.client.get(&url)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CleaningError::ArtifactNotFound(reference.to_string()));
        }
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

fn selector_segment(selector: &VersionSelector) -> String {
    match selector {
        VersionSelector::Latest => "latest".to_string(),
        VersionSelector::Version(n) => format!("v{}", n),
        VersionSelector::Alias(alias) => alias.clone(),
    }
}

#[async_trait]
impl ArtifactStorePort for HttpArtifactStore {
    async fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let parsed = ArtifactRef::parse(reference)?;
        validate_artifact_name(&parsed.name)?;

        let segment = selector_segment(&parsed.selector);
        let info = self.version_info(&parsed.name, &segment, reference).await?;

        let url = self.endpoint(&format!(
            "artifacts/{}/versions/v{}/file",
            parsed.name, info.version
        ));
        let response = self.with_auth(self.client.get(&url)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CleaningError::ArtifactNotFound(reference.to_string()));
        }
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;

        let dir = self
            .cache_dir
            .join(&parsed.name)
            .join(format!("v{}", info.version));
        fs::create_dir_all(&dir)?;
        let path = dir.join(&info.file_name);
        fs::write(&path, &bytes)?;

        debug!("Downloaded {} ({} bytes) to {}", reference, bytes.len(), path.display());
        Ok(path)
    }

    async fn create(&self, spec: ArtifactSpec, file: &Path) -> Result<ArtifactHandle> {
        validate_artifact_name(&spec.name)?;
        ArtifactHandle::stage(spec, file)
    }

    async fn publish(&self, handle: &mut ArtifactHandle) -> Result<()> {
        let bytes = fs::read(&handle.file)?;

        let upload_url = self.endpoint(&format!("staging/sha256/{}", handle.sha256));
        let response = self
            .with_auth(self.client.put(&upload_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;

        let commit_url = self.endpoint(&format!("artifacts/{}/versions", handle.spec.name));
        let request = CommitVersionRequest {
            artifact_type: &handle.spec.artifact_type,
            description: &handle.spec.description,
            file_name: handle.file_name()?,
            sha256: &handle.sha256,
            size_bytes: handle.size_bytes,
        };
        let response = self
            .with_auth(self.client.post(&commit_url))
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let committed: CommitVersionResponse = response.json().await?;
        handle.version = Some(committed.version);

        debug!("Published artifact {} as v{}", handle.spec.name, committed.version);
        Ok(())
    }

    async fn wait_until_durable(&self, handle: &ArtifactHandle) -> Result<()> {
        let version = handle.version.ok_or_else(|| CleaningError::Store {
            message: format!(
                "artifact '{}' was not published; no version to wait for",
                handle.spec.name
            ),
        })?;

        let url = self.endpoint(&format!(
            "artifacts/{}/versions/v{}/status",
            handle.spec.name, version
        ));
        for _ in 0..DURABILITY_POLL_ATTEMPTS {
            let response = self.with_auth(self.client.get(&url)).send().await?;
            let response = Self::check(response).await?;
            let status: VersionStatus = response.json().await?;
            if status.durable {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(DURABILITY_POLL_DELAY_MS)).await;
        }

        Err(CleaningError::Store {
            message: format!(
                "artifact '{}' v{} still not durable after {} checks",
                handle.spec.name, version, DURABILITY_POLL_ATTEMPTS
            ),
        })
    }

    async fn log_run_metadata(&self, run: &RunRecord) -> Result<()> {
        let url = self.endpoint("runs");
        let response = self.with_auth(self.client.post(&url)).json(run).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
