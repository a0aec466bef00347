use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::app::ports::ArtifactStorePort;
use crate::artifact::{
    validate_artifact_name, ArtifactHandle, ArtifactManifest, ArtifactRef, ArtifactSpec,
    RunRecord, VersionEntry,
};
use crate::common::error::{CleaningError, Result};

/// In-memory artifact store for tests and offline development. Resolved
/// files are materialized into a scratch directory so callers still get
/// real paths back.
pub struct InMemoryArtifactStore {
    manifests: Arc<Mutex<HashMap<String, ArtifactManifest>>>,
    contents: Arc<Mutex<HashMap<(String, u32), Vec<u8>>>>,
    runs: Arc<Mutex<Vec<RunRecord>>>,
    scratch: PathBuf,
}

impl InMemoryArtifactStore {
    pub fn new(scratch: impl Into<PathBuf>) -> Self {
        Self {
            manifests: Arc::new(Mutex::new(HashMap::new())),
            contents: Arc::new(Mutex::new(HashMap::new())),
            runs: Arc::new(Mutex::new(Vec::new())),
            scratch: scratch.into(),
        }
    }

    /// Bytes stored for a published version.
    pub fn stored_bytes(&self, name: &str, version: u32) -> Option<Vec<u8>> {
        let contents = self.contents.lock().unwrap();
        contents.get(&(name.to_string(), version)).cloned()
    }

    pub fn recorded_runs(&self) -> Vec<RunRecord> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStorePort for InMemoryArtifactStore {
    async fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let parsed = ArtifactRef::parse(reference)?;
        validate_artifact_name(&parsed.name)?;

        let entry = {
            let manifests = self.manifests.lock().unwrap();
            let manifest = manifests
                .get(&parsed.name)
                .ok_or_else(|| CleaningError::ArtifactNotFound(reference.to_string()))?;
            manifest
                .find(&parsed.selector)
                .cloned()
                .ok_or_else(|| CleaningError::ArtifactNotFound(reference.to_string()))?
        };
        let bytes = self
            .stored_bytes(&parsed.name, entry.version)
            .ok_or_else(|| CleaningError::ArtifactNotFound(reference.to_string()))?;

        let dir = self
            .scratch
            .join(&parsed.name)
            .join(format!("v{}", entry.version));
        fs::create_dir_all(&dir)?;
        let path = dir.join(&entry.file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    async fn create(&self, spec: ArtifactSpec, file: &Path) -> Result<ArtifactHandle> {
        validate_artifact_name(&spec.name)?;
        ArtifactHandle::stage(spec, file)
    }

    async fn publish(&self, handle: &mut ArtifactHandle) -> Result<()> {
        let bytes = fs::read(&handle.file)?;
        let file_name = handle.file_name()?;

        let version = {
            let mut manifests = self.manifests.lock().unwrap();
            let manifest = manifests
                .entry(handle.spec.name.clone())
                .or_insert_with(|| ArtifactManifest::new(&handle.spec.name));
            let version = manifest.next_version();
            manifest.push_version(VersionEntry {
                version,
                file_name,
                artifact_type: handle.spec.artifact_type.clone(),
                description: handle.spec.description.clone(),
                sha256: handle.sha256.clone(),
                size_bytes: handle.size_bytes,
                created_at: Utc::now(),
            });
            version
        };
        let mut contents = self.contents.lock().unwrap();
        contents.insert((handle.spec.name.clone(), version), bytes);
        handle.version = Some(version);

        debug!("Stored artifact {} as v{} in memory", handle.spec.name, version);
        Ok(())
    }

    async fn wait_until_durable(&self, handle: &ArtifactHandle) -> Result<()> {
        // Memory is durable the moment publish returns; only the contract
        // violation is left to catch.
        handle.version.ok_or_else(|| CleaningError::Store {
            message: format!(
                "artifact '{}' was not published; no version to wait for",
                handle.spec.name
            ),
        })?;
        Ok(())
    }

    async fn log_run_metadata(&self, run: &RunRecord) -> Result<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn publish_and_resolve_through_the_port() {
        let dir = tempdir().unwrap();
        let store = InMemoryArtifactStore::new(dir.path().join("scratch"));

        let file = dir.path().join("sample.csv");
        fs::write(&file, "id,price\n1,50\n").unwrap();
        let spec = ArtifactSpec {
            name: "sample.csv".to_string(),
            artifact_type: "raw_data".to_string(),
            description: "seed".to_string(),
        };
        let mut handle = store.create(spec, &file).await.unwrap();
        store.publish(&mut handle).await.unwrap();
        store.wait_until_durable(&handle).await.unwrap();

        assert_eq!(handle.version, Some(0));
        assert_eq!(
            store.stored_bytes("sample.csv", 0),
            Some(b"id,price\n1,50\n".to_vec())
        );

        let resolved = store.resolve("sample.csv:v0").await.unwrap();
        assert_eq!(fs::read_to_string(resolved).unwrap(), "id,price\n1,50\n");
    }

    #[tokio::test]
    async fn unknown_artifacts_are_not_found() {
        let dir = tempdir().unwrap();
        let store = InMemoryArtifactStore::new(dir.path().join("scratch"));

        let err = store.resolve("missing.csv").await.unwrap_err();
        assert!(matches!(err, CleaningError::ArtifactNotFound(_)));
    }
}
