use async_trait::async_trait;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app::ports::ArtifactStorePort;
use crate::artifact::{
    validate_artifact_name, ArtifactHandle, ArtifactManifest, ArtifactRef, ArtifactSpec,
    RunRecord, VersionEntry,
};
use crate::common::error::{CleaningError, Result};

/// Filesystem-backed artifact store, the default backend.
///
/// Layout under the root:
///   artifacts/<name>/manifest.json   versions and aliases
///   artifacts/<name>/v<N>/<file>     one file per version
///   runs/runs.ndjson                 one JSON line per recorded run
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join("artifacts").join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{}", version))
    }

    fn manifest_path(&self, name: &str) -> PathBuf {
        self.artifact_dir(name).join("manifest.json")
    }

    fn run_log_path(&self) -> PathBuf {
        self.root.join("runs").join("runs.ndjson")
    }

    fn load_manifest(&self, name: &str) -> Result<Option<ArtifactManifest>> {
        let path = self.manifest_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&raw)?;
        Ok(Some(manifest))
    }

    /// Manifest updates go through a temp file and a rename so readers never
    /// observe a half-written index.
    fn store_manifest(&self, manifest: &ArtifactManifest) -> Result<()> {
        let path = self.manifest_path(&manifest.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(manifest)?)?;
        File::open(&tmp)?.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStorePort for FsArtifactStore {
    async fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let parsed = ArtifactRef::parse(reference)?;
        validate_artifact_name(&parsed.name)?;

        let manifest = self
            .load_manifest(&parsed.name)?
            .ok_or_else(|| CleaningError::ArtifactNotFound(reference.to_string()))?;
        let entry = manifest
            .find(&parsed.selector)
            .ok_or_else(|| CleaningError::ArtifactNotFound(reference.to_string()))?;

        let path = self
            .version_dir(&parsed.name, entry.version)
            .join(&entry.file_name);
        if !path.exists() {
            return Err(CleaningError::ArtifactNotFound(reference.to_string()));
        }

        debug!("Resolved {} to {}", reference, path.display());
        Ok(path)
    }

    async fn create(&self, spec: ArtifactSpec, file: &Path) -> Result<ArtifactHandle> {
        validate_artifact_name(&spec.name)?;
        ArtifactHandle::stage(spec, file)
    }

    async fn publish(&self, handle: &mut ArtifactHandle) -> Result<()> {
        let name = handle.spec.name.clone();
        let mut manifest = self
            .load_manifest(&name)?
            .unwrap_or_else(|| ArtifactManifest::new(&name));

        let version = manifest.next_version();
        let file_name = handle.file_name()?;
        let version_dir = self.version_dir(&name, version);
        fs::create_dir_all(&version_dir)?;
        fs::copy(&handle.file, version_dir.join(&file_name))?;

        manifest.push_version(VersionEntry {
            version,
            file_name,
            artifact_type: handle.spec.artifact_type.clone(),
            description: handle.spec.description.clone(),
            sha256: handle.sha256.clone(),
            size_bytes: handle.size_bytes,
            created_at: Utc::now(),
        });
        self.store_manifest(&manifest)?;
        handle.version = Some(version);

        debug!("Published artifact {} as v{}", name, version);
        Ok(())
    }

    async fn wait_until_durable(&self, handle: &ArtifactHandle) -> Result<()> {
        let version = handle.version.ok_or_else(|| CleaningError::Store {
            message: format!(
                "artifact '{}' was not published; no version to wait for",
                handle.spec.name
            ),
        })?;

        let stored = self
            .version_dir(&handle.spec.name, version)
            .join(handle.file_name()?);
        File::open(&stored)?.sync_all()?;
        File::open(self.manifest_path(&handle.spec.name))?.sync_all()?;

        debug!("Synced artifact {} v{} to disk", handle.spec.name, version);
        Ok(())
    }

    async fn log_run_metadata(&self, run: &RunRecord) -> Result<()> {
        let path = self.run_log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let line = serde_json::to_string(run)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use tempfile::tempdir;

    fn spec(name: &str) -> ArtifactSpec {
        ArtifactSpec {
            name: name.to_string(),
            artifact_type: "raw_data".to_string(),
            description: "test artifact".to_string(),
        }
    }

    fn run_config() -> RunConfig {
        RunConfig {
            input_artifact: "sample.csv:latest".to_string(),
            output_artifact: "clean_sample.csv".to_string(),
            output_type: "clean_data".to_string(),
            output_description: "cleaned sample".to_string(),
            min_price: 10,
            max_price: 350,
        }
    }

    async fn publish_file(
        store: &FsArtifactStore,
        dir: &Path,
        name: &str,
        contents: &str,
    ) -> ArtifactHandle {
        let file = dir.join(name);
        fs::write(&file, contents).unwrap();
        let mut handle = store.create(spec(name), &file).await.unwrap();
        store.publish(&mut handle).await.unwrap();
        handle
    }

    #[tokio::test]
    async fn publish_then_resolve_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let handle = publish_file(&store, dir.path(), "sample.csv", "id,price\n1,50\n").await;
        assert_eq!(handle.version, Some(0));

        let resolved = store.resolve("sample.csv:latest").await.unwrap();
        let bytes = fs::read_to_string(resolved).unwrap();
        assert_eq!(bytes, "id,price\n1,50\n");

        store.wait_until_durable(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn versions_increment_and_latest_moves() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        publish_file(&store, dir.path(), "sample.csv", "id\n1\n").await;
        let second = publish_file(&store, dir.path(), "sample.csv", "id\n2\n").await;
        assert_eq!(second.version, Some(1));

        let latest = store.resolve("sample.csv").await.unwrap();
        assert_eq!(fs::read_to_string(latest).unwrap(), "id\n2\n");

        let pinned = store.resolve("sample.csv:v0").await.unwrap();
        assert_eq!(fs::read_to_string(pinned).unwrap(), "id\n1\n");
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let err = store.resolve("missing.csv:latest").await.unwrap_err();
        assert!(matches!(err, CleaningError::ArtifactNotFound(_)));

        publish_file(&store, dir.path(), "sample.csv", "id\n1\n").await;
        let err = store.resolve("sample.csv:v7").await.unwrap_err();
        assert!(matches!(err, CleaningError::ArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn waiting_before_publish_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let file = dir.path().join("sample.csv");
        fs::write(&file, "id\n1\n").unwrap();
        let handle = store.create(spec("sample.csv"), &file).await.unwrap();

        let err = store.wait_until_durable(&handle).await.unwrap_err();
        assert!(matches!(err, CleaningError::Store { .. }));
    }

    #[tokio::test]
    async fn run_records_append_as_json_lines() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let config = run_config();
        store
            .log_run_metadata(&RunRecord::for_run("nyc_airbnb", &config))
            .await
            .unwrap();
        store
            .log_run_metadata(&RunRecord::for_run("nyc_airbnb", &config))
            .await
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("store/runs/runs.ndjson")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["job_type"], "basic_cleaning");
        assert_eq!(record["config"]["min_price"], 10);
    }

    #[tokio::test]
    async fn names_with_separators_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));

        let file = dir.path().join("sample.csv");
        fs::write(&file, "id\n1\n").unwrap();
        let err = store
            .create(spec("../escape"), &file)
            .await
            .unwrap_err();
        assert!(matches!(err, CleaningError::Argument(_)));
    }
}
