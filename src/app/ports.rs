use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactHandle, ArtifactSpec, RunRecord};
use crate::common::error::Result;

/// Store trait for resolving input artifacts and publishing outputs.
/// Every backend (filesystem, HTTP, in-memory fake) implements this, so the
/// cleaning step never talks to a concrete store.
#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    /// Resolve `name[:selector]` to a local file path, downloading if the
    /// backend is remote.
    async fn resolve(&self, reference: &str) -> Result<PathBuf>;

    /// Stage a local file under a spec. Digest and size are computed here;
    /// no version is assigned until `publish`.
    async fn create(&self, spec: ArtifactSpec, file: &Path) -> Result<ArtifactHandle>;

    /// Register the staged content as the next version of the artifact and
    /// set `handle.version`. Each publish appends a new version, even when
    /// the content matches an existing one.
    async fn publish(&self, handle: &mut ArtifactHandle) -> Result<()>;

    /// Block until the store confirms the published version is durable.
    /// Calling this before `publish` is a contract violation.
    async fn wait_until_durable(&self, handle: &ArtifactHandle) -> Result<()>;

    /// Record run provenance. Callers treat failures here as non-fatal.
    async fn log_run_metadata(&self, run: &RunRecord) -> Result<()>;
}
