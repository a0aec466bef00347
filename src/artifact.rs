use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::common::constants::{JOB_TYPE, LATEST_ALIAS};
use crate::common::error::{CleaningError, Result};
use crate::config::RunConfig;

/// How a reference picks a version: `name` → latest, `name:v3` → that
/// version, anything else after the colon is treated as an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Version(u32),
    Alias(String),
}

/// A parsed `name[:selector]` artifact reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub selector: VersionSelector,
}

impl ArtifactRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let (name, selector) = match reference.split_once(':') {
            Some((name, selector)) => (name, Some(selector)),
            None => (reference, None),
        };
        if name.is_empty() {
            return Err(CleaningError::Argument(format!(
                "empty artifact name in reference '{}'",
                reference
            )));
        }
        let selector = match selector {
            None => VersionSelector::Latest,
            Some("") => {
                return Err(CleaningError::Argument(format!(
                    "empty version selector in reference '{}'",
                    reference
                )))
            }
            Some(s) if s == LATEST_ALIAS => VersionSelector::Latest,
            Some(s) => match s.strip_prefix('v').and_then(|n| n.parse::<u32>().ok()) {
                Some(n) => VersionSelector::Version(n),
                None => VersionSelector::Alias(s.to_string()),
            },
        };
        Ok(Self {
            name: name.to_string(),
            selector,
        })
    }
}

/// Descriptor for a new artifact: what the output will be called and how it
/// is tagged and described in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
}

/// A staged artifact: content digested and measured, version assigned by the
/// store on publish.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    pub spec: ArtifactSpec,
    pub file: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub version: Option<u32>,
}

impl ArtifactHandle {
    /// Digest and measure a local file, producing an unpublished handle.
    pub fn stage(spec: ArtifactSpec, file: &Path) -> Result<Self> {
        let bytes = fs::read(file)?;
        Ok(Self {
            spec,
            file: file.to_path_buf(),
            sha256: sha256_hex(&bytes),
            size_bytes: bytes.len() as u64,
            version: None,
        })
    }

    /// `name:vN` once published, bare name before.
    pub fn reference(&self) -> String {
        match self.version {
            Some(v) => format!("{}:v{}", self.spec.name, v),
            None => self.spec.name.clone(),
        }
    }

    /// Final path component of the staged file, as stored by the backends.
    pub fn file_name(&self) -> Result<String> {
        self.file
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| CleaningError::Store {
                message: format!(
                    "artifact file '{}' has no usable file name",
                    self.file.display()
                ),
            })
    }
}

/// One registered version of an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: u32,
    pub file_name: String,
    pub artifact_type: String,
    pub description: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Per-artifact index: every version ever published plus the alias map.
/// `latest` always points at the newest version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub versions: Vec<VersionEntry>,
    pub aliases: HashMap<String, u32>,
}

impl ArtifactManifest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            versions: Vec::new(),
            aliases: HashMap::new(),
        }
    }

    /// Versions are dense and v0-based, so the next one is simply the count.
    pub fn next_version(&self) -> u32 {
        self.versions.len() as u32
    }

    pub fn find(&self, selector: &VersionSelector) -> Option<&VersionEntry> {
        match selector {
            VersionSelector::Latest => self
                .aliases
                .get(LATEST_ALIAS)
                .and_then(|v| self.entry(*v)),
            VersionSelector::Version(n) => self.entry(*n),
            VersionSelector::Alias(alias) => {
                self.aliases.get(alias).and_then(|v| self.entry(*v))
            }
        }
    }

    /// Append a version and move the `latest` alias onto it.
    pub fn push_version(&mut self, entry: VersionEntry) {
        self.aliases.insert(LATEST_ALIAS.to_string(), entry.version);
        self.versions.push(entry);
    }

    fn entry(&self, version: u32) -> Option<&VersionEntry> {
        self.versions.iter().find(|e| e.version == version)
    }
}

/// Provenance record for one invocation, written to the store best-effort.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub job_type: String,
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub config: RunConfig,
}

impl RunRecord {
    pub fn for_run(project: &str, config: &RunConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_type: JOB_TYPE.to_string(),
            project: project.to_string(),
            started_at: Utc::now(),
            config: config.clone(),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Artifact names double as store path segments and reference prefixes, so
/// they must be non-empty and free of separators.
pub fn validate_artifact_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CleaningError::Argument("artifact name is empty".to_string()));
    }
    if name.contains([':', '/', '\\']) || name == "." || name == ".." {
        return Err(CleaningError::Argument(format!(
            "artifact name '{}' contains reserved characters",
            name
        )));
    }
    Ok(())
}
