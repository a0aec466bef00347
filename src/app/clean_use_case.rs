use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::ports::ArtifactStorePort;
use crate::artifact::{ArtifactSpec, RunRecord};
use crate::common::constants::{CLEAN_OUTPUT_FILE, LAST_REVIEW_COL, PRICE_COL};
use crate::common::error::Result;
use crate::config::RunConfig;
use crate::pipeline::snapshot;

/// Use case for the basic cleaning step: resolve the raw artifact, filter
/// and normalize the snapshot, write the cleaned file, publish it as a new
/// artifact version.
pub struct CleanUseCase {
    store: Arc<dyn ArtifactStorePort>,
    work_dir: PathBuf,
    project: String,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct CleanRunSummary {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub output_file: PathBuf,
    pub artifact: String,
}

impl CleanUseCase {
    pub fn new(
        store: Arc<dyn ArtifactStorePort>,
        work_dir: impl Into<PathBuf>,
        project: &str,
    ) -> Self {
        Self {
            store,
            work_dir: work_dir.into(),
            project: project.to_string(),
        }
    }

    /// Run the step end to end. Every stage error is fatal except the run
    /// record, which is provenance only.
    pub async fn run(&self, config: &RunConfig) -> Result<CleanRunSummary> {
        let run_record = RunRecord::for_run(&self.project, config);
        if let Err(e) = self.store.log_run_metadata(&run_record).await {
            warn!("Could not record run metadata: {}", e);
        }

        info!("Resolving input artifact {}", config.input_artifact);
        let input_path = self.store.resolve(&config.input_artifact).await?;

        info!("Loading snapshot from {}", input_path.display());
        let df = snapshot::read_snapshot(&input_path)?;
        snapshot::require_columns(&df, &[PRICE_COL, LAST_REVIEW_COL])?;
        let input_rows = df.height();

        info!(
            "Filtering {} to prices in [{}, {}]",
            PRICE_COL, config.min_price, config.max_price
        );
        let df = snapshot::filter_price_range(df, config.min_price, config.max_price)?;
        let kept_rows = df.height();

        info!("Normalizing {} to dates", LAST_REVIEW_COL);
        let mut df = snapshot::normalize_last_review(df)?;

        fs::create_dir_all(&self.work_dir)?;
        let output_file = self.work_dir.join(CLEAN_OUTPUT_FILE);
        info!(
            "Writing {} of {} rows to {}",
            kept_rows,
            input_rows,
            output_file.display()
        );
        snapshot::write_snapshot(&mut df, &output_file)?;

        let spec = ArtifactSpec {
            name: config.output_artifact.clone(),
            artifact_type: config.output_type.clone(),
            description: config.output_description.clone(),
        };
        let mut handle = self.store.create(spec, &output_file).await?;
        self.store.publish(&mut handle).await?;
        self.store.wait_until_durable(&handle).await?;
        info!("Published {}", handle.reference());

        Ok(CleanRunSummary {
            input_rows,
            kept_rows,
            output_file,
            artifact: handle.reference(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::CleaningError;
    use crate::infra::InMemoryArtifactStore;
    use tempfile::tempdir;

    fn config() -> RunConfig {
        RunConfig {
            input_artifact: "sample.csv:latest".to_string(),
            output_artifact: "clean_sample.csv".to_string(),
            output_type: "clean_data".to_string(),
            output_description: "price-filtered listing sample".to_string(),
            min_price: 10,
            max_price: 1000,
        }
    }

    async fn seed(store: &InMemoryArtifactStore, dir: &std::path::Path, contents: &str) {
        let raw = dir.join("sample.csv");
        fs::write(&raw, contents).unwrap();
        let spec = ArtifactSpec {
            name: "sample.csv".to_string(),
            artifact_type: "raw_data".to_string(),
            description: "seed".to_string(),
        };
        let mut handle = store.create(spec, &raw).await.unwrap();
        store.publish(&mut handle).await.unwrap();
    }

    #[tokio::test]
    async fn cleans_and_publishes_the_snapshot() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryArtifactStore::new(dir.path().join("scratch")));
        seed(
            &store,
            dir.path(),
            "id,price,last_review\n1,10,2019-01-01\n2,500,bad-date\n3,999999,2019-06-01\n",
        )
        .await;

        let use_case = CleanUseCase::new(store.clone(), dir.path().join("work"), "nyc_airbnb");
        let summary = use_case.run(&config()).await.unwrap();

        assert_eq!(summary.input_rows, 3);
        assert_eq!(summary.kept_rows, 2);
        assert_eq!(summary.artifact, "clean_sample.csv:v0");

        let stored = store.stored_bytes("clean_sample.csv", 0).unwrap();
        assert_eq!(
            String::from_utf8(stored).unwrap(),
            "id,price,last_review\n1,10,2019-01-01\n2,500,\n"
        );
        assert_eq!(store.recorded_runs().len(), 1);
    }

    #[tokio::test]
    async fn missing_review_column_fails_before_publishing() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryArtifactStore::new(dir.path().join("scratch")));
        seed(&store, dir.path(), "id,price\n1,10\n").await;

        let use_case = CleanUseCase::new(store.clone(), dir.path().join("work"), "nyc_airbnb");
        let err = use_case.run(&config()).await.unwrap_err();

        assert!(matches!(err, CleaningError::Schema(column) if column == LAST_REVIEW_COL));
        assert!(store.stored_bytes("clean_sample.csv", 0).is_none());
    }

    #[tokio::test]
    async fn unknown_input_aborts_the_run() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryArtifactStore::new(dir.path().join("scratch")));

        let use_case = CleanUseCase::new(store.clone(), dir.path().join("work"), "nyc_airbnb");
        let err = use_case.run(&config()).await.unwrap_err();

        assert!(matches!(err, CleaningError::ArtifactNotFound(_)));
    }
}
