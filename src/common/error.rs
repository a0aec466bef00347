use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] polars::prelude::PolarsError),

    #[error("Missing required column: {0}")]
    Schema(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Artifact store error: {message}")]
    Store { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CleaningError>;
