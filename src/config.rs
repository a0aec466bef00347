use serde::Serialize;
use std::path::PathBuf;

// Environment variables read at startup (a .env file is honored via dotenv)
pub const DATA_ROOT_ENV: &str = "CLEANER_DATA_ROOT";
pub const STORE_URL_ENV: &str = "CLEANER_STORE_URL";
pub const API_KEY_ENV: &str = "CLEANER_API_KEY";
pub const PROJECT_ENV: &str = "CLEANER_PROJECT";

const DEFAULT_DATA_ROOT: &str = "data";
const DEFAULT_PROJECT: &str = "nyc_airbnb";

/// The six invocation parameters of one cleaning run. Immutable for the
/// duration of the run and recorded against the store for provenance.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: i64,
    pub max_price: i64,
}

/// Where the artifact store lives. When `store_url` is set the step talks to
/// a remote store over HTTP; otherwise it uses the local filesystem store
/// rooted at `data_root`.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub data_root: PathBuf,
    pub store_url: Option<String>,
    pub api_key: Option<String>,
    pub project: String,
}

impl StoreSettings {
    pub fn from_env() -> Self {
        let data_root = std::env::var(DATA_ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_ROOT));
        let store_url = std::env::var(STORE_URL_ENV).ok().filter(|s| !s.is_empty());
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|s| !s.is_empty());
        let project =
            std::env::var(PROJECT_ENV).unwrap_or_else(|_| DEFAULT_PROJECT.to_string());

        Self {
            data_root,
            store_url,
            api_key,
            project,
        }
    }
}
