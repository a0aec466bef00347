use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use listing_cleaner::app::clean_use_case::CleanUseCase;
use listing_cleaner::app::ports::ArtifactStorePort;
use listing_cleaner::config::{RunConfig, StoreSettings};
use listing_cleaner::infra::{FsArtifactStore, HttpArtifactStore};
use listing_cleaner::observability::init_logging;

#[derive(Parser)]
#[command(name = "listing_cleaner")]
#[command(about = "Basic cleaning step for the short-term rental listings pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Reference of the raw input artifact, e.g. sample.csv:latest
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Name for the cleaned output artifact
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type tag recorded on the output artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description recorded on the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum price to keep, inclusive
    #[arg(long = "min_price")]
    min_price: i64,

    /// Maximum price to keep, inclusive
    #[arg(long = "max_price")]
    max_price: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    init_logging();

    let settings = StoreSettings::from_env();
    let store: Arc<dyn ArtifactStorePort> = match &settings.store_url {
        Some(url) => {
            info!("Using HTTP artifact store at {}", url);
            Arc::new(HttpArtifactStore::new(
                url,
                settings.api_key.clone(),
                settings.data_root.join("cache"),
            ))
        }
        None => {
            info!("Using filesystem artifact store at {}", settings.data_root.display());
            Arc::new(FsArtifactStore::new(settings.data_root.clone()))
        }
    };

    let config = RunConfig {
        input_artifact: cli.input_artifact,
        output_artifact: cli.output_artifact,
        output_type: cli.output_type,
        output_description: cli.output_description,
        min_price: cli.min_price,
        max_price: cli.max_price,
    };

    println!("🧹 Running basic cleaning for {}", config.input_artifact);
    let use_case = CleanUseCase::new(store, ".", &settings.project);

    match use_case.run(&config).await {
        Ok(summary) => {
            println!("\n📊 Cleaning results:");
            println!("   Input rows: {}", summary.input_rows);
            println!("   Kept rows: {}", summary.kept_rows);
            println!("   Output file: {}", summary.output_file.display());
            println!("   Published: {}", summary.artifact);
            println!("✅ Cleaning run completed successfully");
        }
        Err(e) => {
            error!("Cleaning run failed: {}", e);
            eprintln!("❌ Cleaning run failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
