use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

use echomaster_app::config::Config;
use echomaster_app::gateway::GeminiGateway;
use echomaster_app::runtime::Runtime;
use echomaster_app::store::{self, ProgressStore};
use echomaster_core::session::Sequencer;

#[derive(Parser)]
#[command(name = "echomaster", about = "Spoken-language drilling at the terminal")]
struct Cli {
    /// Path to the practice catalog (overrides CATALOG_PATH)
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Path to the progress record (overrides PROGRESS_PATH)
    #[arg(long)]
    progress: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // RUST_LOG is parsed and validated by the config layer, so the filter is
    // built from the resulting level rather than reading the variable twice.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::default().add_directive(config.log_level.into()))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting EchoMaster...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let catalog_path = args.catalog.unwrap_or_else(|| config.catalog_path.clone());
    let progress_path = args.progress.unwrap_or_else(|| config.progress_path.clone());

    // --- 4. Load Content and Progress ---
    let catalog = store::load_catalog(&catalog_path)
        .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?;
    tracing::info!(
        "Loaded {} dialogues and {} words from {}",
        catalog.dialogues.len(),
        catalog.words.len(),
        catalog_path.display()
    );

    let progress_store = ProgressStore::new(progress_path);
    let progress = progress_store.load_or_default();

    // --- 5. Initialize the Speech Gateway ---
    let gateway = Arc::new(GeminiGateway::new(
        config.gemini_api_key.clone(),
        config.tts_model.clone(),
        config.analysis_model.clone(),
        config.gateway_timeout,
    ));

    // --- 6. Run the Session ---
    let sequencer = Sequencer::new(catalog, progress);
    Runtime::new(sequencer, gateway, progress_store).run().await
}
