//! moviesync - catalog to search index synchronizer

use anyhow::Result;
use clap::Parser;
use moviesync_common::logging::{init_logging, LogConfig, LogLevel};
use moviesync_etl::config::Config;
use moviesync_etl::elastic::ElasticClient;
use moviesync_etl::entities;
use moviesync_etl::orchestrator::SyncOrchestrator;
use moviesync_etl::source::PostgresReader;
use moviesync_etl::state::{JsonFileStorage, State};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "moviesync")]
#[command(author, version, about = "One-way batch sync from the movie catalog to the search index")]
struct Cli {
    /// Path of the watermark state file (overrides SYNC_STATE_PATH)
    #[arg(long)]
    state_path: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("moviesync".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let mut config = Config::load()?;
    if let Some(path) = cli.state_path {
        config.sync.state_path = path;
    }

    info!(
        elastic = %config.elastic.url,
        batch_size = config.sync.batch_size,
        state_path = %config.sync.state_path,
        "starting synchronization"
    );

    let reader = PostgresReader::connect(&config.database)?;
    let writer = ElasticClient::new(&config.elastic)?;
    let state = State::new(Box::new(JsonFileStorage::new(&config.sync.state_path)));

    let mut orchestrator = SyncOrchestrator::new(
        Arc::new(reader),
        Arc::new(writer),
        state,
        config.retry_policy(),
        config.sync.batch_size,
    );
    orchestrator.register(Box::new(entities::film::task()));
    orchestrator.register(Box::new(entities::genre::task()));
    orchestrator.register(Box::new(entities::person::task()));

    orchestrator.bootstrap().await?;
    let stats = orchestrator.run().await?;

    info!(
        documents = stats.total_documents(),
        rejected = stats.total_rejected(),
        "synchronization finished"
    );

    Ok(())
}
