use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use wordseek::api::{AppState, create_router};
use wordseek::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "wordseek", about = "Find the files in a directory that contain a keyword")]
struct Cli {
    /// Directory holding appsettings.json and appsettings.<Environment>.json
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Environment name, overrides APP_ENVIRONMENT
    #[arg(long)]
    environment: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config_dir, cli.environment.as_deref())?;
    tracing::info!(
        "searching directory: {}",
        config.file_search_options.examples_directory_path.display()
    );

    let state = Arc::new(AppState::from_config(&config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.address))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
