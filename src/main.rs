use std::sync::Arc;

use anyhow::{Context, Result};
use paradecast::config::ParadecastConfig;
use paradecast::orchestrator::QueryOrchestrator;
use paradecast::provider::OpenMeteoProvider;
use paradecast::web;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ParadecastConfig::load().with_context(|| "Failed to load configuration")?;

    init_tracing(&config);
    info!(version = paradecast::VERSION, "Starting paradecast");

    let provider = OpenMeteoProvider::new(config.provider.clone())
        .with_context(|| "Failed to build weather provider")?;
    let orchestrator = Arc::new(QueryOrchestrator::new(
        Box::new(provider),
        config.derivation.clone(),
    ));

    web::run(&config.server.bind, config.server.port, orchestrator).await
}

fn init_tracing(config: &ParadecastConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
