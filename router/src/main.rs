//! Router binary entry point: parses configuration, builds the routing
//! tables, and serves the proxy. `spec.md` §4.8.

use clap::Parser;
use router::app::{build_router, AppState};
use router::config::{RouterConfig, RoutingTables};
use router::metrics;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RouterConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    metrics::install(config.metrics_port)?;
    tracing::info!(shards = config.shard_urls.len(), "starting router");

    let tables = Arc::new(RoutingTables::build(&config));
    let state = AppState::new(tables, Duration::from_millis(config.shard_timeout_ms))?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "router listening");
    axum::serve(listener, app).await?;

    Ok(())
}
