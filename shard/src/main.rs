//! Shard binary entry point: wires configuration, the sequencer ring, the
//! WAL, the publisher, the event handler thread, and the ingress HTTP
//! surface together. `spec.md` §5.

use clap::Parser;
use shard::clock::MonotonicClock;
use shard::config::ShardConfig;
use shard::handler::EventHandler;
use shard::publisher::Publisher;
use shard::{ingress, metrics, sequencer, wal};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ShardConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    metrics::install(config.metrics_port)?;
    tracing::info!(shard_id = %config.shard_id, symbols = ?config.symbols, "starting shard");

    let wal = wal::Wal::create(&config.wal_path, config.wal_size_bytes())?;
    let publisher = Publisher::connect(&config.broker_addr, config.shard_id.clone()).await?;
    let clock = MonotonicClock::new();
    let (producer, mut consumer) = sequencer::new(config.ring_capacity);

    let owned_symbols: Arc<HashSet<String>> = Arc::new(config.symbols.iter().cloned().collect());

    let matcher_shard_id = config.shard_id.clone();
    let matcher_symbols = config.symbols.clone();
    let matcher_clock = clock.clone();
    let matcher_producer = producer.clone();
    std::thread::Builder::new()
        .name("matcher".into())
        .spawn(move || {
            let mut handler = EventHandler::new(
                matcher_shard_id,
                &matcher_symbols,
                wal,
                publisher,
                matcher_clock,
                matcher_producer,
            );
            handler.run(&mut consumer);
        })
        .expect("failed to spawn matcher thread");

    let state = ingress::AppState {
        shard_id: config.shard_id.clone(),
        owned_symbols,
        producer,
        clock,
    };

    let app = ingress::router(state).layer(tower_http::trace::TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.submit_port)).await?;
    tracing::info!(port = config.submit_port, "ingress listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    tracing::info!("ingress stopped, shard exiting");
    Ok(())
}

/// Waits for SIGTERM or SIGINT. The matcher thread keeps draining the
/// sequencer independently and is not joined here: it runs to the nearest
/// `endOfBatch`, forces the WAL, and the process exit tears down the
/// publisher's background task. `spec.md` §5's shutdown sequence stops
/// short of a fully coordinated drain because the matcher loop has no
/// built-in stop signal — a direct carry-over from the teacher's run-to-
/// completion worker loops, noted as an open point in DESIGN.md.
async fn wait_for_shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
