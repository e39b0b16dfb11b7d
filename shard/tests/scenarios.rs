//! End-to-end tests driving the ingress HTTP surface in-process, covering
//! the concrete scenarios in `spec.md` §8. Each test wires a real
//! `EventHandler` on its own matcher thread against a real, temp-file-backed
//! `Wal` and a `Publisher::recording()` stand-in for the broker, then talks
//! to `ingress::router` via `tower::ServiceExt::oneshot` — no TCP socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use engine::prelude::MatchEvent;
use serde_json::{json, Value};
use shard::clock::MonotonicClock;
use shard::handler::EventHandler;
use shard::ingress::{self, AppState};
use shard::publisher::Publisher;
use shard::{sequencer, wal};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

struct Harness {
    state: AppState,
    events: Arc<Mutex<Vec<MatchEvent>>>,
    _wal_dir: tempfile::TempDir,
    wal_path: std::path::PathBuf,
}

fn spawn_harness(symbols: &[&str], ring_capacity: usize) -> Harness {
    let wal_dir = tempfile::tempdir().expect("tempdir");
    let wal_path = wal_dir.path().join("wal.bin");
    let wal = wal::Wal::create(&wal_path, 1024 * 1024).expect("wal create");
    let (publisher, events) = Publisher::recording();
    let clock = MonotonicClock::new();
    let (producer, mut consumer) = sequencer::new(ring_capacity);

    let owned: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
    let matcher_clock = clock.clone();
    let matcher_producer = producer.clone();
    std::thread::Builder::new()
        .name("test-matcher".into())
        .spawn(move || {
            let mut handler =
                EventHandler::new("test-shard".into(), &owned, wal, publisher, matcher_clock, matcher_producer);
            handler.run(&mut consumer);
        })
        .expect("spawn matcher thread");

    let owned_symbols: Arc<HashSet<String>> = Arc::new(symbols.iter().map(|s| s.to_string()).collect());
    let state = AppState {
        shard_id: "test-shard".into(),
        owned_symbols,
        producer,
        clock,
    };

    Harness { state, events, _wal_dir: wal_dir, wal_path }
}

async fn call(state: &AppState, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let app = ingress::router(state.clone());
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let response = app.oneshot(request).await.expect("oneshot");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("read body");
    let value: Value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, value)
}

async fn post(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    call(state, "POST", uri, body).await
}

fn seed_order(id: &str, symbol: &str, side: &str, price: i64, qty: u64) -> Value {
    json!({"orderId": id, "symbol": symbol, "side": side, "price": price, "quantity": qty})
}

fn order_envelope(id: &str, symbol: &str, side: &str, order_type: &str, price: i64, qty: u64) -> Value {
    json!({
        "orderId": id,
        "symbol": symbol,
        "side": side,
        "type": order_type,
        "price": price,
        "quantity": qty,
    })
}

async fn wait_for_events(events: &Arc<Mutex<Vec<MatchEvent>>>, count: usize, timeout: Duration) -> Vec<MatchEvent> {
    let start = std::time::Instant::now();
    loop {
        {
            let guard = events.lock().expect("events buffer poisoned");
            if guard.len() >= count {
                return guard.clone();
            }
        }
        if start.elapsed() > timeout {
            panic!("expected {count} match events, timed out with fewer");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Scenario 1 (`spec.md` §8): aggressor crosses two resting sells at two
/// price levels, in price-then-time order, leaving a partial residual on
/// the first level it touched.
#[tokio::test]
async fn scenario_1_aggressor_sweeps_two_price_levels() {
    let harness = spawn_harness(&["TEST-ASSET-A"], 1024);

    let (status, seed_resp) = post(
        &harness.state,
        "/seed",
        json!({"orders": [
            seed_order("s1", "TEST-ASSET-A", "SELL", 15100, 50),
            seed_order("s2", "TEST-ASSET-A", "SELL", 15200, 100),
            seed_order("s3", "TEST-ASSET-A", "SELL", 15000, 75),
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seed_resp["seeded"], 3);

    let (status, _) = post(
        &harness.state,
        "/orders",
        order_envelope("b1", "TEST-ASSET-A", "BUY", "LIMIT", 15100, 100),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = wait_for_events(&harness.events, 2, Duration::from_secs(2)).await;
    assert_eq!(events[0].maker_id.0, "s3");
    assert_eq!(events[0].trade_price, 15000);
    assert_eq!(events[0].trade_qty, 75);
    assert_eq!(events[1].maker_id.0, "s1");
    assert_eq!(events[1].trade_price, 15100);
    assert_eq!(events[1].trade_qty, 25);
    assert!(events[0].trade_sequence < events[1].trade_sequence);
}

/// Scenario 2: a passive bid below the best ask rests without matching.
#[tokio::test]
async fn scenario_2_passive_bid_rests_without_matching() {
    let harness = spawn_harness(&["TEST-ASSET-A"], 1024);

    post(
        &harness.state,
        "/seed",
        json!({"orders": [
            seed_order("s1", "TEST-ASSET-A", "SELL", 15100, 50),
            seed_order("s2", "TEST-ASSET-A", "SELL", 15200, 100),
            seed_order("s3", "TEST-ASSET-A", "SELL", 15000, 75),
        ]}),
    )
    .await;

    let (status, _) = post(
        &harness.state,
        "/orders",
        order_envelope("b2", "TEST-ASSET-A", "BUY", "LIMIT", 14000, 50),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Nothing should ever match; give the matcher a moment then confirm
    // the event buffer stayed empty rather than racing a fixed sleep.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.events.lock().unwrap().is_empty());
}

/// Scenario 3: an empty book, a fresh resting sell, then a partial fill.
#[tokio::test]
async fn scenario_3_empty_book_then_partial_fill() {
    let harness = spawn_harness(&["TEST-ASSET-A"], 1024);

    let (status, _) = post(
        &harness.state,
        "/orders",
        order_envelope("s4", "TEST-ASSET-A", "SELL", "LIMIT", 15000, 50),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &harness.state,
        "/orders",
        order_envelope("b3", "TEST-ASSET-A", "BUY", "LIMIT", 15000, 30),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = wait_for_events(&harness.events, 1, Duration::from_secs(2)).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].aggressor_id.0, "b3");
    assert_eq!(events[0].maker_id.0, "s4");
    assert_eq!(events[0].trade_price, 15000);
    assert_eq!(events[0].trade_qty, 30);
}

/// Scenario 4: a symbol this shard does not own is rejected at ingress,
/// before it ever reaches the sequencer.
#[tokio::test]
async fn scenario_4_unknown_symbol_rejected_at_ingress() {
    let harness = spawn_harness(&["TEST-ASSET-A"], 1024);

    let (status, body) = post(
        &harness.state,
        "/orders",
        order_envelope("b9", "UNKNOWN", "BUY", "LIMIT", 100, 10),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "REJECTED");
    assert!(harness.events.lock().unwrap().is_empty());
}

/// A malformed submission body (missing a required field) gets the spec's
/// `400 {status:"REJECTED", reason}` JSON, not axum's own `422` extractor
/// rejection (`spec.md` §6/§7).
#[tokio::test]
async fn malformed_submission_body_returns_400_rejected_json() {
    let harness = spawn_harness(&["TEST-ASSET-A"], 1024);

    let (status, body) = post(
        &harness.state,
        "/orders",
        json!({"orderId": "b10", "symbol": "TEST-ASSET-A", "side": "BUY", "type": "LIMIT", "price": 100}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "REJECTED");
    assert!(harness.events.lock().unwrap().is_empty());
}

/// Scenario 5: with the matcher thread never started, a ring of capacity
/// 4 accepts exactly four submissions before returning 503.
#[tokio::test]
async fn scenario_5_ring_full_returns_503_on_the_fifth_submission() {
    let (producer, _consumer) = sequencer::new(4);
    let owned_symbols: Arc<HashSet<String>> = Arc::new(["TEST-ASSET-A".to_string()].into_iter().collect());
    let state = AppState {
        shard_id: "test-shard".into(),
        owned_symbols,
        producer,
        clock: MonotonicClock::new(),
    };

    // No matcher thread is spawned, so nothing ever drains the ring: the
    // consumer handle above is held but never polled, standing in for
    // `spec.md` §8 scenario 5's "consumer paused".
    for i in 0..4 {
        let (status, _) = post(&state, "/orders", order_envelope(&format!("r{i}"), "TEST-ASSET-A", "BUY", "LIMIT", 100, 1)).await;
        assert_eq!(status, StatusCode::OK, "submission {i} should be accepted");
    }

    let (status, body) = post(&state, "/orders", order_envelope("r4", "TEST-ASSET-A", "BUY", "LIMIT", 100, 1)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["reason"], "Ring buffer full");
}

/// Round-trip log law (`spec.md` §8): replaying the WAL after a run
/// reproduces the admitted order and the match it produced.
#[tokio::test]
async fn wal_round_trip_reflects_admitted_order_and_match() {
    let harness = spawn_harness(&["TEST-ASSET-A"], 1024);

    post(
        &harness.state,
        "/orders",
        order_envelope("s4", "TEST-ASSET-A", "SELL", "LIMIT", 15000, 50),
    )
    .await;
    post(
        &harness.state,
        "/orders",
        order_envelope("b3", "TEST-ASSET-A", "BUY", "LIMIT", 15000, 30),
    )
    .await;

    wait_for_events(&harness.events, 1, Duration::from_secs(2)).await;
    // `endOfBatch` forces the mapping to disk after the matcher drains a
    // batch; give it a moment to run past the last submission.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let bytes = std::fs::read(&harness.wal_path).expect("read wal file");
    let records = wal::read_records(&bytes);
    assert_eq!(records.len(), 3, "two OrderAdmitted records plus one Match record");

    let first: engine::prelude::LogRecord = serde_json::from_slice(&records[0]).unwrap();
    match first {
        engine::prelude::LogRecord::OrderAdmitted(order) => assert_eq!(order.id.0, "s4"),
        other => panic!("expected OrderAdmitted, got {other:?}"),
    }
}
