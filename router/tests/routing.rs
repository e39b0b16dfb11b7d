//! Integration tests for scenario 6 of `spec.md` §8: routing by symbol,
//! unknown-symbol rejection, and shard-unreachable / shard-timeout mapping.

use axum::routing::post;
use axum::{Json, Router};
use router::app::{build_router, AppState};
use router::config::RoutingTables;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

async fn spawn_echo_shard() -> String {
    let app = Router::new().route(
        "/orders",
        post(|body: axum::body::Bytes| async move {
            let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
            (
                axum::http::StatusCode::OK,
                Json(serde_json::json!({"status": "ACCEPTED", "orderId": value["orderId"], "shardId": "shard-a"})),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

async fn spawn_slow_shard(delay: Duration) -> String {
    let app = Router::new().route(
        "/orders",
        post(move |_body: axum::body::Bytes| async move {
            tokio::time::sleep(delay).await;
            (axum::http::StatusCode::OK, Json(serde_json::json!({"status": "ACCEPTED"})))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

fn tables_from(urls: &[(&str, &str)], symbols: &[(&str, &str)]) -> Arc<RoutingTables> {
    let shard_base_urls: HashMap<String, String> =
        urls.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let mut symbol_to_shard = HashMap::new();
    for (shard, syms) in symbols {
        for s in syms.split(',') {
            symbol_to_shard.insert(s.to_string(), shard.to_string());
        }
    }
    Arc::new(RoutingTables { shard_base_urls, symbol_to_shard })
}

async fn spawn_router(tables: Arc<RoutingTables>, timeout: Duration) -> String {
    let state = AppState::new(tables, timeout).unwrap();
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

#[tokio::test]
async fn routes_known_symbol_to_owning_shard() {
    let shard_a = spawn_echo_shard().await;
    let tables = tables_from(&[("shard-a", &shard_a)], &[("shard-a", "A,B")]);
    let router_addr = spawn_router(tables, Duration::from_secs(5)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{router_addr}/orders"))
        .json(&serde_json::json!({"orderId": "o1", "symbol": "A", "side": "BUY", "type": "LIMIT", "price": 100, "quantity": 10}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["shardId"], "shard-a");
}

#[tokio::test]
async fn unknown_symbol_returns_400() {
    let shard_a = spawn_echo_shard().await;
    let tables = tables_from(&[("shard-a", &shard_a)], &[("shard-a", "A,B")]);
    let router_addr = spawn_router(tables, Duration::from_secs(5)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{router_addr}/orders"))
        .json(&serde_json::json!({"orderId": "o1", "symbol": "Z", "side": "BUY", "type": "LIMIT", "price": 100, "quantity": 10}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn shard_unreachable_returns_502() {
    // Port 1 on loopback is reserved and nothing listens there.
    let tables = tables_from(&[("shard-a", "http://127.0.0.1:1")], &[("shard-a", "A")]);
    let router_addr = spawn_router(tables, Duration::from_secs(2)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{router_addr}/orders"))
        .json(&serde_json::json!({"orderId": "o1", "symbol": "A", "side": "BUY", "type": "LIMIT", "price": 100, "quantity": 10}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn shard_timeout_returns_504() {
    let shard_a = spawn_slow_shard(Duration::from_millis(300)).await;
    let tables = tables_from(&[("shard-a", &shard_a)], &[("shard-a", "A")]);
    let router_addr = spawn_router(tables, Duration::from_millis(50)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{router_addr}/orders"))
        .json(&serde_json::json!({"orderId": "o1", "symbol": "A", "side": "BUY", "type": "LIMIT", "price": 100, "quantity": 10}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 504);
}

#[tokio::test]
async fn seed_is_proxied_to_explicit_shard() {
    let app = Router::new().route(
        "/seed",
        post(|_body: axum::body::Bytes| async move { Json(serde_json::json!({"seeded": 3})) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    let shard_a = format!("http://{addr}");

    let tables = tables_from(&[("shard-a", &shard_a)], &[("shard-a", "A")]);
    let router_addr = spawn_router(tables, Duration::from_secs(5)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{router_addr}/seed/shard-a"))
        .json(&serde_json::json!({"orders": []}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["seeded"], 3);
}
