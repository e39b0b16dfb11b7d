//! Router HTTP surface: a stateless, symbol-keyed proxy in front of the
//! shard fleet. `spec.md` §4.8. Grounded on the axum inbound surface of
//! `lukewaehner-HFT-Ledger`'s `exchange-service` combined with the
//! `reqwest` outbound client of that same repo's `cli`, per
//! `SPEC_FULL.md` §4.8.

use crate::config::RoutingTables;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quanta::Clock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Shared, read-only state for every handler: the routing tables and a
/// connection-pooled outbound client. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<RoutingTables>,
    pub client: reqwest::Client,
    pub clock: Clock,
}

impl AppState {
    pub fn new(tables: Arc<RoutingTables>, shard_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(shard_timeout).build()?;
        Ok(Self { tables, client, clock: Clock::new() })
    }
}

/// Builds the router's axum `Router`, wired with `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(route_submit))
        .route("/seed/:shard_id", post(route_seed))
        .route("/health", get(health))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    reason: String,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "UP"}))
}

/// POST /orders. Reads the full body, parses only the `symbol` field,
/// forwards the unmodified body to the owning shard's submit endpoint, and
/// proxies the response verbatim. `spec.md` §4.8 steps 1-5.
async fn route_submit(State(state): State<AppState>, body: Bytes) -> Response {
    let symbol = match extract_symbol(&body) {
        Some(s) => s,
        None => {
            metrics::counter!("gw_routing_errors_total", "reason" => "unknown_symbol").increment(1);
            return bad_request("missing or unparseable `symbol` field");
        }
    };

    let Some(shard_id) = state.tables.shard_for_symbol(&symbol) else {
        metrics::counter!("gw_routing_errors_total", "reason" => "unknown_symbol").increment(1);
        return bad_request(format!("unknown symbol: {symbol}"));
    };
    let shard_id = shard_id.to_string();

    let Some(base_url) = state.tables.base_url_for_shard(&shard_id) else {
        metrics::counter!("gw_routing_errors_total", "reason" => "shard_unavailable").increment(1);
        return bad_gateway(&shard_id);
    };

    let target = format!("{base_url}/orders");
    forward(&state, &shard_id, target, body).await
}

/// POST /seed/:shard_id. The seed surface is test-setup-only, so instead of
/// inferring a shard from symbols in the batch, the caller names the shard
/// explicitly via a path parameter (`spec.md` §4.8's "a seed operation is
/// proxied by the router via a path parameter that selects the shard
/// explicitly").
async fn route_seed(State(state): State<AppState>, Path(shard_id): Path<String>, body: Bytes) -> Response {
    let Some(base_url) = state.tables.base_url_for_shard(&shard_id) else {
        metrics::counter!("gw_routing_errors_total", "reason" => "unknown_symbol").increment(1);
        return bad_request(format!("unknown shard: {shard_id}"));
    };

    let target = format!("{base_url}/seed");
    forward(&state, &shard_id, target, body).await
}

/// Extracts only the top-level `symbol` string field from a raw JSON body,
/// without fully deserializing the order envelope. `spec.md` §4.8 step 2.
fn extract_symbol(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("symbol")?.as_str().map(str::to_string)
}

async fn forward(state: &AppState, shard_id: &str, target: String, body: Bytes) -> Response {
    let start = state.clock.now();

    let result = state
        .client
        .post(&target)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await;

    let elapsed = state.clock.now().duration_since(start).as_secs_f64();
    metrics::histogram!("gw_request_duration_seconds", "shard" => shard_id.to_string()).record(elapsed);

    match result {
        Ok(response) => {
            let status = response.status();
            let status_class = status_class(status.as_u16());
            metrics::counter!("gw_requests_total", "shard" => shard_id.to_string(), "status_class" => status_class)
                .increment(1);
            proxy_response(response).await
        }
        Err(e) if e.is_timeout() => {
            tracing::warn!(shard = shard_id, "shard round trip timed out");
            metrics::counter!("gw_routing_errors_total", "reason" => "timeout").increment(1);
            metrics::counter!("gw_requests_total", "shard" => shard_id.to_string(), "status_class" => "5xx")
                .increment(1);
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(ErrorBody { status: "REJECTED", reason: "shard timeout".into() }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(shard = shard_id, error = %e, "shard unreachable");
            metrics::counter!("gw_routing_errors_total", "reason" => "shard_unavailable").increment(1);
            metrics::counter!("gw_requests_total", "shard" => shard_id.to_string(), "status_class" => "5xx")
                .increment(1);
            bad_gateway(shard_id)
        }
    }
}

/// Proxies a shard's response verbatim: status, content-type, and body.
async fn proxy_response(response: reqwest::Response) -> Response {
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .cloned();

    match response.bytes().await {
        Ok(bytes) => {
            let mut headers = HeaderMap::new();
            if let Some(ct) = content_type {
                headers.insert(axum::http::header::CONTENT_TYPE, ct);
            }
            let axum_status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (axum_status, headers, Body::from(bytes)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read shard response body");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody { status: "REJECTED", reason: "shard response unreadable".into() }),
            )
                .into_response()
        }
    }
}

fn status_class(code: u16) -> &'static str {
    match code / 100 {
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        5 => "5xx",
        _ => "other",
    }
}

fn bad_request(reason: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { status: "REJECTED", reason: reason.into() })).into_response()
}

fn bad_gateway(shard_id: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorBody { status: "REJECTED", reason: format!("shard {shard_id} unreachable") }),
    )
        .into_response()
}
