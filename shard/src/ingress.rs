//! HTTP ingress surface: submit, seed, health. `spec.md` §4.7.
//!
//! Grounded on the axum router/handler shape of
//! `lukewaehner/HFT-Ledger`'s `exchange-service`, adapted so both submit
//! and seed hand off to the sequencer rather than touching the book from
//! an ingress thread. `spec.md` §4.7 describes seed as bypassing "the
//! sequencer, matcher, WAL, and publisher", but the book is owned
//! exclusively by the matcher thread with no lock around it (`spec.md`
//! §5, §9) — the sequencer hand-off is the only safe way for an ingress
//! thread to make the matcher insert something, so seed keeps it and only
//! actually skips matching, the WAL, and the publisher. See DESIGN.md.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use engine::prelude::*;
use serde::{Deserialize, Serialize};

use crate::clock::{wall_clock_millis, MonotonicClock};
use crate::sequencer::{ClaimError, SeedEntry, SequencerProducer, SlotPayload, Submission};

#[derive(Clone)]
pub struct AppState {
    pub shard_id: String,
    pub owned_symbols: std::sync::Arc<std::collections::HashSet<String>>,
    pub producer: SequencerProducer,
    pub clock: MonotonicClock,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(submit_order))
        .route("/seed", post(seed_orders))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    #[serde(rename = "orderId")]
    order_id: String,
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    price: i64,
    quantity: u64,
    #[allow(dead_code)]
    timestamp: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    status: &'static str,
    #[serde(rename = "orderId")]
    order_id: String,
    #[serde(rename = "shardId")]
    shard_id: String,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct RejectedResponse {
    status: &'static str,
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    order_id: Option<String>,
    reason: String,
}

fn parse_side(raw: &str) -> Option<Side> {
    match raw.to_ascii_uppercase().as_str() {
        "BUY" => Some(Side::Buy),
        "SELL" => Some(Side::Sell),
        _ => None,
    }
}

fn parse_order_type(raw: &str) -> Option<OrderType> {
    match raw.to_ascii_uppercase().as_str() {
        "LIMIT" => Some(OrderType::Limit),
        "MARKET" => Some(OrderType::Market),
        _ => None,
    }
}

/// POST /orders. Pre-admission validation happens here; deeper validation
/// happens again, independently, in the handler (`spec.md` §4.2 step 2,
/// §4.7).
///
/// Takes the raw body rather than a `Json<OrderEnvelope>` extractor:
/// `axum::Json`'s own rejection on a malformed or missing-field body is a
/// plain-text `422`, not the spec's `400 {status:"REJECTED", orderId,
/// reason}` JSON (`spec.md` §6/§7), so parsing happens here where a failure
/// can be turned into that shape directly.
async fn submit_order(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let envelope: OrderEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RejectedResponse {
                    status: "REJECTED",
                    order_id: None,
                    reason: format!("malformed submission: {e}"),
                }),
            )
                .into_response();
        }
    };

    if !state.owned_symbols.contains(&envelope.symbol) {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectedResponse {
                status: "REJECTED",
                order_id: Some(envelope.order_id),
                reason: "unknown symbol".into(),
            }),
        )
            .into_response();
    }

    let Some(side) = parse_side(&envelope.side) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectedResponse {
                status: "REJECTED",
                order_id: Some(envelope.order_id),
                reason: "invalid side".into(),
            }),
        )
            .into_response();
    };

    let Some(order_type) = parse_order_type(&envelope.order_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectedResponse {
                status: "REJECTED",
                order_id: Some(envelope.order_id),
                reason: "invalid type".into(),
            }),
        )
            .into_response();
    };

    if envelope.quantity == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectedResponse {
                status: "REJECTED",
                order_id: Some(envelope.order_id),
                reason: "non-positive quantity".into(),
            }),
        )
            .into_response();
    }

    if order_type == OrderType::Limit && envelope.price <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectedResponse {
                status: "REJECTED",
                order_id: Some(envelope.order_id),
                reason: "non-positive limit price".into(),
            }),
        )
            .into_response();
    }

    let submission = Submission {
        order_id: OrderId::from(envelope.order_id.clone()),
        symbol: envelope.symbol,
        side,
        order_type,
        limit_price: envelope.price,
        quantity: envelope.quantity,
        admission_ns: state.clock.now_ns(),
    };

    match state.producer.publish(SlotPayload::Submit(submission)) {
        Ok(()) => (
            StatusCode::OK,
            Json(AcceptedResponse {
                status: "ACCEPTED",
                order_id: envelope.order_id,
                shard_id: state.shard_id,
                timestamp: wall_clock_millis(),
            }),
        )
            .into_response(),
        Err(ClaimError::RingFull) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RejectedResponse {
                status: "REJECTED",
                order_id: None,
                reason: "Ring buffer full".into(),
            }),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SeedRequest {
    orders: Vec<SeedOrder>,
}

#[derive(Debug, Deserialize)]
struct SeedOrder {
    #[serde(rename = "orderId")]
    order_id: String,
    symbol: String,
    side: String,
    price: i64,
    quantity: u64,
}

#[derive(Debug, Serialize)]
struct SeedResponse {
    seeded: usize,
}

/// POST /seed. Pre-filters each entry the same way `/orders` pre-validates
/// a submission, then hands the accepted batch to the matcher thread via
/// the sequencer as one `SlotPayload::Seed`, which enqueues them directly
/// into their books without validating, matching, logging, or publishing
/// them (`spec.md` §4.7).
async fn seed_orders(State(state): State<AppState>, Json(request): Json<SeedRequest>) -> impl IntoResponse {
    let entries: Vec<SeedEntry> = request
        .orders
        .into_iter()
        .filter_map(|seed| {
            if !state.owned_symbols.contains(&seed.symbol) {
                return None;
            }
            let side = parse_side(&seed.side)?;
            if seed.quantity == 0 || seed.price <= 0 {
                return None;
            }
            Some(SeedEntry {
                order_id: OrderId::from(seed.order_id),
                symbol: seed.symbol,
                side,
                limit_price: seed.price,
                quantity: seed.quantity,
            })
        })
        .collect();

    let seeded = entries.len();
    if seeded > 0 {
        if let Err(ClaimError::RingFull) = state.producer.publish(SlotPayload::Seed(entries)) {
            tracing::warn!("seed batch dropped: ring buffer full");
            return Json(SeedResponse { seeded: 0 });
        }
    }

    Json(SeedResponse { seeded })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(rename = "shardId")]
    shard_id: String,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse { status: "UP", shard_id: state.shard_id })
}
