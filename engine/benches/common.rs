use engine::prelude::*;

/// Quickly generate a limit order for benchmarking.
pub fn make_limit_order(id: &str, side: Side, price: Price, qty: Quantity, seq: u64) -> Order {
    Order {
        id: OrderId::from(id),
        symbol: "TEST-ASSET-A".into(),
        side,
        order_type: OrderType::Limit,
        limit_price: price,
        original_qty: qty,
        remaining_qty: qty,
        arrival_sequence: seq,
        status: OrderStatus::New,
    }
}
