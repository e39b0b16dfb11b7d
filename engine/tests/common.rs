use engine::prelude::*;

/// Quickly generate a limit order for testing.
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

/// Quickly generate a market order for testing.
pub fn make_market_order(id: &str, side: Side, qty: Quantity, seq: u64) -> Order {
    let mut order = make_limit_order(id, side, 0, qty, seq);
    order.order_type = OrderType::Market;
    order
}

/// Sequence generator suitable for passing as `next_trade_sequence`.
pub fn seq_counter() -> impl FnMut() -> u64 {
    let mut n = 0u64;
    move || {
        n += 1;
        n
    }
}
