//! Price-time priority matcher. `spec.md` §4.4: `O(log P + F)` where `P` is
//! the number of distinct price levels on the opposite side and `F` the
//! number of fills produced.

use crate::book::OrderBook;
use crate::types::{MatchEvent, MatchResultSet, Order, OrderStatus, OrderType, Side};

/// Matches `aggressor` against `book`, mutating both the aggressor and any
/// makers it trades against in place. Any limit residual is enqueued on
/// the aggressor's own side before returning; a market residual is
/// discarded per `spec.md` §4.4.
///
/// `next_trade_sequence` is called once per fill, in order, and must
/// return a strictly monotonically increasing value — see `spec.md` §8
/// invariant 6.
pub fn match_order(
    book: &mut OrderBook,
    aggressor: &mut Order,
    next_trade_sequence: &mut impl FnMut() -> u64,
) -> MatchResultSet {
    let opposite = aggressor.side.opposite();
    let mut fills = MatchResultSet::new();

    while aggressor.remaining_qty > 0 {
        let Some(best_price) = book.best_price(opposite) else {
            break;
        };

        let price_compatible = aggressor.order_type == OrderType::Market
            || match aggressor.side {
                Side::Buy => aggressor.limit_price >= best_price,
                Side::Sell => aggressor.limit_price <= best_price,
            };
        if !price_compatible {
            break;
        }

        let maker_exhausted = {
            let level = book
                .best_level_mut(opposite)
                .expect("best_price returned Some but level is missing");
            let maker = level
                .front_mut()
                .expect("non-empty level must have a FIFO head");

            let fill_qty = aggressor.remaining_qty.min(maker.remaining_qty);
            fills.push(MatchEvent {
                aggressor_id: aggressor.id.clone(),
                maker_id: maker.id.clone(),
                symbol: aggressor.symbol.clone(),
                trade_price: best_price,
                trade_qty: fill_qty,
                trade_sequence: next_trade_sequence(),
            });

            aggressor.remaining_qty -= fill_qty;
            maker.remaining_qty -= fill_qty;
            maker.status = if maker.remaining_qty == 0 {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            maker.remaining_qty == 0
        };

        if maker_exhausted {
            book.pop_consumed_head(opposite, best_price);
        }
    }

    if aggressor.remaining_qty == 0 {
        aggressor.status = OrderStatus::Filled;
    } else if aggressor.order_type == OrderType::Limit {
        aggressor.status = if fills.is_empty() {
            OrderStatus::New
        } else {
            OrderStatus::PartiallyFilled
        };
        book.enqueue(aggressor.clone());
    } else if !fills.is_empty() {
        aggressor.status = OrderStatus::PartiallyFilled;
    }

    fills
}
