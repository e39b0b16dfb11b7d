//! Per-symbol order book: two ordered price-level maps plus an order-id
//! index. Owned exclusively by the event handler thread — see `spec.md`
//! §5 and §9 ("single-writer without locks"): nothing here takes a lock,
//! because nothing but the matcher thread ever touches it.
//!
//! Realized as two `BTreeMap`s (design note §9(i): "a balanced BST keyed
//! by signed price with sign-flip for descending side") rather than the
//! teacher's `crossbeam_skiplist::SkipList` + `flurry::HashMap`: those
//! exist to let multiple threads mutate the book concurrently under CAS,
//! which this system's single-writer pipeline never needs. See
//! DESIGN.md for the tradeoff.

use crate::types::{Order, OrderId, Price, PriceLevel, Side};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// One symbol's order book: a descending-keyed bids side, an
/// ascending-keyed asks side, and an order-id index.
pub struct OrderBook {
    pub symbol: String,
    bids: BTreeMap<Reverse<Price>, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    index: HashMap<OrderId, (Side, Price)>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Best price on `side`, or `None` if that side is empty. `O(log P)`.
    #[inline]
    pub fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.bids.keys().next().map(|Reverse(p)| *p),
            Side::Sell => self.asks.keys().next().map(|p| *p),
        }
    }

    /// Mutable access to the best (head-of-queue) level on `side`.
    /// `O(log P)`.
    pub fn best_level_mut(&mut self, side: Side) -> Option<&mut PriceLevel> {
        match side {
            Side::Buy => self.bids.iter_mut().next().map(|(_, lvl)| lvl),
            Side::Sell => self.asks.iter_mut().next().map(|(_, lvl)| lvl),
        }
    }

    /// Removes the FIFO head of the level at `(side, price)`. The head
    /// must already have `remaining_qty == 0`; the level itself is
    /// dropped from the side map if it becomes empty. `O(1)` amortized on
    /// the queue, `O(log P)` when the level vanishes.
    pub fn pop_consumed_head(&mut self, side: Side, price: Price) {
        let level_empty = {
            let level = match side {
                Side::Buy => self.bids.get_mut(&Reverse(price)),
                Side::Sell => self.asks.get_mut(&price),
            };
            let Some(level) = level else { return };
            if let Some(head) = level.front() {
                debug_assert_eq!(head.remaining_qty, 0);
                self.index.remove(&head.id);
            }
            level.pop_front();
            level.is_empty()
        };
        if level_empty {
            match side {
                Side::Buy => {
                    self.bids.remove(&Reverse(price));
                }
                Side::Sell => {
                    self.asks.remove(&price);
                }
            }
        }
        self.check_crossed_invariant();
    }

    /// Appends `order` to the tail of its price level, creating the level
    /// if absent, and updates the order-id index.
    pub fn enqueue(&mut self, order: Order) {
        let side = order.side;
        let price = order.limit_price;
        let id = order.id.clone();
        match side {
            Side::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order),
            Side::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order),
        }
        self.index.insert(id, (side, price));
        self.check_crossed_invariant();
    }

    /// Number of distinct price levels on `side`.
    #[inline]
    pub fn price_level_count(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    /// Total resting quantity on `side`, across all levels.
    pub fn depth(&self, side: Side) -> u64 {
        match side {
            Side::Buy => self
                .bids
                .values()
                .flat_map(|l| l.iter())
                .map(|o| o.remaining_qty)
                .sum(),
            Side::Sell => self
                .asks
                .values()
                .flat_map(|l| l.iter())
                .map(|o| o.remaining_qty)
                .sum(),
        }
    }

    #[inline]
    pub fn contains(&self, id: &OrderId) -> bool {
        self.index.contains_key(id)
    }

    /// Cross-check invariant: best_bid < best_ask, or one side is empty.
    /// `O(1)`. Checked after every mutation.
    fn check_crossed_invariant(&self) {
        if let (Some(bid), Some(ask)) = (self.best_price(Side::Buy), self.best_price(Side::Sell)) {
            debug_assert!(
                bid < ask,
                "book invariant violated for {}: best_bid {} >= best_ask {}",
                self.symbol,
                bid,
                ask
            );
        }
    }
}

/// Map from symbol string to per-symbol `OrderBook`. Symbols not owned by
/// a shard are simply absent; ingress is responsible for rejecting
/// submissions against absent symbols before they ever reach this map.
#[derive(Default)]
pub struct OrderBookSet {
    books: HashMap<String, OrderBook>,
}

impl OrderBookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the book for `symbol`, creating an empty one on first use.
    pub fn get_or_create_mut(&mut self, symbol: &str) -> &mut OrderBook {
        self.books
            .entry(symbol.to_string())
            .or_insert_with(|| OrderBook::new(symbol))
    }

    pub fn get(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut OrderBook> {
        self.books.get_mut(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }
}
