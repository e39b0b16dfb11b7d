use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Price is a signed 64-bit integer in minor currency units (cents).
/// Ordering and equality are by integer value. Never floating point,
/// never arbitrary precision — conversion from a decimal string happens
/// only at ingress parsing, outside this crate.
pub type Price = i64;

/// Quantity is a non-negative 64-bit integer. Zero means fully consumed.
pub type Quantity = u64;

/// Monotonically increasing counter used both for arrival ordering within
/// a shard and for trade sequencing.
pub type SequenceNumber = u64;

/// An opaque id assigned by the submitter. Unique within a shard for the
/// duration of the run; never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        OrderId(s.to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side indicates the direction of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// OrderType determines how the order is handled by the matcher.
/// `Market` is reserved by `spec.md` §3: accepted by the type system, but
/// this crate only defines book-resting semantics for `Limit`; a `Market`
/// residual is always discarded, never enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// OrderStatus is the current lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// A resting or in-flight order. Created inside the event handler from the
/// ingress payload; mutated only by the event handler.
///
/// Invariant: `0 <= remaining_qty <= original_qty`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub limit_price: Price,
    pub original_qty: Quantity,
    pub remaining_qty: Quantity,
    pub arrival_sequence: SequenceNumber,
    pub status: OrderStatus,
}

impl Order {
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining_qty == 0
    }
}

/// A price level: an ordered, FIFO-by-arrival-sequence sequence of orders
/// sharing one symbol and one `limit_price`. Invariant: no member has
/// `remaining_qty == 0` while enqueued; the level is removed from its side
/// map as soon as it becomes empty.
#[derive(Debug, Default)]
pub struct PriceLevel {
    pub price: Price,
    orders: VecDeque<Order>,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn push_back(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    #[inline]
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Removes the FIFO head. Callers must only call this once the head's
    /// `remaining_qty` has reached zero.
    #[inline]
    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

/// A single fill produced by matching one aggressor against one maker.
/// `trade_price` is always the maker's limit price: price improvement
/// goes to the aggressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEvent {
    pub aggressor_id: OrderId,
    pub maker_id: OrderId,
    pub symbol: String,
    pub trade_price: Price,
    pub trade_qty: Quantity,
    pub trade_sequence: SequenceNumber,
}

/// An ordered, possibly empty list of fills produced by matching one
/// aggressor against a book.
pub type MatchResultSet = Vec<MatchEvent>;

/// A typed, length-prefixed record appended to the write-ahead log: either
/// an admitted order or a match event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogRecord {
    OrderAdmitted(Order),
    Match(MatchEvent),
}
