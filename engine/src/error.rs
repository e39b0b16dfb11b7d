use thiserror::Error;

/// Reasons an inbound submission fails validation before it ever reaches
/// the matcher. Mirrors `spec.md` §4.2 step 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("unknown symbol for this shard")]
    UnknownSymbol,
    #[error("invalid side")]
    InvalidSide,
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("limit price must be positive")]
    NonPositiveLimitPrice,
    #[error("invalid order type")]
    InvalidOrderType,
}

impl RejectReason {
    /// A stable, metric-label-friendly identifier for this reason, distinct
    /// from the human-readable `Display` message above.
    pub fn label(self) -> &'static str {
        match self {
            RejectReason::UnknownSymbol => "unknown_symbol",
            RejectReason::InvalidSide => "invalid_side",
            RejectReason::NonPositiveQuantity => "non_positive_quantity",
            RejectReason::NonPositiveLimitPrice => "non_positive_limit_price",
            RejectReason::InvalidOrderType => "invalid_order_type",
        }
    }
}
