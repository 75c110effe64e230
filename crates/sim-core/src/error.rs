//! Error types for sim-core operations.

use std::fmt;
use types::{AgentId, OrderId};

/// Result type for sim-core operations.
pub type Result<T> = std::result::Result<T, SimCoreError>;

/// Errors that can occur during market operations.
///
/// These are structural failures of the caller's contract with the core.
/// Domain-level rejects are [`types::RejectReason`] values and never appear
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCoreError {
    /// The agent was never registered with the market.
    UnknownAgent(AgentId),
    /// The requested order was not found in the book.
    OrderNotFound(OrderId),
    /// Invalid order: zero quantity.
    ZeroQuantity,
    /// Invalid order: non-positive price for limit order.
    InvalidPrice,
    /// Invalid order: price not aligned to the book's tick size.
    UnalignedPrice,
    /// Market orders cannot rest in the book.
    MarketOrderInBook,
}

impl fmt::Display for SimCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimCoreError::UnknownAgent(id) => write!(f, "unknown agent: {}", id),
            SimCoreError::OrderNotFound(id) => write!(f, "order not found: {}", id),
            SimCoreError::ZeroQuantity => write!(f, "order quantity cannot be zero"),
            SimCoreError::InvalidPrice => write!(f, "limit order price must be positive"),
            SimCoreError::UnalignedPrice => {
                write!(f, "limit order price not aligned to tick size")
            }
            SimCoreError::MarketOrderInBook => {
                write!(f, "market orders cannot be added to the book")
            }
        }
    }
}

impl std::error::Error for SimCoreError {}
