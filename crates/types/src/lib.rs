//! Core types for the compute-budgeted market simulation.
//!
//! This crate provides all shared data types used across the simulation:
//! order and trade types, agent intents with their admission receipts, and
//! fixed-point monetary values.

use derive_more::{Add, AddAssign, From, Into, Neg, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

// =============================================================================
// Constants
// =============================================================================

/// Fixed-point scale for Price and Cash types.
/// 10,000 = $1.00, 15,000 = $1.50, 100 = $0.01
pub const PRICE_SCALE: i64 = 10_000;

// =============================================================================
// Core ID Types (Newtypes for type safety)
// =============================================================================

/// Unique identifier for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order({})", self.0)
    }
}

/// Unique identifier for agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent({})", self.0)
    }
}

/// Unique identifier for trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trade({})", self.0)
    }
}

// =============================================================================
// Time Types
// =============================================================================

/// Simulation tick number (discrete time step).
pub type Tick = u64;

/// Globally monotonic intent-creation sequence number.
///
/// Assigned once at intent creation and used as the deterministic
/// tie-breaker everywhere ticks coincide.
pub type Seq = u64;

// =============================================================================
// Quantity Type (Newtype for shares)
// =============================================================================

/// Number of shares (newtype for type safety).
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Quantity(pub u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Get raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Check if zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Quantity(self.0.saturating_sub(rhs.0))
    }

    /// Minimum of two quantities.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Quantity(self.0.min(other.0))
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qty({})", self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Allow `quantity == 50` comparisons
impl PartialEq<u64> for Quantity {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Fixed-Point Monetary Types
// =============================================================================

/// Fixed-point price with 4 decimal places.
///
/// # Examples
/// - `Price(10000)` = $1.00
/// - `Price(15000)` = $1.50
/// - `Price(100)` = $0.01
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    From,
    Into,
)]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Create a Price from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * PRICE_SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if price is positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Check alignment against a tick size.
    ///
    /// A price conforms when it is an integer multiple of the tick size.
    #[inline]
    pub fn is_aligned(self, tick_size: Price) -> bool {
        tick_size.0 > 0 && self.0 % tick_size.0 == 0
    }

    /// Round to the nearest multiple of the tick size (half rounds up).
    #[inline]
    pub fn round_to_tick(self, tick_size: Price) -> Self {
        if tick_size.0 <= 0 {
            return self;
        }
        let adjusted = self.0 + tick_size.0 / 2;
        Price(adjusted - adjusted.rem_euclid(tick_size.0))
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price(${:.4})", self.to_float())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.4}", self.to_float())
    }
}

/// Fixed-point cash/money with 4 decimal places.
///
/// Semantically identical to Price but represents account balances.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Cash(pub i64);

impl Cash {
    pub const ZERO: Cash = Cash(0);

    /// Create Cash from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * PRICE_SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display/calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if cash is negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Debug for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cash(${:.4})", self.to_float())
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.4}", self.to_float())
    }
}

// =============================================================================
// Price-Quantity Operations
// =============================================================================

impl Mul<Quantity> for Price {
    type Output = Cash;

    /// Multiply price by quantity to get total cash value.
    fn mul(self, qty: Quantity) -> Cash {
        Cash(self.0 * qty.0 as i64)
    }
}

impl Mul<Price> for Quantity {
    type Output = Cash;

    fn mul(self, price: Price) -> Cash {
        Cash(price.0 * self.0 as i64)
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// Which side of the market the order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Kind of order determining execution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Execute immediately at best available price.
    Market,
    /// Execute at specified price or better.
    Limit { price: Price },
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::Limit { price } => write!(f, "LIMIT@{}", price),
        }
    }
}

/// Status of an order in the system.
///
/// `Filled`, `Cancelled` and `Rejected` are terminal; a terminal order is
/// never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, still in flight through the latency queue.
    #[default]
    Pending,
    /// Order resting in the book, untouched.
    Resting,
    /// Order partially filled.
    PartiallyFilled { filled: Quantity },
    /// Order completely filled.
    Filled,
    /// Order was cancelled.
    Cancelled,
    /// Order was rejected by the policy layer.
    Rejected,
}

impl OrderStatus {
    /// Check whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A trading order created from an agent intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier (assigned by the market, 0 as placeholder).
    pub id: OrderId,
    /// Agent who submitted the order.
    pub agent_id: AgentId,
    /// Buy or Sell.
    pub side: OrderSide,
    /// Market or Limit order.
    pub kind: OrderKind,
    /// Number of shares.
    pub quantity: Quantity,
    /// Remaining quantity (for partial fills).
    pub remaining_quantity: Quantity,
    /// Tick at which the originating intent was created.
    pub creation_tick: Tick,
    /// Global creation sequence number (assigned by the market).
    pub creation_seq: Seq,
    /// Current status.
    pub status: OrderStatus,
}

impl Order {
    /// Create a new limit order.
    pub fn limit(agent_id: AgentId, side: OrderSide, price: Price, quantity: Quantity) -> Self {
        Self {
            id: OrderId(0), // Placeholder, assigned by the market
            agent_id,
            side,
            kind: OrderKind::Limit { price },
            quantity,
            remaining_quantity: quantity,
            creation_tick: 0,
            creation_seq: 0,
            status: OrderStatus::Pending,
        }
    }

    /// Create a new market order.
    pub fn market(agent_id: AgentId, side: OrderSide, quantity: Quantity) -> Self {
        Self {
            id: OrderId(0),
            agent_id,
            side,
            kind: OrderKind::Market,
            quantity,
            remaining_quantity: quantity,
            creation_tick: 0,
            creation_seq: 0,
            status: OrderStatus::Pending,
        }
    }

    /// Get the limit price if this is a limit order.
    pub fn limit_price(&self) -> Option<Price> {
        match self.kind {
            OrderKind::Limit { price } => Some(price),
            OrderKind::Market => None,
        }
    }

    /// Check if order is fully filled.
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// Check if order is a buy order.
    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }
}

/// An in-flight request to cancel a resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Agent requesting the cancel.
    pub agent_id: AgentId,
    /// The order to cancel.
    pub order_id: OrderId,
    /// Tick at which the cancel intent was created.
    pub creation_tick: Tick,
    /// Global creation sequence number.
    pub creation_seq: Seq,
}

// =============================================================================
// Trade Type
// =============================================================================

/// A completed trade between two parties. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier.
    pub id: TradeId,
    /// Tick at which the trade executed.
    pub tick: Tick,
    /// Execution price.
    pub price: Price,
    /// Number of shares traded.
    pub quantity: Quantity,
    /// Agent who bought.
    pub buy_agent: AgentId,
    /// Agent who sold.
    pub sell_agent: AgentId,
    /// Order on the buy side.
    pub buy_order: OrderId,
    /// Order on the sell side.
    pub sell_order: OrderId,
    /// Agent on the initiating side (pays the taker fee).
    pub taker_agent: AgentId,
    /// Side of the initiating order.
    pub taker_side: OrderSide,
}

impl Trade {
    /// Calculate the total value of this trade.
    pub fn value(&self) -> Cash {
        self.price * self.quantity
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade[{}]: {} shares @ {} (buyer: {}, seller: {}, taker: {})",
            self.id, self.quantity, self.price, self.buy_agent, self.sell_agent, self.taker_agent
        )
    }
}

// =============================================================================
// Intent Types (agent-facing submission interface)
// =============================================================================

/// What an agent wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
    /// Place a limit order.
    Limit {
        side: OrderSide,
        price: Price,
        qty: Quantity,
    },
    /// Place a market order.
    Market { side: OrderSide, qty: Quantity },
    /// Cancel a previously placed order.
    Cancel { order_id: OrderId },
}

impl IntentKind {
    /// Stable lowercase label used in event logs.
    pub fn label(&self) -> &'static str {
        match self {
            IntentKind::Limit { .. } => "limit",
            IntentKind::Market { .. } => "market",
            IntentKind::Cancel { .. } => "cancel",
        }
    }
}

/// A single agent decision, submitted once per agent per tick.
///
/// The compute layer converts `tokens_requested` into an admitted token
/// count and a latency; the intent's effect lands at the resulting arrival
/// tick, not at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// The action being requested.
    pub kind: IntentKind,
    /// Compute tokens the agent wants to spend on this decision.
    pub tokens_requested: u64,
}

impl Intent {
    /// Limit-order intent.
    pub fn limit(side: OrderSide, price: Price, qty: Quantity, tokens: u64) -> Self {
        Self {
            kind: IntentKind::Limit { side, price, qty },
            tokens_requested: tokens,
        }
    }

    /// Market-order intent.
    pub fn market(side: OrderSide, qty: Quantity, tokens: u64) -> Self {
        Self {
            kind: IntentKind::Market { side, qty },
            tokens_requested: tokens,
        }
    }

    /// Cancel intent targeting a previously returned order id.
    pub fn cancel(order_id: OrderId, tokens: u64) -> Self {
        Self {
            kind: IntentKind::Cancel { order_id },
            tokens_requested: tokens,
        }
    }
}

/// Synchronous response to an admitted intent.
///
/// Returned at submission time so agents can log their own decision timing
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentReceipt {
    /// Tokens actually charged.
    pub tokens_used: u64,
    /// Tokens left in the agent's bucket after the charge.
    pub tokens_remaining: u64,
    /// Whether the request exceeded the available budget.
    pub degraded: bool,
    /// Derived decision latency in milliseconds (floor applied).
    pub latency_ms: f64,
    /// Tick at which the intent takes effect.
    pub arrival_tick: Tick,
    /// Id assigned to the in-flight order (None for cancel intents).
    pub order_id: Option<OrderId>,
}

/// Reasons the policy layer refuses an intent.
///
/// Rejects are domain-level and recoverable; they never mutate book state
/// or accounts. The serialized form is the stable reason code written to
/// event logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Per-agent per-tick message cap exceeded.
    MessageLimit,
    /// Cancel arrived before the target order's minimum resting time.
    MinRestingTime,
    /// Limit price not aligned to the tick size.
    TickSize,
    /// Non-positive quantity.
    InvalidQuantity,
    /// Non-positive limit price.
    InvalidPrice,
    /// Incoming order would cross the agent's own resting order.
    SelfTrade,
}

impl RejectReason {
    /// Stable reason code used in event logs.
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::MessageLimit => "message_limit",
            RejectReason::MinRestingTime => "min_resting_time",
            RejectReason::TickSize => "tick_size",
            RejectReason::InvalidQuantity => "invalid_quantity",
            RejectReason::InvalidPrice => "invalid_price",
            RejectReason::SelfTrade => "self_trade",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for RejectReason {}

// =============================================================================
// Book Snapshot Types
// =============================================================================

/// A single price level in the order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price at this level.
    pub price: Price,
    /// Total quantity available at this price.
    pub quantity: Quantity,
    /// Number of orders at this level.
    pub order_count: usize,
}

/// Snapshot of the order book at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BookSnapshot {
    /// Bid levels (highest first).
    pub bids: Vec<BookLevel>,
    /// Ask levels (lowest first).
    pub asks: Vec<BookLevel>,
    /// Simulation tick.
    pub tick: Tick,
}

impl BookSnapshot {
    /// Get the best bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    /// Get the best ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Calculate the spread between best bid and ask.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Calculate the mid price.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price((bid.0 + ask.0) / 2)),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_float() {
        assert_eq!(Price::from_float(1.0), Price(10_000));
        assert_eq!(Price::from_float(1.50), Price(15_000));
        assert_eq!(Price::from_float(0.01), Price(100));
        assert_eq!(Price::from_float(100.0), Price(1_000_000));
    }

    #[test]
    fn test_price_to_float() {
        assert!((Price(10_000).to_float() - 1.0).abs() < 1e-10);
        assert!((Price(15_000).to_float() - 1.50).abs() < 1e-10);
    }

    #[test]
    fn test_price_alignment() {
        let tick = Price::from_float(0.05);
        assert!(Price::from_float(100.05).is_aligned(tick));
        assert!(Price::from_float(100.10).is_aligned(tick));
        assert!(!Price::from_float(100.03).is_aligned(tick));
        // Zero tick size never conforms
        assert!(!Price::from_float(100.0).is_aligned(Price::ZERO));
    }

    #[test]
    fn test_price_round_to_tick() {
        let tick = Price::from_float(0.05);
        assert_eq!(
            Price::from_float(100.02).round_to_tick(tick),
            Price::from_float(100.0)
        );
        assert_eq!(
            Price::from_float(100.03).round_to_tick(tick),
            Price::from_float(100.05)
        );
        assert_eq!(
            Price::from_float(100.05).round_to_tick(tick),
            Price::from_float(100.05)
        );
    }

    #[test]
    fn test_price_quantity_multiplication() {
        let price = Price::from_float(50.0);
        let quantity = Quantity(100);

        let total = price * quantity;
        assert_eq!(total.to_float(), 5000.0);
    }

    #[test]
    fn test_cash_operations() {
        let c1 = Cash::from_float(1000.0);
        let c2 = Cash::from_float(250.0);

        assert_eq!((c1 - c2).to_float(), 750.0);
        assert!(!c1.is_negative());
        assert!((c2 - c1).is_negative());
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_limit_order_creation() {
        let order = Order::limit(
            AgentId(1),
            OrderSide::Buy,
            Price::from_float(150.0),
            Quantity(100),
        );

        assert_eq!(order.agent_id, AgentId(1));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.limit_price(), Some(Price::from_float(150.0)));
        assert_eq!(order.quantity, 100);
        assert!(!order.is_filled());
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_market_order_creation() {
        let order = Order::market(AgentId(2), OrderSide::Sell, Quantity(50));

        assert_eq!(order.agent_id, AgentId(2));
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.limit_price(), None);
        assert!(!order.is_buy());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Resting.is_terminal());
        assert!(
            !OrderStatus::PartiallyFilled {
                filled: Quantity(1)
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_trade_value() {
        let trade = Trade {
            id: TradeId(1),
            tick: 7,
            price: Price::from_float(150.0),
            quantity: Quantity(100),
            buy_agent: AgentId(1),
            sell_agent: AgentId(2),
            buy_order: OrderId(1),
            sell_order: OrderId(2),
            taker_agent: AgentId(1),
            taker_side: OrderSide::Buy,
        };

        assert_eq!(trade.value().to_float(), 15000.0);
    }

    #[test]
    fn test_intent_constructors() {
        let limit = Intent::limit(OrderSide::Buy, Price::from_float(99.0), Quantity(10), 5);
        assert_eq!(limit.kind.label(), "limit");
        assert_eq!(limit.tokens_requested, 5);

        let market = Intent::market(OrderSide::Sell, Quantity(3), 1);
        assert_eq!(market.kind.label(), "market");

        let cancel = Intent::cancel(OrderId(42), 1);
        assert_eq!(cancel.kind.label(), "cancel");
    }

    #[test]
    fn test_reject_reason_codes() {
        assert_eq!(RejectReason::MessageLimit.code(), "message_limit");
        assert_eq!(RejectReason::MinRestingTime.code(), "min_resting_time");
        assert_eq!(RejectReason::TickSize.code(), "tick_size");
    }

    #[test]
    fn test_book_snapshot() {
        let snapshot = BookSnapshot {
            bids: vec![
                BookLevel {
                    price: Price::from_float(99.0),
                    quantity: Quantity(100),
                    order_count: 2,
                },
                BookLevel {
                    price: Price::from_float(98.0),
                    quantity: Quantity(200),
                    order_count: 3,
                },
            ],
            asks: vec![BookLevel {
                price: Price::from_float(101.0),
                quantity: Quantity(150),
                order_count: 1,
            }],
            tick: 0,
        };

        assert_eq!(snapshot.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(snapshot.best_ask(), Some(Price::from_float(101.0)));
        assert_eq!(snapshot.spread(), Some(Price::from_float(2.0)));
        assert_eq!(snapshot.mid_price(), Some(Price::from_float(100.0)));
    }
}
