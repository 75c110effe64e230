//! Matching engine implementing price-time priority (continuous mode).
//!
//! The matching engine processes arrivals released by the latency queue
//! against the order book, executing trades at the resting order's price.
//! Within a price level, resting orders fill FIFO by arrival.

use types::{Order, OrderSide, OrderStatus, Price, Quantity, Tick, Trade, TradeId};

use crate::order_book::OrderBook;

/// Result of attempting to match an order.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Trades that occurred during matching.
    pub trades: Vec<Trade>,
    /// Updated status of the incoming order.
    pub status: OrderStatus,
    /// Remaining quantity of the incoming order (if any).
    pub remaining_quantity: Quantity,
}

impl MatchResult {
    /// Check if any trades occurred.
    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }

    /// Total quantity filled.
    pub fn filled_quantity(&self) -> Quantity {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}

/// Matching engine for executing orders against an order book.
///
/// Implements price-time priority matching:
/// - Buy orders match against the lowest ask prices first
/// - Sell orders match against the highest bid prices first
/// - Within a price level, orders are matched in FIFO order
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    /// Counter for generating unique trade IDs.
    next_trade_id: u64,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Create a new matching engine.
    pub fn new() -> Self {
        Self { next_trade_id: 1 }
    }

    /// Generate the next trade ID.
    fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId(self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    /// Process an incoming order against the order book.
    ///
    /// Repeatedly matches against the best opposite-side level while a
    /// cross exists and quantity remains. The incoming order is the taker;
    /// every trade executes at the resting order's price.
    ///
    /// Note: this does NOT add unfilled limit remainders to the book and
    /// does not touch accounts. The caller rests or cancels the remainder
    /// and settles the trades.
    pub fn match_order(&mut self, book: &mut OrderBook, order: &mut Order, tick: Tick) -> MatchResult {
        let mut result = MatchResult {
            trades: Vec::new(),
            status: order.status,
            remaining_quantity: order.remaining_quantity,
        };

        let opposite = order.side.opposite();
        let limit_price = order.limit_price();

        while !result.remaining_quantity.is_zero() {
            let best_price = match opposite {
                OrderSide::Sell => book.best_ask_price(),
                OrderSide::Buy => book.best_bid_price(),
            };
            let Some(resting_price) = best_price else {
                break; // Opposite side exhausted
            };

            if !crosses(order.side, limit_price, resting_price) {
                break;
            }

            let Some((resting_agent, resting_order_id, resting_qty, _)) = book.peek_best(opposite)
            else {
                break;
            };

            let trade_quantity = result.remaining_quantity.min(resting_qty);
            let trade = build_trade(
                self.next_trade_id(),
                tick,
                resting_price,
                trade_quantity,
                order,
                resting_agent,
                resting_order_id,
            );

            result.trades.push(trade);
            result.remaining_quantity -= trade_quantity;

            book.fill_best(opposite, trade_quantity);
            book.set_last_price(resting_price);
        }

        // Update order status based on remaining quantity
        if result.remaining_quantity.is_zero() {
            result.status = OrderStatus::Filled;
        } else if result.remaining_quantity < order.quantity {
            result.status = OrderStatus::PartiallyFilled {
                filled: order.quantity - result.remaining_quantity,
            };
        }
        order.status = result.status;
        order.remaining_quantity = result.remaining_quantity;

        result
    }

    /// Check if an incoming order would match (without executing).
    pub fn would_match(&self, book: &OrderBook, order: &Order) -> bool {
        let best = match order.side {
            OrderSide::Buy => book.best_ask_price(),
            OrderSide::Sell => book.best_bid_price(),
        };
        best.is_some_and(|price| crosses(order.side, order.limit_price(), price))
    }
}

/// Does an incoming order with this limit cross a resting price?
fn crosses(taker_side: OrderSide, limit: Option<Price>, resting_price: Price) -> bool {
    match (taker_side, limit) {
        (_, None) => true, // Market orders have no price limit
        (OrderSide::Buy, Some(limit)) => resting_price <= limit,
        (OrderSide::Sell, Some(limit)) => resting_price >= limit,
    }
}

fn build_trade(
    id: TradeId,
    tick: Tick,
    price: Price,
    quantity: Quantity,
    taker: &Order,
    resting_agent: types::AgentId,
    resting_order_id: types::OrderId,
) -> Trade {
    let (buy_agent, sell_agent, buy_order, sell_order) = match taker.side {
        OrderSide::Buy => (taker.agent_id, resting_agent, taker.id, resting_order_id),
        OrderSide::Sell => (resting_agent, taker.agent_id, resting_order_id, taker.id),
    };
    Trade {
        id,
        tick,
        price,
        quantity,
        buy_agent,
        sell_agent,
        buy_order,
        sell_order,
        taker_agent: taker.agent_id,
        taker_side: taker.side,
    }
}
