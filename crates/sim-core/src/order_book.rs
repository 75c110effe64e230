//! Order book implementation using BTreeMap for price-time priority.
//!
//! The book maintains buy (bid) and sell (ask) orders organized by price.
//! Within each price level, orders are queued FIFO in arrival order, which
//! the latency queue has already put in `(completion_tick, creation_seq)`
//! order — an order that arrives later never jumps ahead of an earlier
//! arrival at the same price.

use std::collections::{BTreeMap, HashMap, VecDeque};

use types::{
    AgentId, BookLevel, BookSnapshot, Order, OrderId, OrderKind, OrderSide, Price, Quantity, Seq,
    Tick,
};

use crate::error::{Result, SimCoreError};

/// A price level containing orders at a single price point.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Total quantity available at this price.
    pub total_quantity: Quantity,
    /// Orders at this price, in time priority order (FIFO).
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    /// Create a new empty price level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order to the back of the queue.
    pub fn push(&mut self, order: Order) {
        self.total_quantity += order.remaining_quantity;
        self.orders.push_back(order);
    }

    /// Peek at the first order without removing it.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Check if this price level is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of orders at this price level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

/// Single-instrument limit order book with tick-size enforcement.
///
/// Uses `BTreeMap` to maintain price levels in sorted order:
/// - Bids: highest price first (iterating in reverse)
/// - Asks: lowest price first (iterating forward)
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Minimum price increment; resting prices are integer multiples.
    tick_size: Price,
    /// Buy orders indexed by price.
    bids: BTreeMap<Price, PriceLevel>,
    /// Sell orders indexed by price.
    asks: BTreeMap<Price, PriceLevel>,
    /// Quick lookup of resting orders by ID.
    order_index: HashMap<OrderId, (OrderSide, Price)>,
    /// Last trade price (valuation anchor when the book is one-sided).
    last_price: Option<Price>,
}

impl OrderBook {
    /// Create a new empty order book with the given tick size.
    pub fn new(tick_size: Price) -> Self {
        Self {
            tick_size,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            last_price: None,
        }
    }

    /// The book's tick size.
    pub fn tick_size(&self) -> Price {
        self.tick_size
    }

    /// Add a limit order to the book.
    ///
    /// Market orders never rest; the matching engine consumes them fully
    /// or cancels the remainder before this point.
    pub fn add_order(&mut self, order: Order) -> Result<()> {
        if order.remaining_quantity.is_zero() {
            return Err(SimCoreError::ZeroQuantity);
        }

        let price = match order.kind {
            OrderKind::Limit { price } => {
                if !price.is_positive() {
                    return Err(SimCoreError::InvalidPrice);
                }
                if !price.is_aligned(self.tick_size) {
                    return Err(SimCoreError::UnalignedPrice);
                }
                price
            }
            OrderKind::Market => return Err(SimCoreError::MarketOrderInBook),
        };

        self.order_index.insert(order.id, (order.side, price));

        let book_side = match order.side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };

        book_side.entry(price).or_default().push(order);

        Ok(())
    }

    /// Remove an order from the book by ID.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<Order> {
        let (side, price) = self
            .order_index
            .remove(&order_id)
            .ok_or(SimCoreError::OrderNotFound(order_id))?;

        let book_side = match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };

        if let Some(level) = book_side.get_mut(&price)
            && let Some(pos) = level.orders.iter().position(|o| o.id == order_id)
            && let Some(order) = level.orders.remove(pos)
        {
            level.total_quantity = level.total_quantity.saturating_sub(order.remaining_quantity);
            if level.is_empty() {
                book_side.remove(&price);
            }
            return Ok(order);
        }

        Err(SimCoreError::OrderNotFound(order_id))
    }

    /// Look up a resting order by ID.
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        let (side, price) = self.order_index.get(&order_id)?;
        let book_side = match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        };
        book_side
            .get(price)?
            .orders
            .iter()
            .find(|o| o.id == order_id)
    }

    /// Get the best bid (highest buy price).
    pub fn best_bid(&self) -> Option<(Price, &PriceLevel)> {
        self.bids.iter().next_back().map(|(p, l)| (*p, l))
    }

    /// Get the best ask (lowest sell price).
    pub fn best_ask(&self) -> Option<(Price, &PriceLevel)> {
        self.asks.iter().next().map(|(p, l)| (*p, l))
    }

    /// Get the best bid price.
    pub fn best_bid_price(&self) -> Option<Price> {
        self.best_bid().map(|(p, _)| p)
    }

    /// Get the best ask price.
    pub fn best_ask_price(&self) -> Option<Price> {
        self.best_ask().map(|(p, _)| p)
    }

    /// Calculate the spread between best bid and ask.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Calculate the mid price.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(Price((bid.raw() + ask.raw()) / 2)),
            _ => None,
        }
    }

    /// Peek at the best resting order on the given side.
    /// Returns (agent_id, order_id, remaining_quantity, creation_seq).
    pub fn peek_best(&self, side: OrderSide) -> Option<(AgentId, OrderId, Quantity, Seq)> {
        let front = match side {
            OrderSide::Buy => self.bids.iter().next_back().and_then(|(_, l)| l.front()),
            OrderSide::Sell => self.asks.iter().next().and_then(|(_, l)| l.front()),
        };
        front.map(|o| (o.agent_id, o.id, o.remaining_quantity, o.creation_seq))
    }

    /// Fill (reduce) the best order on `side` by the given quantity.
    /// Removes the order if fully filled and cleans up empty levels.
    pub fn fill_best(&mut self, side: OrderSide, quantity: Quantity) {
        let book_side = match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };

        let best = match side {
            OrderSide::Buy => book_side.iter_mut().next_back(),
            OrderSide::Sell => book_side.iter_mut().next(),
        };

        let mut price_to_cleanup = None;
        let mut order_to_remove = None;
        let mut should_pop = false;

        if let Some((price, level)) = best {
            let price = *price;
            if let Some(order) = level.orders.front_mut() {
                order.remaining_quantity = order.remaining_quantity.saturating_sub(quantity);
                if order.remaining_quantity.is_zero() {
                    order_to_remove = Some(order.id);
                    should_pop = true;
                }
            }
            level.total_quantity = level.total_quantity.saturating_sub(quantity);

            if should_pop {
                level.orders.pop_front();
            }
            if level.is_empty() {
                price_to_cleanup = Some(price);
            }
        }

        if let Some(order_id) = order_to_remove {
            self.order_index.remove(&order_id);
        }
        if let Some(price) = price_to_cleanup {
            match side {
                OrderSide::Buy => self.bids.remove(&price),
                OrderSide::Sell => self.asks.remove(&price),
            };
        }
    }

    /// Check whether `order` would cross a resting order from the same agent.
    ///
    /// Walks the opposite side from the best price while the incoming order
    /// still crosses.
    pub fn crosses_own(&self, order: &Order) -> bool {
        let limit = order.limit_price();
        match order.side {
            OrderSide::Buy => self
                .asks
                .iter()
                .take_while(|(price, _)| limit.is_none_or(|l| **price <= l))
                .any(|(_, level)| level.orders.iter().any(|o| o.agent_id == order.agent_id)),
            OrderSide::Sell => self
                .bids
                .iter()
                .rev()
                .take_while(|(price, _)| limit.is_none_or(|l| **price >= l))
                .any(|(_, level)| level.orders.iter().any(|o| o.agent_id == order.agent_id)),
        }
    }

    /// Update the last traded price.
    pub fn set_last_price(&mut self, price: Price) {
        self.last_price = Some(price);
    }

    /// Get the last traded price.
    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    /// Quantity resting at the best level of `side`, if any.
    pub fn depth_at_best(&self, side: OrderSide) -> Option<Quantity> {
        match side {
            OrderSide::Buy => self.best_bid().map(|(_, l)| l.total_quantity),
            OrderSide::Sell => self.best_ask().map(|(_, l)| l.total_quantity),
        }
    }

    /// Get total bid depth (volume) up to N levels.
    pub fn bid_depth(&self, levels: usize) -> Quantity {
        self.bids
            .iter()
            .rev()
            .take(levels)
            .map(|(_, l)| l.total_quantity)
            .sum()
    }

    /// Get total ask depth (volume) up to N levels.
    pub fn ask_depth(&self, levels: usize) -> Quantity {
        self.asks
            .iter()
            .take(levels)
            .map(|(_, l)| l.total_quantity)
            .sum()
    }

    /// Check if the book has any orders.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Number of price levels on the bid side.
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of price levels on the ask side.
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Total number of orders in the book.
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// Remove and return every resting order, emptying the book.
    ///
    /// Used by the batch auction, which re-clears resting and buffered
    /// orders together. Orders keep their creation sequence, so priority
    /// survives the round trip.
    pub fn drain_all(&mut self) -> Vec<Order> {
        let mut orders = Vec::with_capacity(self.order_index.len());
        for (_, level) in std::mem::take(&mut self.bids) {
            orders.extend(level.orders);
        }
        for (_, level) in std::mem::take(&mut self.asks) {
            orders.extend(level.orders);
        }
        self.order_index.clear();
        orders
    }

    /// Get a snapshot of the current book state.
    pub fn snapshot(&self, tick: Tick, depth: usize) -> BookSnapshot {
        let bids: Vec<BookLevel> = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.total_quantity,
                order_count: level.order_count(),
            })
            .collect();

        let asks: Vec<BookLevel> = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.total_quantity,
                order_count: level.order_count(),
            })
            .collect();

        BookSnapshot { bids, asks, tick }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::AgentId;

    fn book() -> OrderBook {
        OrderBook::new(Price::from_float(0.01))
    }

    fn make_limit_order(
        id: u64,
        agent_id: u64,
        side: OrderSide,
        price: f64,
        quantity: u64,
    ) -> Order {
        let mut order = Order::limit(
            AgentId(agent_id),
            side,
            Price::from_float(price),
            Quantity(quantity),
        );
        order.id = OrderId(id);
        order.creation_seq = id;
        order
    }

    #[test]
    fn test_new_order_book() {
        let book = book();
        assert!(book.is_empty());
        assert_eq!(book.best_bid_price(), None);
        assert_eq!(book.best_ask_price(), None);
    }

    #[test]
    fn test_add_buy_order() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 100.0, 50))
            .unwrap();

        assert!(!book.is_empty());
        assert_eq!(book.best_bid_price(), Some(Price::from_float(100.0)));
        assert_eq!(book.best_ask_price(), None);
        assert_eq!(book.bid_depth(10), 50);
    }

    #[test]
    fn test_multiple_price_levels() {
        let mut book = book();

        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 99.0, 100))
            .unwrap();
        book.add_order(make_limit_order(2, 1, OrderSide::Buy, 100.0, 50))
            .unwrap();
        book.add_order(make_limit_order(3, 1, OrderSide::Buy, 98.0, 200))
            .unwrap();

        assert_eq!(book.best_bid_price(), Some(Price::from_float(100.0)));
        assert_eq!(book.bid_levels(), 3);

        book.add_order(make_limit_order(4, 2, OrderSide::Sell, 102.0, 150))
            .unwrap();
        book.add_order(make_limit_order(5, 2, OrderSide::Sell, 101.0, 75))
            .unwrap();

        assert_eq!(book.best_ask_price(), Some(Price::from_float(101.0)));
        assert_eq!(book.ask_levels(), 2);
    }

    #[test]
    fn test_time_priority_same_price() {
        let mut book = book();

        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 100.0, 50))
            .unwrap();
        book.add_order(make_limit_order(2, 2, OrderSide::Buy, 100.0, 75))
            .unwrap();
        book.add_order(make_limit_order(3, 3, OrderSide::Buy, 100.0, 25))
            .unwrap();

        let (_, level) = book.best_bid().unwrap();
        assert_eq!(level.front().unwrap().id, OrderId(1));
        assert_eq!(level.total_quantity, 150);
        assert_eq!(level.order_count(), 3);
    }

    #[test]
    fn test_cancel_order() {
        let mut book = book();

        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 100.0, 50))
            .unwrap();
        book.add_order(make_limit_order(2, 1, OrderSide::Buy, 100.0, 75))
            .unwrap();

        let cancelled = book.cancel_order(OrderId(1)).unwrap();
        assert_eq!(cancelled.id, OrderId(1));

        let (_, level) = book.best_bid().unwrap();
        assert_eq!(level.front().unwrap().id, OrderId(2));
        assert_eq!(level.total_quantity, 75);
    }

    #[test]
    fn test_cancel_nonexistent_order() {
        let mut book = book();
        let result = book.cancel_order(OrderId(999));
        assert!(matches!(result, Err(SimCoreError::OrderNotFound(_))));
    }

    #[test]
    fn test_cancel_removes_empty_level() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 100.0, 50))
            .unwrap();
        assert_eq!(book.bid_levels(), 1);

        book.cancel_order(OrderId(1)).unwrap();
        assert_eq!(book.bid_levels(), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_order_lookup() {
        let mut book = book();
        book.add_order(make_limit_order(7, 3, OrderSide::Sell, 101.0, 20))
            .unwrap();

        let order = book.order(OrderId(7)).unwrap();
        assert_eq!(order.agent_id, AgentId(3));
        assert_eq!(order.remaining_quantity, 20);
        assert!(book.order(OrderId(8)).is_none());
    }

    #[test]
    fn test_fill_best_reduces_and_removes() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Sell, 100.0, 30))
            .unwrap();
        book.add_order(make_limit_order(2, 2, OrderSide::Sell, 100.0, 30))
            .unwrap();

        book.fill_best(OrderSide::Sell, Quantity(10));
        let (agent, id, qty, _) = book.peek_best(OrderSide::Sell).unwrap();
        assert_eq!((agent, id, qty), (AgentId(1), OrderId(1), Quantity(20)));

        book.fill_best(OrderSide::Sell, Quantity(20));
        let (agent, ..) = book.peek_best(OrderSide::Sell).unwrap();
        assert_eq!(agent, AgentId(2));
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn test_spread_and_mid() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 99.0, 100))
            .unwrap();
        book.add_order(make_limit_order(2, 2, OrderSide::Sell, 101.0, 100))
            .unwrap();

        assert_eq!(book.spread(), Some(Price::from_float(2.0)));
        assert_eq!(book.mid_price(), Some(Price::from_float(100.0)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut book = book();
        let mut order = make_limit_order(1, 1, OrderSide::Buy, 100.0, 10);
        order.remaining_quantity = Quantity::ZERO;

        assert!(matches!(
            book.add_order(order),
            Err(SimCoreError::ZeroQuantity)
        ));
    }

    #[test]
    fn test_invalid_price_rejected() {
        let mut book = book();
        let order = make_limit_order(1, 1, OrderSide::Buy, 0.0, 100);
        assert!(matches!(
            book.add_order(order),
            Err(SimCoreError::InvalidPrice)
        ));
    }

    #[test]
    fn test_unaligned_price_rejected() {
        let mut book = OrderBook::new(Price::from_float(0.05));
        let order = make_limit_order(1, 1, OrderSide::Buy, 100.03, 100);
        assert!(matches!(
            book.add_order(order),
            Err(SimCoreError::UnalignedPrice)
        ));
    }

    #[test]
    fn test_market_order_never_rests() {
        let mut book = book();
        let mut order = Order::market(AgentId(1), OrderSide::Buy, Quantity(10));
        order.id = OrderId(1);
        assert!(matches!(
            book.add_order(order),
            Err(SimCoreError::MarketOrderInBook)
        ));
    }

    #[test]
    fn test_crosses_own() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Sell, 100.0, 10))
            .unwrap();
        book.add_order(make_limit_order(2, 2, OrderSide::Sell, 101.0, 10))
            .unwrap();

        // Agent 1's buy at 100 would cross its own ask
        let own = make_limit_order(3, 1, OrderSide::Buy, 100.0, 5);
        assert!(book.crosses_own(&own));

        // Agent 2's ask is beyond the limit, so agent 2 does not self-cross
        let other = make_limit_order(4, 2, OrderSide::Buy, 100.0, 5);
        assert!(!book.crosses_own(&other));

        // A market order scans every crossing level
        let mut market = Order::market(AgentId(2), OrderSide::Buy, Quantity(5));
        market.id = OrderId(5);
        assert!(book.crosses_own(&market));
    }

    #[test]
    fn test_drain_all_empties_book() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 99.0, 10))
            .unwrap();
        book.add_order(make_limit_order(2, 2, OrderSide::Sell, 101.0, 20))
            .unwrap();

        let orders = book.drain_all();
        assert_eq!(orders.len(), 2);
        assert!(book.is_empty());
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_snapshot() {
        let mut book = book();
        book.add_order(make_limit_order(1, 1, OrderSide::Buy, 99.0, 100))
            .unwrap();
        book.add_order(make_limit_order(2, 1, OrderSide::Buy, 98.0, 200))
            .unwrap();
        book.add_order(make_limit_order(3, 2, OrderSide::Sell, 101.0, 150))
            .unwrap();

        let snapshot = book.snapshot(5, 10);
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.asks.len(), 1);
        assert_eq!(snapshot.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(snapshot.best_ask(), Some(Price::from_float(101.0)));
        assert_eq!(snapshot.tick, 5);
    }
}
