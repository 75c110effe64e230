//! Uniform-price batch auction (periodic matching mode).
//!
//! Unlike continuous matching, where orders execute as they arrive, a batch
//! auction collects every order in a window and clears all crossing orders
//! at one price. Latency-based arrival advantage *within* a window is
//! removed by construction.
//!
//! # Clearing Price Algorithm
//!
//! The clearing price maximizes executed volume:
//! - Candidate prices are the limit prices present (plus the reference price)
//! - For each candidate, executable volume = min(demand at price, supply at price)
//! - When several candidates tie at maximal volume, the configured
//!   [`ClearingTieBreak`] picks between the midpoint of the maximal-volume
//!   interval (rounded to the nearest tick) and the reference price
//!
//! # Fill Allocation
//!
//! All trades execute at the clearing price. When volume is insufficient to
//! fill every crossing order, fills are allocated within each side strictly
//! by ascending creation sequence (earliest decision first), not by size or
//! limit price.

use types::{Order, OrderKind, OrderSide, OrderStatus, Price, Quantity, Tick, Trade, TradeId};

use crate::config::ClearingTieBreak;

/// Result of one batch auction window.
#[derive(Debug, Clone, Default)]
pub struct AuctionOutcome {
    /// The uniform clearing price (None if no trades occurred).
    pub clearing_price: Option<Price>,
    /// All trades, each executed at the clearing price.
    pub trades: Vec<Trade>,
    /// Limit orders with remaining quantity, in creation-sequence order,
    /// ready to rest in the book.
    pub resting: Vec<Order>,
    /// Market orders with remaining quantity (market remainders never rest).
    pub cancelled: Vec<Order>,
}

impl AuctionOutcome {
    /// Check if any trades occurred.
    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }

    /// Total quantity traded.
    pub fn traded_volume(&self) -> Quantity {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}

/// Batch auction engine.
#[derive(Debug, Clone)]
pub struct BatchAuction {
    /// Counter for generating unique trade IDs.
    next_trade_id: u64,
    /// Tie-break policy for the clearing price.
    tie_break: ClearingTieBreak,
    /// Tick size used to round midpoint clearing prices.
    tick_size: Price,
}

impl BatchAuction {
    /// Create a new batch auction engine.
    pub fn new(tie_break: ClearingTieBreak, tick_size: Price) -> Self {
        Self {
            next_trade_id: 1,
            tie_break,
            tick_size,
        }
    }

    /// Generate the next trade ID.
    fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId(self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    /// Clear one window of orders.
    ///
    /// `orders` holds the window's buffered arrivals together with the
    /// orders previously resting in the book; `reference_price` anchors
    /// market orders (typically the last trade price).
    pub fn run(
        &mut self,
        orders: Vec<Order>,
        tick: Tick,
        reference_price: Option<Price>,
    ) -> AuctionOutcome {
        if orders.is_empty() {
            return AuctionOutcome::default();
        }

        let (mut bids, mut asks): (Vec<_>, Vec<_>) =
            orders.into_iter().partition(|o| o.side == OrderSide::Buy);

        // Earliest decision first within each side
        bids.sort_by_key(|o| o.creation_seq);
        asks.sort_by_key(|o| o.creation_seq);

        let clearing_price = if bids.is_empty() || asks.is_empty() {
            None
        } else {
            self.compute_clearing_price(&bids, &asks, reference_price)
        };

        let Some(price) = clearing_price else {
            return self.no_trade_outcome(bids, asks);
        };

        let trades = self.match_at_price(&mut bids, &mut asks, price, tick);
        let mut outcome = self.collect_remainders(bids, asks);
        outcome.clearing_price = Some(price);
        outcome.trades = trades;
        outcome
    }

    /// Compute the volume-maximizing clearing price.
    fn compute_clearing_price(
        &self,
        bids: &[Order],
        asks: &[Order],
        reference_price: Option<Price>,
    ) -> Option<Price> {
        let mut candidates: Vec<Price> = bids
            .iter()
            .chain(asks.iter())
            .filter_map(|o| o.limit_price())
            .collect();

        // The reference price anchors all-market-order windows; without it
        // the clearing price could jump to an arbitrary extreme.
        if let Some(ref_price) = reference_price {
            candidates.push(ref_price);
        }

        if candidates.is_empty() {
            return None;
        }

        candidates.sort();
        candidates.dedup();

        let mut best_volume = Quantity::ZERO;
        let mut best_prices: Vec<Price> = Vec::new();

        for &price in &candidates {
            let demand: Quantity = bids
                .iter()
                .filter(|b| bid_crosses(b, price))
                .map(|b| b.remaining_quantity)
                .sum();
            let supply: Quantity = asks
                .iter()
                .filter(|a| ask_crosses(a, price))
                .map(|a| a.remaining_quantity)
                .sum();

            let volume = demand.min(supply);

            if volume > best_volume {
                best_volume = volume;
                best_prices.clear();
                best_prices.push(price);
            } else if volume == best_volume && !volume.is_zero() {
                best_prices.push(price);
            }
        }

        if best_volume.is_zero() || best_prices.is_empty() {
            return None;
        }
        if best_prices.len() == 1 {
            return Some(best_prices[0]);
        }

        match self.tie_break {
            ClearingTieBreak::ReferencePrice => {
                if let Some(ref_price) = reference_price
                    && best_prices.contains(&ref_price)
                {
                    Some(ref_price)
                } else {
                    Some(self.interval_midpoint(&best_prices))
                }
            }
            ClearingTieBreak::MidpointNearestTick => Some(self.interval_midpoint(&best_prices)),
        }
    }

    /// Midpoint of the maximal-volume interval, rounded to the nearest tick.
    fn interval_midpoint(&self, best_prices: &[Price]) -> Price {
        let low = best_prices[0];
        let high = best_prices[best_prices.len() - 1];
        Price((low.raw() + high.raw()) / 2).round_to_tick(self.tick_size)
    }

    /// Match crossing orders pairwise at the clearing price.
    ///
    /// Both sides are already in creation-sequence order; volume runs out
    /// on one side before the other, so later sequences on the long side
    /// go unfilled.
    fn match_at_price(
        &mut self,
        bids: &mut [Order],
        asks: &mut [Order],
        clearing_price: Price,
        tick: Tick,
    ) -> Vec<Trade> {
        let mut trades = Vec::new();

        let crossing_bids: Vec<usize> = (0..bids.len())
            .filter(|&i| bid_crosses(&bids[i], clearing_price))
            .collect();
        let crossing_asks: Vec<usize> = (0..asks.len())
            .filter(|&i| ask_crosses(&asks[i], clearing_price))
            .collect();

        let mut bi = 0;
        let mut ai = 0;
        while bi < crossing_bids.len() && ai < crossing_asks.len() {
            let bid = &bids[crossing_bids[bi]];
            let ask = &asks[crossing_asks[ai]];

            let trade_qty = bid.remaining_quantity.min(ask.remaining_quantity);
            if trade_qty.is_zero() {
                break;
            }

            // The later decision of the pair is recorded as the taker.
            let (taker_agent, taker_side) = if bid.creation_seq > ask.creation_seq {
                (bid.agent_id, OrderSide::Buy)
            } else {
                (ask.agent_id, OrderSide::Sell)
            };

            trades.push(Trade {
                id: self.next_trade_id(),
                tick,
                price: clearing_price,
                quantity: trade_qty,
                buy_agent: bid.agent_id,
                sell_agent: ask.agent_id,
                buy_order: bid.id,
                sell_order: ask.id,
                taker_agent,
                taker_side,
            });

            let bid = &mut bids[crossing_bids[bi]];
            bid.remaining_quantity -= trade_qty;
            fill_status(bid);
            if bid.remaining_quantity.is_zero() {
                bi += 1;
            }

            let ask = &mut asks[crossing_asks[ai]];
            ask.remaining_quantity -= trade_qty;
            fill_status(ask);
            if ask.remaining_quantity.is_zero() {
                ai += 1;
            }
        }

        trades
    }

    fn no_trade_outcome(&self, bids: Vec<Order>, asks: Vec<Order>) -> AuctionOutcome {
        self.collect_remainders(bids, asks)
    }

    /// Split leftover quantity into resting limit orders and cancelled
    /// market remainders, in creation-sequence order.
    fn collect_remainders(&self, bids: Vec<Order>, asks: Vec<Order>) -> AuctionOutcome {
        let mut resting = Vec::new();
        let mut cancelled = Vec::new();

        for mut order in bids.into_iter().chain(asks) {
            if order.remaining_quantity.is_zero() {
                continue;
            }
            match order.kind {
                OrderKind::Limit { .. } => resting.push(order),
                OrderKind::Market => {
                    order.status = OrderStatus::Cancelled;
                    cancelled.push(order);
                }
            }
        }

        resting.sort_by_key(|o| o.creation_seq);
        cancelled.sort_by_key(|o| o.creation_seq);

        AuctionOutcome {
            clearing_price: None,
            trades: Vec::new(),
            resting,
            cancelled,
        }
    }
}

/// Check if a bid is willing to trade at the given price.
fn bid_crosses(bid: &Order, price: Price) -> bool {
    match bid.kind {
        OrderKind::Market => true,
        OrderKind::Limit { price: limit } => limit >= price,
    }
}

/// Check if an ask is willing to trade at the given price.
fn ask_crosses(ask: &Order, price: Price) -> bool {
    match ask.kind {
        OrderKind::Market => true,
        OrderKind::Limit { price: limit } => limit <= price,
    }
}

fn fill_status(order: &mut Order) {
    if order.remaining_quantity.is_zero() {
        order.status = OrderStatus::Filled;
    } else {
        order.status = OrderStatus::PartiallyFilled {
            filled: order.quantity - order.remaining_quantity,
        };
    }
}
