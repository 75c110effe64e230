//! The market simulation context.
//!
//! A [`Market`] owns every piece of mutable run state — order book, agent
//! accounts, compute budgets, the latency queue, policy counters and the
//! batch buffer — and applies all mutation sequentially within a tick.
//! There are no ambient globals: independent markets can run side by side
//! (e.g. parallel sweep workers) without cross-talk.
//!
//! # Tick cycle
//!
//! ```ignore
//! market.begin_tick();          // refill budgets, reset message counters
//! // agents submit intents, once per agent
//! let record = market.step();   // advance the clock, apply due arrivals
//! ```
//!
//! Submissions are *decisions*; their effects land at the arrival tick the
//! compute layer derives. `step()` advances the clock by one tick, releases
//! everything due from the latency queue in deterministic order, matches
//! (continuously, or into the batch buffer), and emits exactly one step
//! record.

use std::collections::HashMap;

use tracing::debug;
use types::{
    AgentId, CancelRequest, Cash, Intent, IntentKind, IntentReceipt, Order, OrderId, OrderKind,
    OrderSide, OrderStatus, Price, Quantity, RejectReason, Seq, Tick, Trade,
};

use crate::accounts::AgentAccount;
use crate::admission::PolicyEnforcer;
use crate::batch_auction::BatchAuction;
use crate::compute::{AgentCompute, ComputeBudget, LatencyModel};
use crate::config::{MarketConfig, SelfTradePolicy};
use crate::error::{Result, SimCoreError};
use crate::events::{AgentEvent, AgentRecord, RunMeta, SharedSink, StepRecord};
use crate::latency_queue::{LatencyQueue, QueueEntry, QueuedAction};
use crate::matching::MatchingEngine;
use crate::order_book::OrderBook;

/// What a submission returns: a receipt, or the policy's reason for refusal.
pub type SubmitResult = std::result::Result<IntentReceipt, RejectReason>;

/// Observable market state handed to decision policies.
///
/// A value snapshot: policies never hold references into the market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketObs {
    /// Current tick.
    pub tick: Tick,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub mid: Option<Price>,
    pub spread: Option<Price>,
    pub last_trade: Option<Price>,
    /// Quantity at the best bid level.
    pub depth1_bid: Option<Quantity>,
    /// Quantity at the best ask level.
    pub depth1_ask: Option<Quantity>,
    /// The observing agent's cash.
    pub cash: Cash,
    /// The observing agent's inventory.
    pub inventory: i64,
    /// The observing agent's current token balance.
    pub tokens_remaining: u64,
}

/// Decision logic boundary.
///
/// The core consumes intents and never inspects policy internals; trading
/// strategies live behind this trait in external crates (and in tests).
pub trait DecisionPolicy {
    /// The agent this policy trades as.
    fn agent_id(&self) -> AgentId;

    /// Produce at most one intent for this tick.
    fn decide(&mut self, obs: &MarketObs) -> Option<Intent>;
}

/// The simulation context.
pub struct Market {
    cfg: MarketConfig,
    seed: u64,
    book: OrderBook,
    engine: MatchingEngine,
    auction: BatchAuction,
    accounts: HashMap<AgentId, AgentAccount>,
    compute: HashMap<AgentId, AgentCompute>,
    queue: LatencyQueue,
    enforcer: PolicyEnforcer,
    /// Arrivals buffered within the current batch window, in arrival order.
    batch_orders: Vec<Order>,
    batch_cancels: Vec<CancelRequest>,
    /// Registration order; fixes refill iteration and run-meta listing.
    agent_order: Vec<AgentId>,
    sinks: Vec<SharedSink>,
    t: Tick,
    next_order_id: u64,
    next_seq: Seq,
    messages_this_tick: u64,
    trades_this_tick: u64,
    volume_this_tick: Quantity,
}

impl Market {
    /// Create a market with the given configuration and run seed.
    pub fn new(cfg: MarketConfig, seed: u64) -> Self {
        let book = OrderBook::new(cfg.tick_size);
        let auction = BatchAuction::new(cfg.clearing_tie_break, cfg.tick_size);
        Self {
            cfg,
            seed,
            book,
            engine: MatchingEngine::new(),
            auction,
            accounts: HashMap::new(),
            compute: HashMap::new(),
            queue: LatencyQueue::new(),
            enforcer: PolicyEnforcer::new(),
            batch_orders: Vec::new(),
            batch_cancels: Vec::new(),
            agent_order: Vec::new(),
            sinks: Vec::new(),
            t: 0,
            next_order_id: 1,
            next_seq: 1,
            messages_this_tick: 0,
            trades_this_tick: 0,
            volume_this_tick: Quantity::ZERO,
        }
    }

    /// The market configuration.
    pub fn config(&self) -> &MarketConfig {
        &self.cfg
    }

    /// Current tick.
    pub fn tick(&self) -> Tick {
        self.t
    }

    /// Read-only view of the order book.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Number of intents still in flight.
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// An agent's account, if registered.
    pub fn account(&self, agent: AgentId) -> Option<&AgentAccount> {
        self.accounts.get(&agent)
    }

    /// An agent's current token balance, if registered.
    pub fn tokens_remaining(&self, agent: AgentId) -> Option<u64> {
        self.compute.get(&agent).map(|c| c.tokens())
    }

    /// Register an agent with a zeroed account and the default compute
    /// model. Registering twice is a no-op.
    pub fn register_agent(&mut self, agent: AgentId) {
        if self.accounts.contains_key(&agent) {
            return;
        }
        let latency = LatencyModel {
            base_ms: self.cfg.base_ms,
            ms_per_token: self.cfg.ms_per_token,
            jitter: self.cfg.jitter,
        };
        self.accounts.insert(agent, AgentAccount::default());
        self.compute.insert(
            agent,
            AgentCompute::new(ComputeBudget::default(), latency, self.agent_seed(agent)),
        );
        self.agent_order.push(agent);
    }

    /// Replace an agent's compute budget and latency model.
    ///
    /// Restarts the agent's private jitter stream from its seed.
    pub fn set_agent_compute(
        &mut self,
        agent: AgentId,
        budget: ComputeBudget,
        latency: LatencyModel,
    ) -> Result<()> {
        if !self.compute.contains_key(&agent) {
            return Err(SimCoreError::UnknownAgent(agent));
        }
        self.compute.insert(
            agent,
            AgentCompute::new(budget, latency, self.agent_seed(agent)),
        );
        Ok(())
    }

    /// Attach an event sink.
    pub fn add_sink(&mut self, sink: SharedSink) {
        self.sinks.push(sink);
    }

    /// Emit the run-start record to every sink.
    pub fn begin_run(&self) {
        let meta = RunMeta {
            seed: self.seed,
            config: self.cfg.clone(),
            agents: self.agent_order.clone(),
        };
        for sink in &self.sinks {
            sink.on_run_start(&meta);
        }
    }

    /// Emit the run-end notification to every sink.
    pub fn finish_run(&self) {
        for sink in &self.sinks {
            sink.on_run_end();
        }
    }

    /// Start a new tick: refill every budget, reset message counters.
    ///
    /// Refill happens before any `submit` call of the tick, saturating at
    /// each bucket's capacity.
    pub fn begin_tick(&mut self) {
        for agent in &self.agent_order {
            if let Some(compute) = self.compute.get_mut(agent) {
                compute.refill();
            }
        }
        self.enforcer.reset_tick();
    }

    /// Snapshot the market as seen by one agent.
    ///
    /// # Panics
    /// Panics if the agent was never registered.
    pub fn observe(&self, agent: AgentId) -> MarketObs {
        let account = self.lookup_account(agent);
        let tokens = self
            .tokens_remaining(agent)
            .unwrap_or_else(|| panic!("unknown agent {agent}"));
        MarketObs {
            tick: self.t,
            best_bid: self.book.best_bid_price(),
            best_ask: self.book.best_ask_price(),
            mid: self.book.mid_price(),
            spread: self.book.spread(),
            last_trade: self.book.last_price(),
            depth1_bid: self.book.depth_at_best(OrderSide::Buy),
            depth1_ask: self.book.depth_at_best(OrderSide::Sell),
            cash: account.cash,
            inventory: account.inventory,
            tokens_remaining: tokens,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────

    /// Submit one intent for this tick.
    ///
    /// Applies policy in order: shape validation, message limit, token
    /// charge, latency floor. Admitted intents are charged the message fee
    /// and scheduled on the latency queue; the receipt is returned
    /// synchronously. Rejected intents charge nothing and mutate nothing.
    ///
    /// # Panics
    /// Panics if the agent was never registered.
    pub fn submit(&mut self, agent: AgentId, intent: Intent) -> SubmitResult {
        assert!(
            self.accounts.contains_key(&agent),
            "unknown agent {agent} submitted an intent"
        );

        if let Err(reason) = self.validate_intent(&intent) {
            self.emit_reject(agent, intent.kind.label(), reason);
            return Err(reason);
        }

        if !self.enforcer.admit_message(&self.cfg, agent) {
            self.emit_reject(agent, intent.kind.label(), RejectReason::MessageLimit);
            return Err(RejectReason::MessageLimit);
        }

        let compute = self
            .compute
            .get_mut(&agent)
            .unwrap_or_else(|| panic!("unknown agent {agent}"));
        let charge = compute.charge(intent.tokens_requested);
        let latency_ms =
            PolicyEnforcer::floor_latency(&self.cfg, compute.latency_ms(charge.used));
        let arrival_tick = PolicyEnforcer::arrival_tick(&self.cfg, self.t, latency_ms);

        if self.cfg.per_message_fee != Cash::ZERO {
            let fee = self.cfg.per_message_fee;
            self.account_mut(agent).cash -= fee;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let (order_id, side, px, qty, target) = match intent.kind {
            IntentKind::Limit { side, price, qty } => {
                let mut order = Order::limit(agent, side, price, qty);
                order.id = self.alloc_order_id();
                order.creation_tick = self.t;
                order.creation_seq = seq;
                let id = order.id;
                self.queue.push(QueueEntry::order(arrival_tick, order));
                (Some(id), Some(side), Some(price), Some(qty), None)
            }
            IntentKind::Market { side, qty } => {
                let mut order = Order::market(agent, side, qty);
                order.id = self.alloc_order_id();
                order.creation_tick = self.t;
                order.creation_seq = seq;
                let id = order.id;
                self.queue.push(QueueEntry::order(arrival_tick, order));
                (Some(id), Some(side), None, Some(qty), None)
            }
            IntentKind::Cancel { order_id } => {
                self.queue.push(QueueEntry::cancel(
                    arrival_tick,
                    CancelRequest {
                        agent_id: agent,
                        order_id,
                        creation_tick: self.t,
                        creation_seq: seq,
                    },
                ));
                (None, None, None, None, Some(order_id))
            }
        };

        self.messages_this_tick += 1;
        self.emit_agent(
            agent,
            AgentEvent::Intent {
                intent: intent.kind.label().to_string(),
                side,
                px,
                qty,
                target,
                tokens_requested: intent.tokens_requested,
                tokens_used: charge.used,
                degraded: charge.degraded,
                latency_ms,
                arrival_tick,
            },
        );

        Ok(IntentReceipt {
            tokens_used: charge.used,
            tokens_remaining: charge.remaining,
            degraded: charge.degraded,
            latency_ms,
            arrival_tick,
            order_id,
        })
    }

    /// Submit a limit-order intent.
    pub fn submit_limit(
        &mut self,
        agent: AgentId,
        side: OrderSide,
        price: Price,
        qty: Quantity,
        tokens: u64,
    ) -> SubmitResult {
        self.submit(agent, Intent::limit(side, price, qty, tokens))
    }

    /// Submit a market-order intent.
    pub fn submit_market(
        &mut self,
        agent: AgentId,
        side: OrderSide,
        qty: Quantity,
        tokens: u64,
    ) -> SubmitResult {
        self.submit(agent, Intent::market(side, qty, tokens))
    }

    /// Submit a cancel intent.
    pub fn submit_cancel(&mut self, agent: AgentId, order_id: OrderId, tokens: u64) -> SubmitResult {
        self.submit(agent, Intent::cancel(order_id, tokens))
    }

    fn validate_intent(&self, intent: &Intent) -> std::result::Result<(), RejectReason> {
        match intent.kind {
            IntentKind::Limit { price, qty, .. } => {
                if qty.is_zero() {
                    return Err(RejectReason::InvalidQuantity);
                }
                if !price.is_positive() {
                    return Err(RejectReason::InvalidPrice);
                }
                if !price.is_aligned(self.cfg.tick_size) {
                    return Err(RejectReason::TickSize);
                }
            }
            IntentKind::Market { qty, .. } => {
                if qty.is_zero() {
                    return Err(RejectReason::InvalidQuantity);
                }
            }
            IntentKind::Cancel { .. } => {}
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tick processing
    // ─────────────────────────────────────────────────────────────────────

    /// Advance the clock one tick and apply everything due.
    ///
    /// In batch mode the window closing at this tick (if any) clears
    /// *before* this tick's arrivals are released, so an arrival landing
    /// exactly on a boundary joins the next window — windows are
    /// half-open `[k·I, (k+1)·I)`.
    pub fn step(&mut self) -> StepRecord {
        self.t += 1;
        let tick = self.t;

        if self.cfg.is_batch() && tick % self.cfg.batch_interval_ticks == 0 {
            self.run_batch_window();
        }

        let due = self.queue.drain_due(tick);
        debug!(tick, arrivals = due.len(), "processing tick");
        for entry in due {
            if self.cfg.is_batch() {
                self.buffer_arrival(entry);
            } else {
                self.process_arrival(entry);
            }
        }
        self.queue.assert_flushed(tick);

        let record = self.step_record();
        for sink in &self.sinks {
            sink.on_step(&record);
        }
        self.messages_this_tick = 0;
        self.trades_this_tick = 0;
        self.volume_this_tick = Quantity::ZERO;
        record
    }

    fn process_arrival(&mut self, entry: QueueEntry) {
        match entry.action {
            QueuedAction::Order(order) => self.process_order(order),
            QueuedAction::Cancel(req) => self.process_cancel(req),
        }
    }

    fn process_order(&mut self, mut order: Order) {
        if self.cfg.self_trade == SelfTradePolicy::RejectIncoming && self.book.crosses_own(&order)
        {
            order.status = OrderStatus::Rejected;
            self.emit_reject(order.agent_id, order_label(&order), RejectReason::SelfTrade);
            return;
        }

        self.emit_arrival(&order);

        let result = self.engine.match_order(&mut self.book, &mut order, self.t);
        for trade in &result.trades {
            self.settle_trade(trade);
        }

        if !order.remaining_quantity.is_zero() {
            match order.kind {
                OrderKind::Limit { .. } => {
                    if order.status == OrderStatus::Pending {
                        order.status = OrderStatus::Resting;
                    }
                    self.rest_order(order);
                }
                OrderKind::Market => {
                    // No resting market orders: the remainder is cancelled.
                    order.status = OrderStatus::Cancelled;
                }
            }
        }
    }

    fn process_cancel(&mut self, req: CancelRequest) {
        let target_creation = self.book.order(req.order_id).map(|o| o.creation_tick);
        match target_creation {
            Some(creation_tick) => {
                if !PolicyEnforcer::cancel_allowed(&self.cfg, self.t, creation_tick) {
                    self.emit_reject(req.agent_id, "cancel", RejectReason::MinRestingTime);
                    return;
                }
                let ok = self.book.cancel_order(req.order_id).is_ok();
                self.emit_agent(
                    req.agent_id,
                    AgentEvent::Cancel {
                        order_id: req.order_id,
                        ok,
                    },
                );
            }
            // Target already terminal or still in flight: deterministic no-op.
            None => self.emit_agent(
                req.agent_id,
                AgentEvent::Cancel {
                    order_id: req.order_id,
                    ok: false,
                },
            ),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Batch mode
    // ─────────────────────────────────────────────────────────────────────

    fn buffer_arrival(&mut self, entry: QueueEntry) {
        match entry.action {
            QueuedAction::Order(order) => {
                self.emit_arrival(&order);
                self.batch_orders.push(order);
            }
            QueuedAction::Cancel(req) => self.batch_cancels.push(req),
        }
    }

    fn run_batch_window(&mut self) {
        let cancels = std::mem::take(&mut self.batch_cancels);
        for req in cancels {
            self.apply_batch_cancel(req);
        }

        if self.batch_orders.is_empty() {
            return; // Nothing new arrived; the book cannot cross itself
        }

        let mut orders = self.book.drain_all();
        orders.append(&mut self.batch_orders);
        let reference = self.book.last_price();
        let outcome = self.auction.run(orders, self.t, reference);

        if let Some(price) = outcome.clearing_price {
            debug!(
                tick = self.t,
                clearing_price = price.raw(),
                trades = outcome.trades.len(),
                "batch window cleared"
            );
        }

        for trade in &outcome.trades {
            self.settle_trade(trade);
        }
        for mut order in outcome.resting {
            if order.status == OrderStatus::Pending {
                order.status = OrderStatus::Resting;
            }
            self.rest_order(order);
        }
        // Market remainders in outcome.cancelled die here, per the
        // no-resting-market-orders rule.
    }

    fn apply_batch_cancel(&mut self, req: CancelRequest) {
        // The target may still be buffered in the same window.
        if let Some(pos) = self.batch_orders.iter().position(|o| o.id == req.order_id) {
            if !PolicyEnforcer::cancel_allowed(&self.cfg, self.t, self.batch_orders[pos].creation_tick)
            {
                self.emit_reject(req.agent_id, "cancel", RejectReason::MinRestingTime);
                return;
            }
            let mut order = self.batch_orders.remove(pos);
            order.status = OrderStatus::Cancelled;
            self.emit_agent(
                req.agent_id,
                AgentEvent::Cancel {
                    order_id: req.order_id,
                    ok: true,
                },
            );
            return;
        }
        self.process_cancel(req);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Settlement and accounting
    // ─────────────────────────────────────────────────────────────────────

    fn settle_trade(&mut self, trade: &Trade) {
        let value = trade.price * trade.quantity;
        let fee = Cash(self.cfg.taker_fee_per_share.raw() * trade.quantity.raw() as i64);
        let qty = trade.quantity.raw() as i64;

        let both = [trade.buy_agent, trade.sell_agent];
        let parties: &[AgentId] = if trade.buy_agent == trade.sell_agent {
            &both[..1]
        } else {
            &both[..]
        };
        let cash_before: Cash = parties.iter().map(|a| self.lookup_account(*a).cash).sum();
        let inv_before: i64 = parties.iter().map(|a| self.lookup_account(*a).inventory).sum();

        {
            let buyer = self.account_mut(trade.buy_agent);
            buyer.cash -= value;
            buyer.inventory += qty;
            if trade.taker_agent == trade.buy_agent {
                buyer.cash -= fee;
            }
        }
        {
            let seller = self.account_mut(trade.sell_agent);
            seller.cash += value;
            seller.inventory -= qty;
            if trade.taker_agent == trade.sell_agent && trade.sell_agent != trade.buy_agent {
                seller.cash -= fee;
            }
        }

        let cash_after: Cash = parties.iter().map(|a| self.lookup_account(*a).cash).sum();
        let inv_after: i64 = parties.iter().map(|a| self.lookup_account(*a).inventory).sum();
        assert_eq!(
            cash_after,
            cash_before - fee,
            "trade settlement violated cash conservation: {trade}"
        );
        assert_eq!(
            inv_after, inv_before,
            "trade settlement violated inventory conservation: {trade}"
        );

        self.book.set_last_price(trade.price);
        self.trades_this_tick += 1;
        self.volume_this_tick += trade.quantity;
        for sink in &self.sinks {
            sink.on_trade(trade);
        }
    }

    /// Mark an agent's account to market.
    ///
    /// Valuation falls back mid price → last trade price → zero when no
    /// explicit price is given.
    ///
    /// # Panics
    /// Panics if the agent was never registered.
    pub fn mark_to_market(&self, agent: AgentId, price: Option<Price>) -> Cash {
        let px = price
            .or_else(|| self.book.mid_price())
            .or_else(|| self.book.last_price())
            .unwrap_or(Price::ZERO);
        self.lookup_account(agent).value_at(px)
    }

    /// Emit a `pnl` record for the agent and return the valuation.
    pub fn log_pnl(&self, agent: AgentId) -> Cash {
        let value = self.mark_to_market(agent, None);
        let account = self.lookup_account(agent);
        self.emit_agent(
            agent,
            AgentEvent::Pnl {
                value,
                cash: account.cash,
                inventory: account.inventory,
            },
        );
        value
    }

    /// Emit a `decision_timing` record echoing a receipt.
    ///
    /// Agents call this to persist the timing diagnostics the core returned
    /// at submission time.
    pub fn log_decision_timing(&self, agent: AgentId, receipt: &IntentReceipt) {
        self.emit_agent(
            agent,
            AgentEvent::DecisionTiming {
                tokens_used: receipt.tokens_used,
                latency_ms: receipt.latency_ms,
                arrival_tick: receipt.arrival_tick,
            },
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn agent_seed(&self, agent: AgentId) -> u64 {
        self.seed.wrapping_add(agent.0)
    }

    fn alloc_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    fn rest_order(&mut self, order: Order) {
        // Admission validated price, quantity and alignment; a failure here
        // is a core bug.
        if let Err(err) = self.book.add_order(order) {
            panic!("failed to rest validated order: {err}");
        }
    }

    fn lookup_account(&self, agent: AgentId) -> &AgentAccount {
        self.accounts
            .get(&agent)
            .unwrap_or_else(|| panic!("unknown agent {agent}"))
    }

    fn account_mut(&mut self, agent: AgentId) -> &mut AgentAccount {
        self.accounts
            .get_mut(&agent)
            .unwrap_or_else(|| panic!("unknown agent {agent}"))
    }

    fn step_record(&self) -> StepRecord {
        let best_bid = self.book.best_bid_price();
        let best_ask = self.book.best_ask_price();
        StepRecord {
            t: self.t,
            best_bid,
            best_ask,
            mid: self.book.mid_price(),
            spread: self.book.spread(),
            depth1_bid: self.book.depth_at_best(OrderSide::Buy),
            depth1_ask: self.book.depth_at_best(OrderSide::Sell),
            depth5_bid: self.book.bid_depth(5),
            depth5_ask: self.book.ask_depth(5),
            last_trade: self.book.last_price(),
            num_trades: self.trades_this_tick,
            trade_volume: self.volume_this_tick,
            num_messages: self.messages_this_tick,
        }
    }

    fn emit_arrival(&self, order: &Order) {
        let event = match order.kind {
            OrderKind::Limit { price } => AgentEvent::Limit {
                order_id: order.id,
                side: order.side,
                px: price,
                qty: order.remaining_quantity,
            },
            OrderKind::Market => AgentEvent::Market {
                order_id: order.id,
                side: order.side,
                qty: order.remaining_quantity,
            },
        };
        self.emit_agent(order.agent_id, event);
    }

    fn emit_reject(&self, agent: AgentId, intent: &str, reason: RejectReason) {
        self.emit_agent(
            agent,
            AgentEvent::Reject {
                intent: intent.to_string(),
                reason,
            },
        );
    }

    fn emit_agent(&self, agent: AgentId, event: AgentEvent) {
        let record = AgentRecord {
            t: self.t,
            agent,
            event,
        };
        for sink in &self.sinks {
            sink.on_agent_event(&record);
        }
    }
}

fn order_label(order: &Order) -> &'static str {
    match order.kind {
        OrderKind::Limit { .. } => "limit",
        OrderKind::Market => "market",
    }
}
