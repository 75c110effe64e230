//! Event records and the sink interface consumed by analysis tooling.
//!
//! Sinks are **observers**: they receive owned record snapshots at
//! lifecycle points and cannot modify simulation state. Methods take
//! `&self`; implementations use interior mutability where they accumulate.
//!
//! The market emits exactly one step record per tick, one agent record per
//! admitted or rejected intent and per arrival-time execution, and one
//! trade record per trade.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use types::{
    AgentId, Cash, OrderId, OrderSide, Price, Quantity, RejectReason, Tick, Trade,
};

use crate::config::MarketConfig;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Run metadata, emitted once at run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// Seed all agent streams derive from.
    pub seed: u64,
    /// The immutable market configuration.
    pub config: MarketConfig,
    /// Registered agents, in registration order.
    pub agents: Vec<AgentId>,
}

/// Per-tick market summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Tick this record closes.
    pub t: Tick,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub mid: Option<Price>,
    pub spread: Option<Price>,
    /// Quantity at the best bid level (None when the side is empty).
    pub depth1_bid: Option<Quantity>,
    /// Quantity at the best ask level (None when the side is empty).
    pub depth1_ask: Option<Quantity>,
    /// Total bid quantity over the top five levels.
    pub depth5_bid: Quantity,
    /// Total ask quantity over the top five levels.
    pub depth5_ask: Quantity,
    pub last_trade: Option<Price>,
    /// Trades executed this tick.
    pub num_trades: u64,
    /// Shares traded this tick.
    pub trade_volume: Quantity,
    /// Intents admitted this tick.
    pub num_messages: u64,
}

/// Per-agent event payload. The serialized `type` tag matches the reason
/// codes analysis tooling filters on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// An intent was admitted into the latency queue.
    Intent {
        intent: String,
        side: Option<OrderSide>,
        px: Option<Price>,
        qty: Option<Quantity>,
        target: Option<OrderId>,
        tokens_requested: u64,
        tokens_used: u64,
        degraded: bool,
        latency_ms: f64,
        arrival_tick: Tick,
    },
    /// A limit order arrived and was applied.
    Limit {
        order_id: OrderId,
        side: OrderSide,
        px: Price,
        qty: Quantity,
    },
    /// A market order arrived and was applied.
    Market {
        order_id: OrderId,
        side: OrderSide,
        qty: Quantity,
    },
    /// A cancel arrived; `ok` is false when the target was already gone.
    Cancel { order_id: OrderId, ok: bool },
    /// An intent was refused, at submission or at arrival.
    Reject { intent: String, reason: RejectReason },
    /// Decision-timing diagnostics echoed by the agent.
    DecisionTiming {
        tokens_used: u64,
        latency_ms: f64,
        arrival_tick: Tick,
    },
    /// Mark-to-market valuation.
    Pnl {
        value: Cash,
        cash: Cash,
        inventory: i64,
    },
}

/// An agent event stamped with its tick and agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Tick at which the event was emitted.
    pub t: Tick,
    /// The agent the event belongs to.
    pub agent: AgentId,
    /// The event payload.
    #[serde(flatten)]
    pub event: AgentEvent,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink trait
// ─────────────────────────────────────────────────────────────────────────────

/// Observer of the market's append-only event streams.
///
/// All methods have default no-op implementations; sinks override the
/// streams they care about.
pub trait EventSink: Send + Sync {
    /// Human-readable sink name (diagnostics only).
    fn name(&self) -> &str;

    /// Called once before the first tick.
    fn on_run_start(&self, _meta: &RunMeta) {}

    /// Called exactly once per tick, after processing.
    fn on_step(&self, _record: &StepRecord) {}

    /// Called for every agent-scoped event.
    fn on_agent_event(&self, _record: &AgentRecord) {}

    /// Called for every executed trade.
    fn on_trade(&self, _trade: &Trade) {}

    /// Called once after the last tick.
    fn on_run_end(&self) {}
}

/// Shared handle to a dynamically dispatched sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemorySink
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    meta: Option<RunMeta>,
    steps: Vec<StepRecord>,
    agent_events: Vec<AgentRecord>,
    trades: Vec<Trade>,
}

/// In-memory sink for tests and programmatic inspection.
///
/// [`MemorySink::encoded_lines`] serializes every record in emission order
/// with the same encoder as the JSONL sink, which makes byte-level
/// determinism checks a vector comparison.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run metadata, if the run started.
    pub fn meta(&self) -> Option<RunMeta> {
        self.state.lock().meta.clone()
    }

    /// All step records so far.
    pub fn steps(&self) -> Vec<StepRecord> {
        self.state.lock().steps.clone()
    }

    /// All agent records so far.
    pub fn agent_events(&self) -> Vec<AgentRecord> {
        self.state.lock().agent_events.clone()
    }

    /// Agent records for one agent.
    pub fn events_for(&self, agent: AgentId) -> Vec<AgentRecord> {
        self.state
            .lock()
            .agent_events
            .iter()
            .filter(|r| r.agent == agent)
            .cloned()
            .collect()
    }

    /// All trades so far.
    pub fn trades(&self) -> Vec<Trade> {
        self.state.lock().trades.clone()
    }

    /// Every record serialized to one JSON line each, in emission order.
    pub fn encoded_lines(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut lines = Vec::new();
        if let Some(meta) = &state.meta {
            lines.extend(serde_json::to_string(meta).ok());
        }
        // Interleaving by tick is not reconstructed here; streams are
        // concatenated in a fixed order, which is stable across runs.
        lines.extend(state.steps.iter().filter_map(|r| serde_json::to_string(r).ok()));
        lines.extend(
            state
                .agent_events
                .iter()
                .filter_map(|r| serde_json::to_string(r).ok()),
        );
        lines.extend(state.trades.iter().filter_map(|t| serde_json::to_string(t).ok()));
        lines
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn on_run_start(&self, meta: &RunMeta) {
        self.state.lock().meta = Some(meta.clone());
    }

    fn on_step(&self, record: &StepRecord) {
        self.state.lock().steps.push(record.clone());
    }

    fn on_agent_event(&self, record: &AgentRecord) {
        self.state.lock().agent_events.push(record.clone());
    }

    fn on_trade(&self, trade: &Trade) {
        self.state.lock().trades.push(trade.clone());
    }
}
