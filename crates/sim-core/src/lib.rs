//! Sim-core: matching and admission engine for the compute-budgeted
//! continuous double auction.
//!
//! This crate provides the deterministic single-threaded market core:
//! - Order book management with price-time priority
//! - Continuous matching and periodic uniform-price batch auctions
//! - Per-agent token-bucket compute accounting and latency derivation
//! - The global latency queue ordering arrivals by (tick, sequence)
//! - Policy enforcement: latency floors, message caps, minimum resting time
//! - Append-only event emission to pluggable sinks
//!
//! "Concurrency" between agents is modeled entirely through the latency
//! queue's ordering; two runs with the same seed and configuration produce
//! byte-identical event logs.

mod accounts;
mod admission;
mod batch_auction;
mod compute;
mod config;
mod error;
mod events;
mod latency_queue;
mod market;
mod matching;
mod order_book;
mod recording;

pub use accounts::AgentAccount;
pub use admission::PolicyEnforcer;
pub use batch_auction::{AuctionOutcome, BatchAuction};
pub use compute::{AgentCompute, ChargeOutcome, ComputeBudget, LatencyModel};
pub use config::{ClearingTieBreak, JitterSpec, MarketConfig, SelfTradePolicy};
pub use error::{Result, SimCoreError};
pub use events::{
    AgentEvent, AgentRecord, EventSink, MemorySink, NullSink, RunMeta, SharedSink, StepRecord,
};
pub use latency_queue::{LatencyQueue, QueueEntry, QueuedAction};
pub use market::{DecisionPolicy, Market, MarketObs, SubmitResult};
pub use matching::{MatchResult, MatchingEngine};
pub use order_book::{OrderBook, PriceLevel};
pub use recording::JsonlSink;
