//! Market configuration, supplied once at run start and immutable for the
//! run's duration.

use serde::{Deserialize, Serialize};
use types::{Cash, Price, Tick};

/// Jitter added to every decision latency.
///
/// Samples are drawn from the agent's private seeded stream, never from
/// ambient randomness, so identical seeds reproduce identical latencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum JitterSpec {
    /// No jitter.
    #[default]
    None,
    /// Uniform on `[0, max_ms)`.
    Uniform { max_ms: f64 },
    /// Exponential with the given mean.
    Exponential { mean_ms: f64 },
}

/// What to do when an incoming order would trade against the same agent's
/// own resting order.
///
/// The default matches the continuous-auction convention of treating the
/// agent like any other counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SelfTradePolicy {
    /// Self-trades match like any other cross.
    #[default]
    Allow,
    /// The incoming order is rejected if it would cross an own resting order.
    RejectIncoming,
}

/// Tie-break applied when several clearing prices maximize batch volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClearingTieBreak {
    /// Midpoint of the maximal-volume price interval, rounded to the
    /// nearest tick.
    #[default]
    MidpointNearestTick,
    /// Prefer the reference (last trade) price when it is among the
    /// maximal-volume candidates; otherwise fall back to the midpoint.
    ReferencePrice,
}

/// Market configuration.
///
/// Latency fields (`base_ms`, `ms_per_token`, `jitter`) are the run-wide
/// defaults; individual agents can be given their own latency model via
/// `Market::set_agent_compute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Minimum price increment; limit prices must be integer multiples.
    pub tick_size: Price,
    /// Fee charged on every admitted message.
    pub per_message_fee: Cash,
    /// Fee per share charged to the taker side of each trade.
    pub taker_fee_per_share: Cash,
    /// Fixed latency component in milliseconds.
    pub base_ms: f64,
    /// Latency per admitted compute token, in milliseconds.
    pub ms_per_token: f64,
    /// Latency jitter distribution.
    pub jitter: JitterSpec,
    /// Wall-clock milliseconds represented by one tick.
    pub tick_duration_ms: f64,
    /// Minimum decision latency enforced by policy, in milliseconds.
    pub latency_floor_ms: f64,
    /// 0 = continuous matching; > 0 = one uniform-price auction per window
    /// of this many ticks.
    pub batch_interval_ticks: Tick,
    /// Per-agent cap on submissions per tick (None = unlimited).
    pub message_limit_per_tick: Option<u32>,
    /// Ticks an order must rest before it may be cancelled (0 = none).
    pub min_resting_ticks: Tick,
    /// Self-trade handling (continuous mode).
    pub self_trade: SelfTradePolicy,
    /// Batch clearing-price tie-break.
    pub clearing_tie_break: ClearingTieBreak,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_size: Price::from_float(0.01),
            per_message_fee: Cash::ZERO,
            taker_fee_per_share: Cash::ZERO,
            base_ms: 0.5,
            ms_per_token: 0.1,
            jitter: JitterSpec::None,
            tick_duration_ms: 1.0,
            latency_floor_ms: 0.0,
            batch_interval_ticks: 0, // Continuous matching
            message_limit_per_tick: None,
            min_resting_ticks: 0,
            self_trade: SelfTradePolicy::Allow,
            clearing_tie_break: ClearingTieBreak::MidpointNearestTick,
        }
    }
}

impl MarketConfig {
    /// Check whether the market runs periodic batch auctions.
    pub fn is_batch(&self) -> bool {
        self.batch_interval_ticks > 0
    }

    /// Set the tick size.
    pub fn with_tick_size(mut self, tick_size: Price) -> Self {
        self.tick_size = tick_size;
        self
    }

    /// Set the per-message and per-share taker fees.
    pub fn with_fees(mut self, per_message: Cash, taker_per_share: Cash) -> Self {
        self.per_message_fee = per_message;
        self.taker_fee_per_share = taker_per_share;
        self
    }

    /// Set the default latency derivation parameters.
    pub fn with_latency(mut self, base_ms: f64, ms_per_token: f64) -> Self {
        self.base_ms = base_ms;
        self.ms_per_token = ms_per_token;
        self
    }

    /// Set the latency jitter distribution.
    pub fn with_jitter(mut self, jitter: JitterSpec) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the tick duration in milliseconds.
    pub fn with_tick_duration_ms(mut self, ms: f64) -> Self {
        self.tick_duration_ms = ms;
        self
    }

    /// Set the policy latency floor in milliseconds.
    pub fn with_latency_floor_ms(mut self, ms: f64) -> Self {
        self.latency_floor_ms = ms;
        self
    }

    /// Enable batch auctions every `interval` ticks (0 = continuous).
    pub fn with_batch_interval(mut self, interval: Tick) -> Self {
        self.batch_interval_ticks = interval;
        self
    }

    /// Cap per-agent submissions per tick.
    pub fn with_message_limit(mut self, limit: u32) -> Self {
        self.message_limit_per_tick = Some(limit);
        self
    }

    /// Set the minimum resting time before cancels are honored.
    pub fn with_min_resting_ticks(mut self, ticks: Tick) -> Self {
        self.min_resting_ticks = ticks;
        self
    }

    /// Set the self-trade policy.
    pub fn with_self_trade(mut self, policy: SelfTradePolicy) -> Self {
        self.self_trade = policy;
        self
    }

    /// Set the batch clearing-price tie-break policy.
    pub fn with_clearing_tie_break(mut self, tie_break: ClearingTieBreak) -> Self {
        self.clearing_tie_break = tie_break;
        self
    }
}
