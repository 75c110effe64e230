//! Policy enforcement at intent-scheduling and cancel-processing time.
//!
//! The enforcer owns the per-agent message counters and the latency-floor /
//! arrival-tick arithmetic. Minimum resting time is checked here too, but
//! at cancel *processing* time rather than scheduling time: the race
//! between a cancel and fills on its target resolves through arrival
//! order, never through locking.

use std::collections::HashMap;

use types::{AgentId, Tick};

use crate::config::MarketConfig;

/// Applies the market's policy knobs.
#[derive(Debug, Default)]
pub struct PolicyEnforcer {
    /// Submissions per agent this tick; cleared by [`PolicyEnforcer::reset_tick`].
    message_counts: HashMap<AgentId, u32>,
}

impl PolicyEnforcer {
    /// Create an enforcer with empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the per-tick message counters.
    pub fn reset_tick(&mut self) {
        self.message_counts.clear();
    }

    /// Count one submission attempt for `agent`.
    ///
    /// Returns false when the attempt exceeds the per-tick cap. The attempt
    /// is still counted, so later attempts in the same tick keep failing.
    pub fn admit_message(&mut self, cfg: &MarketConfig, agent: AgentId) -> bool {
        let count = self.message_counts.entry(agent).or_insert(0);
        *count += 1;
        match cfg.message_limit_per_tick {
            Some(cap) => *count <= cap,
            None => true,
        }
    }

    /// Messages admitted or attempted by `agent` this tick.
    pub fn messages_this_tick(&self, agent: AgentId) -> u32 {
        self.message_counts.get(&agent).copied().unwrap_or(0)
    }

    /// Apply the policy latency floor.
    pub fn floor_latency(cfg: &MarketConfig, latency_ms: f64) -> f64 {
        latency_ms.max(cfg.latency_floor_ms)
    }

    /// Compute the tick at which an intent created at `creation_tick` with
    /// the given (already floored) latency takes effect.
    ///
    /// The delay is at least one tick: an intent never takes effect on its
    /// own decision tick.
    pub fn arrival_tick(cfg: &MarketConfig, creation_tick: Tick, latency_ms: f64) -> Tick {
        let ticks = (latency_ms / cfg.tick_duration_ms).ceil();
        let delay = if ticks.is_finite() && ticks > 1.0 {
            ticks as Tick
        } else {
            1
        };
        creation_tick + delay
    }

    /// Check the minimum-resting-time rule for a cancel arriving at
    /// `now` against an order created at `order_creation_tick`.
    pub fn cancel_allowed(cfg: &MarketConfig, now: Tick, order_creation_tick: Tick) -> bool {
        now.saturating_sub(order_creation_tick) >= cfg.min_resting_ticks
    }
}
