//! Per-agent compute accounting and decision latency.
//!
//! Each agent carries a token bucket bounding the compute it may spend on a
//! decision, and a latency model converting spent tokens into milliseconds
//! of decision delay. Jitter is drawn from the agent's private seeded
//! stream so replays are bit-identical.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use crate::config::JitterSpec;

/// Token bucket parameters for a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeBudget {
    /// Maximum tokens the bucket can hold.
    pub capacity: u64,
    /// Tokens restored at the start of each tick (saturating at capacity).
    pub refill_per_tick: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_per_tick: 100,
        }
    }
}

impl ComputeBudget {
    /// Create a budget with the given capacity and refill rate.
    pub fn new(capacity: u64, refill_per_tick: u64) -> Self {
        Self {
            capacity,
            refill_per_tick,
        }
    }
}

/// Latency derivation parameters for a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyModel {
    /// Fixed latency component in milliseconds.
    pub base_ms: f64,
    /// Milliseconds per admitted token.
    pub ms_per_token: f64,
    /// Jitter distribution.
    pub jitter: JitterSpec,
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self {
            base_ms: 0.5,
            ms_per_token: 0.1,
            jitter: JitterSpec::None,
        }
    }
}

impl LatencyModel {
    /// Create a jitter-free latency model.
    pub fn new(base_ms: f64, ms_per_token: f64) -> Self {
        Self {
            base_ms,
            ms_per_token,
            jitter: JitterSpec::None,
        }
    }

    /// Attach a jitter distribution.
    pub fn with_jitter(mut self, jitter: JitterSpec) -> Self {
        self.jitter = jitter;
        self
    }
}

impl JitterSpec {
    /// Draw one jitter sample from the given stream.
    fn sample(self, rng: &mut StdRng) -> f64 {
        match self {
            JitterSpec::None => 0.0,
            JitterSpec::Uniform { max_ms } => {
                if max_ms > 0.0 {
                    rng.random_range(0.0..max_ms)
                } else {
                    0.0
                }
            }
            JitterSpec::Exponential { mean_ms } => {
                if mean_ms > 0.0 {
                    match Exp::new(1.0 / mean_ms) {
                        Ok(dist) => dist.sample(rng),
                        Err(_) => 0.0,
                    }
                } else {
                    0.0
                }
            }
        }
    }
}

/// Outcome of charging tokens for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeOutcome {
    /// Tokens actually charged.
    pub used: u64,
    /// Tokens remaining after the charge.
    pub remaining: u64,
    /// True when the request exceeded the available balance.
    pub degraded: bool,
}

/// Per-agent compute state: token balance plus a private jitter stream.
#[derive(Debug, Clone)]
pub struct AgentCompute {
    budget: ComputeBudget,
    latency: LatencyModel,
    tokens: u64,
    rng: StdRng,
}

impl AgentCompute {
    /// Create compute state with a full bucket and a seeded jitter stream.
    pub fn new(budget: ComputeBudget, latency: LatencyModel, seed: u64) -> Self {
        Self {
            budget,
            latency,
            tokens: budget.capacity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current token balance.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// The agent's bucket parameters.
    pub fn budget(&self) -> ComputeBudget {
        self.budget
    }

    /// Restore tokens for a new tick, saturating at capacity.
    pub fn refill(&mut self) {
        self.tokens = self
            .tokens
            .saturating_add(self.budget.refill_per_tick)
            .min(self.budget.capacity);
        self.check_bounds();
    }

    /// Charge up to `requested` tokens.
    ///
    /// When the balance covers the request the full amount is charged.
    /// Otherwise the entire remaining balance (possibly zero) is charged
    /// and the outcome is flagged degraded: the decision still proceeds,
    /// with reduced capability. Never an error.
    pub fn charge(&mut self, requested: u64) -> ChargeOutcome {
        let (used, degraded) = if requested <= self.tokens {
            (requested, false)
        } else {
            (self.tokens, true)
        };
        self.tokens -= used;
        self.check_bounds();
        ChargeOutcome {
            used,
            remaining: self.tokens,
            degraded,
        }
    }

    /// Derive the decision latency for a charge of `tokens_used` tokens.
    ///
    /// Advances the agent's private jitter stream by exactly one sample.
    pub fn latency_ms(&mut self, tokens_used: u64) -> f64 {
        self.latency.base_ms
            + self.latency.ms_per_token * tokens_used as f64
            + self.latency.jitter.sample(&mut self.rng)
    }

    fn check_bounds(&self) {
        // Token balance outside [0, capacity] is a core bug, not a policy
        // condition (unsigned arithmetic already rules out negatives).
        assert!(
            self.tokens <= self.budget.capacity,
            "token balance {} exceeds capacity {}",
            self.tokens,
            self.budget.capacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute(capacity: u64, refill: u64) -> AgentCompute {
        AgentCompute::new(
            ComputeBudget::new(capacity, refill),
            LatencyModel::new(0.0, 1.0),
            42,
        )
    }

    #[test]
    fn test_full_charge_when_affordable() {
        let mut c = compute(10, 10);
        let out = c.charge(4);
        assert_eq!(out.used, 4);
        assert_eq!(out.remaining, 6);
        assert!(!out.degraded);
    }

    #[test]
    fn test_degraded_charge_drains_balance() {
        let mut c = compute(10, 0);
        let out = c.charge(15);
        assert_eq!(out.used, 10);
        assert_eq!(out.remaining, 0);
        assert!(out.degraded);

        // A second over-ask charges zero and stays degraded
        let out = c.charge(1);
        assert_eq!(out.used, 0);
        assert!(out.degraded);
        assert_eq!(c.tokens(), 0);
    }

    #[test]
    fn test_refill_saturates_at_capacity() {
        let mut c = compute(10, 4);
        c.charge(10);
        c.refill();
        assert_eq!(c.tokens(), 4);
        c.refill();
        assert_eq!(c.tokens(), 8);
        c.refill();
        assert_eq!(c.tokens(), 10);
        c.refill();
        assert_eq!(c.tokens(), 10);
    }

    #[test]
    fn test_latency_scales_with_tokens() {
        let mut c = AgentCompute::new(
            ComputeBudget::new(100, 100),
            LatencyModel::new(0.5, 0.1),
            7,
        );
        let lat = c.latency_ms(10);
        assert!((lat - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_jitter_is_bounded_and_deterministic() {
        let model = LatencyModel::new(0.0, 0.0).with_jitter(JitterSpec::Uniform { max_ms: 2.0 });
        let mut a = AgentCompute::new(ComputeBudget::default(), model, 99);
        let mut b = AgentCompute::new(ComputeBudget::default(), model, 99);

        for _ in 0..100 {
            let la = a.latency_ms(0);
            let lb = b.latency_ms(0);
            assert_eq!(la, lb);
            assert!((0.0..2.0).contains(&la));
        }
    }

    #[test]
    fn test_exponential_jitter_is_nonnegative() {
        let model =
            LatencyModel::new(0.0, 0.0).with_jitter(JitterSpec::Exponential { mean_ms: 1.0 });
        let mut c = AgentCompute::new(ComputeBudget::default(), model, 3);
        for _ in 0..100 {
            assert!(c.latency_ms(0) >= 0.0);
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let model = LatencyModel::new(0.0, 0.0).with_jitter(JitterSpec::Uniform { max_ms: 5.0 });
        let mut a = AgentCompute::new(ComputeBudget::default(), model, 1);
        let mut b = AgentCompute::new(ComputeBudget::default(), model, 2);
        let same = (0..20).all(|_| a.latency_ms(0) == b.latency_ms(0));
        assert!(!same);
    }
}
