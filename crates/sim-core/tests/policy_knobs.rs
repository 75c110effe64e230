//! Policy-knob scenarios: degraded compute, message caps, minimum resting
//! time, latency floors — each checked against the emitted event stream.

use std::sync::Arc;

use sim_core::{
    AgentEvent, ComputeBudget, LatencyModel, Market, MarketConfig, MemorySink,
};
use types::{AgentId, OrderSide, Price, Quantity, RejectReason};

const A: AgentId = AgentId(1);
const B: AgentId = AgentId(2);

fn px(v: f64) -> Price {
    Price::from_float(v)
}

fn market_with_sink(cfg: MarketConfig) -> (Market, Arc<MemorySink>) {
    let mut market = Market::new(cfg, 42);
    market.register_agent(A);
    market.register_agent(B);
    let sink = Arc::new(MemorySink::new());
    market.add_sink(sink.clone());
    (market, sink)
}

fn reject_reasons(sink: &MemorySink, agent: AgentId) -> Vec<RejectReason> {
    sink.events_for(agent)
        .into_iter()
        .filter_map(|r| match r.event {
            AgentEvent::Reject { reason, .. } => Some(reason),
            _ => None,
        })
        .collect()
}

#[test]
fn over_budget_request_degrades_and_still_executes() {
    // Capacity 10, no refill; ask for 15 tokens with 1 ms per token.
    let (mut market, sink) = market_with_sink(MarketConfig::default());
    market
        .set_agent_compute(A, ComputeBudget::new(10, 0), LatencyModel::new(0.0, 1.0))
        .unwrap();

    market.begin_tick();
    let receipt = market
        .submit_limit(A, OrderSide::Buy, px(100.0), Quantity(1), 15)
        .unwrap();

    assert_eq!(receipt.tokens_used, 10);
    assert!(receipt.degraded);
    assert!(receipt.latency_ms >= 10.0);

    // The decision proceeds: after enough ticks the order rests.
    for _ in 0..receipt.arrival_tick {
        market.step();
    }
    assert_eq!(market.book().best_bid_price(), Some(px(100.0)));

    // Degradation is logged, not rejected.
    assert!(reject_reasons(&sink, A).is_empty());
    let degraded_flags: Vec<bool> = sink
        .events_for(A)
        .into_iter()
        .filter_map(|r| match r.event {
            AgentEvent::Intent { degraded, .. } => Some(degraded),
            _ => None,
        })
        .collect();
    assert_eq!(degraded_flags, vec![true]);
}

#[test]
fn second_message_in_tick_is_rejected() {
    let (mut market, sink) =
        market_with_sink(MarketConfig::default().with_message_limit(1).with_latency(0.0, 0.0));

    market.begin_tick();
    let first = market.submit_limit(A, OrderSide::Buy, px(100.0), Quantity(1), 1);
    let second = market.submit_limit(A, OrderSide::Sell, px(100.2), Quantity(1), 1);

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), RejectReason::MessageLimit);
    assert_eq!(reject_reasons(&sink, A), vec![RejectReason::MessageLimit]);

    // The first intent proceeds normally.
    let record = market.step();
    assert_eq!(record.num_messages, 1);
    assert_eq!(market.book().best_bid_price(), Some(px(100.0)));
    assert_eq!(market.book().best_ask_price(), None);

    // Other agents are unaffected by A's counter.
    market.begin_tick();
    assert!(market
        .submit_limit(B, OrderSide::Sell, px(100.2), Quantity(1), 1)
        .is_ok());
}

#[test]
fn cancel_respects_min_resting_time() {
    let (mut market, sink) = market_with_sink(
        MarketConfig::default()
            .with_min_resting_ticks(5)
            .with_latency(0.0, 0.0),
    );

    market.begin_tick();
    let receipt = market
        .submit_limit(A, OrderSide::Sell, px(100.0), Quantity(1), 1)
        .unwrap();
    let order_id = receipt.order_id.unwrap();
    market.step(); // t=1: order rests (created at t=0)

    // Cancel decided at t=2 arrives at t=3: 3 ticks after creation → reject.
    market.begin_tick();
    market.step(); // t=2
    market.begin_tick();
    market.submit_cancel(A, order_id, 1).unwrap();
    market.step(); // t=3, cancel processed and rejected
    assert_eq!(reject_reasons(&sink, A), vec![RejectReason::MinRestingTime]);
    assert_eq!(market.book().order_count(), 1);

    // A cancel arriving after the floor succeeds while the order rests.
    market.begin_tick();
    market.step(); // t=4
    market.begin_tick();
    market.submit_cancel(A, order_id, 1).unwrap();
    market.step(); // t=5: 5 - 0 >= 5 → honored
    assert_eq!(market.book().order_count(), 0);

    let ok_flags: Vec<bool> = sink
        .events_for(A)
        .into_iter()
        .filter_map(|r| match r.event {
            AgentEvent::Cancel { ok, .. } => Some(ok),
            _ => None,
        })
        .collect();
    assert_eq!(ok_flags, vec![true]);
}

#[test]
fn latency_floor_binds_fast_agents() {
    let cfg = MarketConfig::default()
        .with_latency(0.0, 0.1)
        .with_latency_floor_ms(4.0);
    let (mut market, _sink) = market_with_sink(cfg);

    market.begin_tick();
    // 1 token → 0.1 ms raw latency, floored to 4 ms → arrival at t=4.
    let receipt = market
        .submit_limit(A, OrderSide::Buy, px(100.0), Quantity(1), 1)
        .unwrap();
    assert_eq!(receipt.latency_ms, 4.0);
    assert_eq!(receipt.arrival_tick, 4);

    // A slower decision is unaffected by the floor.
    let receipt = market
        .submit_limit(B, OrderSide::Buy, px(99.0), Quantity(1), 100)
        .unwrap();
    assert!((receipt.latency_ms - 10.0).abs() < 1e-9);
}

#[test]
fn rejects_charge_no_tokens_and_no_fees() {
    let cfg = MarketConfig::default()
        .with_message_limit(1)
        .with_fees(types::Cash::from_float(0.25), types::Cash::ZERO);
    let (mut market, _sink) = market_with_sink(cfg);
    market
        .set_agent_compute(A, ComputeBudget::new(10, 10), LatencyModel::new(0.0, 1.0))
        .unwrap();

    market.begin_tick();
    market
        .submit_limit(A, OrderSide::Buy, px(100.0), Quantity(1), 4)
        .unwrap();
    let tokens_after_first = market.tokens_remaining(A).unwrap();
    let cash_after_first = market.account(A).unwrap().cash;

    // Rejected by the message cap: no tokens, no fee, nothing scheduled.
    market
        .submit_limit(A, OrderSide::Buy, px(100.0), Quantity(1), 4)
        .unwrap_err();
    assert_eq!(market.tokens_remaining(A).unwrap(), tokens_after_first);
    assert_eq!(market.account(A).unwrap().cash, cash_after_first);
    assert_eq!(market.in_flight(), 1);
}
