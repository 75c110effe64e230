//! Global latency queue ordering in-flight intents by arrival.
//!
//! Entries are keyed by `(completion_tick, creation_seq)` and released in
//! ascending key order. This is the sole source of truth for the order in
//! which simultaneous-looking agent actions take effect: it is what lets a
//! single-threaded simulation behave as if many agents acted concurrently
//! while staying exactly reproducible.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::warn;
use types::{CancelRequest, Order, Seq, Tick};

/// The action an entry carries to its arrival tick.
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedAction {
    /// A limit or market order in flight.
    Order(Order),
    /// A cancel request in flight.
    Cancel(CancelRequest),
}

impl QueuedAction {
    /// Creation sequence of the underlying intent.
    pub fn creation_seq(&self) -> Seq {
        match self {
            QueuedAction::Order(order) => order.creation_seq,
            QueuedAction::Cancel(req) => req.creation_seq,
        }
    }
}

/// A scheduled arrival.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Tick at which the action takes effect.
    pub completion_tick: Tick,
    /// Deterministic tie-breaker for equal completion ticks.
    pub creation_seq: Seq,
    /// The in-flight action.
    pub action: QueuedAction,
}

impl QueueEntry {
    /// Wrap an order for scheduling.
    pub fn order(completion_tick: Tick, order: Order) -> Self {
        Self {
            completion_tick,
            creation_seq: order.creation_seq,
            action: QueuedAction::Order(order),
        }
    }

    /// Wrap a cancel request for scheduling.
    pub fn cancel(completion_tick: Tick, req: CancelRequest) -> Self {
        Self {
            completion_tick,
            creation_seq: req.creation_seq,
            action: QueuedAction::Cancel(req),
        }
    }

    fn key(&self) -> (Tick, Seq) {
        (self.completion_tick, self.creation_seq)
    }
}

// Ordering considers only the queue key; creation_seq values are unique,
// so equal keys imply the same entry.
impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Priority queue of in-flight intents, keyed `(completion_tick, creation_seq)`.
#[derive(Debug, Default)]
pub struct LatencyQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl LatencyQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an entry.
    pub fn push(&mut self, entry: QueueEntry) {
        self.heap.push(Reverse(entry));
    }

    /// Number of in-flight entries.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Release every entry due at or before `tick`, in key order.
    ///
    /// Entries with a completion tick in the past should not occur under a
    /// correct clock; they are released immediately and logged as an
    /// anomaly rather than dropped.
    pub fn drain_due(&mut self, tick: Tick) -> Vec<QueueEntry> {
        let mut due = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.completion_tick > tick {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                if entry.completion_tick < tick {
                    warn!(
                        completion_tick = entry.completion_tick,
                        current_tick = tick,
                        creation_seq = entry.creation_seq,
                        "latency queue released a past-due entry"
                    );
                }
                due.push(entry);
            }
        }
        due
    }

    /// Abort if anything due at or before `tick` is still queued.
    ///
    /// A due entry persisting after processing indicates a core bug.
    pub fn assert_flushed(&self, tick: Tick) {
        if let Some(Reverse(head)) = self.heap.peek() {
            assert!(
                head.completion_tick > tick,
                "latency queue entry (tick {}, seq {}) persisted after processing tick {}",
                head.completion_tick,
                head.creation_seq,
                tick
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{AgentId, OrderId, OrderSide, Price, Quantity};

    fn order_entry(completion: Tick, seq: Seq) -> QueueEntry {
        let mut order = types::Order::limit(
            AgentId(1),
            OrderSide::Buy,
            Price::from_float(100.0),
            Quantity(1),
        );
        order.creation_seq = seq;
        QueueEntry::order(completion, order)
    }

    fn cancel_entry(completion: Tick, seq: Seq) -> QueueEntry {
        QueueEntry::cancel(
            completion,
            CancelRequest {
                agent_id: AgentId(1),
                order_id: OrderId(1),
                creation_tick: 0,
                creation_seq: seq,
            },
        )
    }

    #[test]
    fn test_drain_respects_completion_tick() {
        let mut q = LatencyQueue::new();
        q.push(order_entry(3, 1));
        q.push(order_entry(1, 2));
        q.push(order_entry(2, 3));

        let due = q.drain_due(1);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].creation_seq, 2);
        assert_eq!(q.len(), 2);

        let due = q.drain_due(3);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].creation_seq, 3);
        assert_eq!(due[1].creation_seq, 1);
        assert!(q.is_empty());
    }

    #[test]
    fn test_sequence_breaks_tick_ties() {
        let mut q = LatencyQueue::new();
        q.push(order_entry(5, 9));
        q.push(cancel_entry(5, 2));
        q.push(order_entry(5, 4));

        let due = q.drain_due(5);
        let seqs: Vec<Seq> = due.iter().map(|e| e.creation_seq).collect();
        assert_eq!(seqs, vec![2, 4, 9]);
    }

    #[test]
    fn test_past_due_entries_still_released() {
        let mut q = LatencyQueue::new();
        q.push(order_entry(1, 1));
        // Drain past the entry's tick; it must come out anyway.
        let due = q.drain_due(10);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn test_assert_flushed_passes_when_clean() {
        let mut q = LatencyQueue::new();
        q.push(order_entry(4, 1));
        q.drain_due(3);
        q.assert_flushed(3);
    }

    #[test]
    #[should_panic(expected = "persisted after processing")]
    fn test_assert_flushed_panics_on_stuck_entry() {
        let mut q = LatencyQueue::new();
        q.push(order_entry(2, 1));
        q.assert_flushed(2);
    }
}
