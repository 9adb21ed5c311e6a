//! Release-time ordered queue of pending turns.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tokio::time::Instant;

use super::scheduler::DeliveryPlan;
use crate::turn::Turn;

#[derive(Debug)]
struct Pending {
    release: Instant,
    seq: u64,
    turn: Turn,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.release == other.release && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.release, self.seq).cmp(&(other.release, other.seq))
    }
}

/// Min-heap of turns keyed by release instant.
///
/// Turns with the same release instant come out in insertion order.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    heap: BinaryHeap<Reverse<Pending>>,
    next_seq: u64,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn, release: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Pending { release, seq, turn }));
    }

    /// Enqueues every turn of `plan`, releasing each at `now + delay`.
    pub fn push_plan(&mut self, plan: DeliveryPlan, now: Instant) {
        for item in plan.into_items() {
            self.push(item.turn, now + item.delay);
        }
    }

    /// Removes and returns every turn due at or before `now`, in release order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<Turn> {
        let mut due = Vec::new();
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(pending)| pending.release <= now)
        {
            if let Some(Reverse(pending)) = self.heap.pop() {
                due.push(pending.turn);
            }
        }
        due
    }

    pub fn next_release(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(pending)| pending.release)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
