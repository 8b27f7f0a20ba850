//! Round-robin selection policy.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector.
///
/// The counter is bumped before indexing, so a fresh selector starts at
/// index 1 (`[A, B, C]` yields `B, C, A, B, ...`).
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a given counter value.
    pub fn with_counter(start: usize) -> Self {
        Self {
            counter: AtomicUsize::new(start),
        }
    }

    pub fn select<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        let len = items.len();
        if len == 0 {
            return None;
        }

        // fetch_add wraps on overflow, keeping the sequence modulo len.
        let robin = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        items.get(robin % len)
    }
}
