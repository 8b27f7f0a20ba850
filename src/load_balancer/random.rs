//! Random selection policy.

use rand::Rng;

/// Uniform random selector.
///
/// Reservoir sampling: the k-th entry replaces the current pick with
/// probability 1/k, so one pass yields a uniform choice.
#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }

    pub fn select<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        let mut rng = rand::thread_rng();
        let mut pick = None;
        for (seen, item) in items.iter().enumerate() {
            if rng.gen_range(0..=seen) == 0 {
                pick = Some(item);
            }
        }
        pick
    }
}
