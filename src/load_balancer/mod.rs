//! Engine selection subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → pool.rs (EnginePool, one pool per engine address)
//!     → Apply selection policy:
//!         - random.rs (reservoir sampling)
//!         - round_robin.rs (rotate through engines)
//!     → connection_pool.rs (borrow a connection from the chosen engine)
//!     → Return guard or PoolError
//! ```
//!
//! # Design Decisions
//! - Policies are a closed enum; the registry maps config names to constructors
//! - Policy state (round-robin counter) belongs to the policy instance
//! - Selection is one pass over the engine list, no health filtering

pub mod connection_pool;
pub mod pool;
pub mod random;
pub mod round_robin;

use std::collections::HashMap;

pub use connection_pool::{ConnectionPool, PoolConfig, PoolError, PoolStats, PooledConnection};
pub use pool::EnginePool;
pub use random::Random;
pub use round_robin::RoundRobin;

/// Policy used when none is configured.
pub const DEFAULT_POLICY: &str = "random";

/// Strategy choosing one engine per request.
#[derive(Debug)]
pub enum SelectionPolicy {
    Random(Random),
    RoundRobin(RoundRobin),
}

impl SelectionPolicy {
    /// Select one entry, or `None` when `items` is empty.
    pub fn select<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        match self {
            SelectionPolicy::Random(p) => p.select(items),
            SelectionPolicy::RoundRobin(p) => p.select(items),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionPolicy::Random(_) => "random",
            SelectionPolicy::RoundRobin(_) => "round_robin",
        }
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::Random(Random::new())
    }
}

/// Builds a fresh policy instance.
pub type PolicyConstructor = fn() -> SelectionPolicy;

/// Maps policy names from configuration to constructors.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    constructors: HashMap<&'static str, PolicyConstructor>,
}

impl PolicyRegistry {
    /// A registry with no policies.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, constructor: PolicyConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Construct the named policy. Each call yields independent state.
    pub fn build(&self, name: &str) -> Option<SelectionPolicy> {
        self.constructors.get(name).map(|constructor| constructor())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("random", || SelectionPolicy::Random(Random::new()));
        registry.register("round_robin", || SelectionPolicy::RoundRobin(RoundRobin::new()));
        registry
    }
}
