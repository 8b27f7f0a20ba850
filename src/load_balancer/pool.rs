//! Engine pool management.
//!
//! # Responsibilities
//! - Hold one connection pool per configured engine, in configured order
//! - Apply the selection policy to pick a pool per request
//! - Periodically prune idle connections and publish pool gauges
//! - Close every pool on shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::engine::{BackendAddress, Connector};
use crate::load_balancer::{
    connection_pool::{ConnectionPool, PoolConfig},
    SelectionPolicy,
};
use crate::observability::metrics;

/// Ordered collection of per-engine connection pools.
#[derive(Debug, Default)]
pub struct EnginePool {
    pools: Vec<Arc<ConnectionPool>>,
}

impl EnginePool {
    /// One pool per address, all sharing the same sizing.
    pub fn from_addresses(
        addresses: &[BackendAddress],
        config: PoolConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let pools = addresses
            .iter()
            .map(|addr| Arc::new(ConnectionPool::new(*addr, config, connector.clone())))
            .collect();
        Self { pools }
    }

    pub fn pools(&self) -> &[Arc<ConnectionPool>] {
        &self.pools
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Pick a pool for one request.
    pub fn select(&self, policy: &SelectionPolicy) -> Option<Arc<ConnectionPool>> {
        let picked = policy.select(&self.pools).cloned();
        if picked.is_none() {
            tracing::debug!(
                engine_count = self.pools.len(),
                policy = policy.name(),
                "No engine selected"
            );
        }
        picked
    }

    /// Warm every pool with `count` connections.
    pub async fn warm(&self, count: usize) {
        for pool in &self.pools {
            let opened = pool.warm(count).await;
            tracing::debug!(engine = %pool.addr(), opened, "Engine pool warmed");
        }
    }

    /// Prune expired idle connections across all pools.
    pub fn prune_idle(&self) -> usize {
        self.pools.iter().map(|p| p.prune_idle()).sum()
    }

    /// Close every pool. Safe to call more than once.
    pub fn close_all(&self) {
        for pool in &self.pools {
            pool.close();
        }
    }

    /// Idle reaper loop. Exits on the shutdown signal.
    pub async fn run_reaper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(
            interval = ?interval,
            engines = self.pools.len(),
            "Idle connection reaper starting"
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.prune_idle();
                    for pool in &self.pools {
                        metrics::record_pool_state(&pool.addr().to_string(), pool.stats());
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Idle connection reaper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
