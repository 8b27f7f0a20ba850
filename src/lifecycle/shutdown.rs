//! Shutdown coordination and engine teardown.

use tokio::sync::broadcast;

use crate::lifecycle::LifecycleManager;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server and the idle reaper subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    /// Stop the reaper and close every engine pool.
    ///
    /// Idempotent, and a no-op on a manager that never finished provisioning.
    pub fn cleanup(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
        if let Some(engines) = self.engine_pool.take() {
            engines.close_all();
            tracing::info!(engines = engines.len(), "Detection engines cleaned up");
        }
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        self.cleanup();
    }
}
