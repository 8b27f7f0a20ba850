//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the `[waf]` section and apply defaults
//! - Build one connection pool per engine, in configured order
//! - Resolve the selection policy through the registry
//! - Warm pools and start the idle reaper
//!
//! # Design Decisions
//! - Fail fast: any validation error is fatal
//! - Unreachable engines at startup are not fatal; pools grow on demand

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::loader::ConfigError;
use crate::config::schema::WafConfig;
use crate::config::validation::resolve_engine_settings;
use crate::engine::Connector;
use crate::inspection::Dispatcher;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{EnginePool, PolicyRegistry};

const MIN_REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the engine pool from provisioning to cleanup.
#[derive(Debug, Default)]
pub struct LifecycleManager {
    pub(crate) engine_pool: Option<Arc<EnginePool>>,
    pub(crate) reaper: Option<JoinHandle<()>>,
    pub(crate) shutdown: Shutdown,
}

impl LifecycleManager {
    /// Create a manager whose background tasks stop on `shutdown`.
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            engine_pool: None,
            reaper: None,
            shutdown,
        }
    }

    /// Provision with the built-in selection policies.
    pub async fn provision(
        &mut self,
        config: &WafConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Dispatcher, ConfigError> {
        self.provision_with(config, connector, &PolicyRegistry::default()).await
    }

    /// Build the engine pool and selection policy, returning the dispatcher.
    pub async fn provision_with(
        &mut self,
        config: &WafConfig,
        connector: Arc<dyn Connector>,
        registry: &PolicyRegistry,
    ) -> Result<Dispatcher, ConfigError> {
        tracing::info!("Provisioning detection engines");

        let settings = resolve_engine_settings(config, registry).map_err(ConfigError::Validation)?;

        if self.engine_pool.is_some() {
            // Re-provisioning replaces whatever was running before.
            self.cleanup();
        }

        let engines = Arc::new(EnginePool::from_addresses(
            &settings.addresses,
            settings.pool,
            connector,
        ));
        engines.warm(settings.pool.initial_cap).await;

        let interval = (settings.pool.idle_timeout / 2).max(MIN_REAPER_INTERVAL);
        self.reaper = Some(tokio::spawn(
            engines.clone().run_reaper(interval, self.shutdown.subscribe()),
        ));
        self.engine_pool = Some(engines.clone());

        tracing::info!(
            engines = engines.len(),
            policy = settings.policy.name(),
            initial_cap = settings.pool.initial_cap,
            max_idle = settings.pool.max_idle,
            max_cap = settings.pool.max_cap,
            idle_timeout = ?settings.pool.idle_timeout,
            timeout = ?settings.timeout,
            "Detection engines provisioned"
        );

        Ok(Dispatcher::new(
            engines,
            Arc::new(settings.policy),
            settings.timeout,
            settings.max_body_bytes,
        ))
    }

    /// The provisioned engine pool, if any.
    pub fn engine_pool(&self) -> Option<&Arc<EnginePool>> {
        self.engine_pool.as_ref()
    }
}
