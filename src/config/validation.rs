//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (max_idle <= max_cap, durations > 0)
//! - Resolve engine settings, applying defaults for unset fields
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Unset duration fields take defaults; explicit zero is an error
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{WafConfig, WafGateConfig};
use crate::engine::BackendAddress;
use crate::load_balancer::{PolicyRegistry, PoolConfig, SelectionPolicy, DEFAULT_POLICY};

/// Detection deadline used when `timeout_ms` is unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("waf.engine_addrs: at least one engine address is required")]
    MissingEngineAddresses,

    #[error("waf.engine_addrs: {0}")]
    InvalidEngineAddress(String),

    #[error("waf.max_cap must be greater than zero")]
    ZeroMaxCap,

    #[error("waf.max_idle ({max_idle}) must not exceed waf.max_cap ({max_cap})")]
    MaxIdleExceedsMaxCap { max_idle: usize, max_cap: usize },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("waf.lb_policy: unknown policy {name:?} (known: {known})")]
    UnknownPolicy { name: String, known: String },

    #[error("{field}: invalid address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Engine settings with every default applied.
#[derive(Debug)]
pub struct EngineSettings {
    pub addresses: Vec<BackendAddress>,
    pub pool: PoolConfig,
    pub timeout: Duration,
    pub policy: SelectionPolicy,
    pub max_body_bytes: usize,
}

/// Validate the `[waf]` section and resolve it into engine settings.
pub fn resolve_engine_settings(
    config: &WafConfig,
    registry: &PolicyRegistry,
) -> Result<EngineSettings, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.engine_addrs.is_empty() {
        errors.push(ValidationError::MissingEngineAddresses);
    }
    let mut addresses = Vec::with_capacity(config.engine_addrs.len());
    for raw in &config.engine_addrs {
        match raw.parse::<BackendAddress>() {
            Ok(addr) => addresses.push(addr),
            Err(e) => errors.push(ValidationError::InvalidEngineAddress(e.to_string())),
        }
    }

    let defaults = PoolConfig::default();
    let max_idle = config.max_idle.unwrap_or(defaults.max_idle);
    let max_cap = config.max_cap.unwrap_or(defaults.max_cap);
    if max_cap == 0 {
        errors.push(ValidationError::ZeroMaxCap);
    }
    if max_idle > max_cap {
        errors.push(ValidationError::MaxIdleExceedsMaxCap { max_idle, max_cap });
    }

    let idle_timeout = match config.idle_timeout_secs {
        Some(0) => {
            errors.push(ValidationError::ZeroValue("waf.idle_timeout_secs"));
            defaults.idle_timeout
        }
        Some(secs) => Duration::from_secs(secs),
        None => defaults.idle_timeout,
    };

    let timeout = match config.timeout_ms {
        Some(0) => {
            errors.push(ValidationError::ZeroValue("waf.timeout_ms"));
            DEFAULT_TIMEOUT
        }
        Some(ms) => Duration::from_millis(ms),
        None => DEFAULT_TIMEOUT,
    };

    if config.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("waf.connect_timeout_ms"));
    }

    let policy_name = config.lb_policy.as_deref().unwrap_or(DEFAULT_POLICY);
    let policy = registry.build(policy_name);
    if policy.is_none() {
        errors.push(ValidationError::UnknownPolicy {
            name: policy_name.to_string(),
            known: registry.names().join(", "),
        });
    }

    match policy {
        Some(policy) if errors.is_empty() => Ok(EngineSettings {
            addresses,
            pool: PoolConfig {
                initial_cap: config.initial_cap.unwrap_or(defaults.initial_cap),
                max_idle,
                max_cap,
                idle_timeout,
            },
            timeout,
            policy,
            max_body_bytes: config.max_body_bytes,
        }),
        _ => Err(errors),
    }
}

/// Validate the whole configuration file.
pub fn validate_config(config: &WafGateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match resolve_engine_settings(&config.waf, &PolicyRegistry::default()) {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    };

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if Authority::from_str(&config.upstream.address).is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "upstream.address",
            value: config.upstream.address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
