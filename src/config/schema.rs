//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. Engine pool sizing is optional here; provisioning fills in defaults.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WafGateConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// The protected application allowed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Detection engines and how requests are dispatched to them.
    pub waf: WafConfig,

    /// Timeout configuration for the forwarding path.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream (protected application) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Detection engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WafConfig {
    /// Engine addresses (`IP:port`), in selection order.
    pub engine_addrs: Vec<String>,

    /// Connections opened per engine at startup (default 1).
    pub initial_cap: Option<usize>,

    /// Idle connections kept per engine (default 16).
    pub max_idle: Option<usize>,

    /// Open connections allowed per engine (default 32).
    pub max_cap: Option<usize>,

    /// Seconds before an idle connection is closed (default 30).
    pub idle_timeout_secs: Option<u64>,

    /// Per-request detection deadline in milliseconds (default 1000).
    pub timeout_ms: Option<u64>,

    /// Selection policy name: "random" (default) or "round_robin".
    pub lb_policy: Option<String>,

    /// Largest request body sent to the engine, in bytes.
    pub max_body_bytes: usize,

    /// Engine connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for WafConfig {
    fn default() -> Self {
        Self {
            engine_addrs: Vec::new(),
            initial_cap: None,
            max_idle: None,
            max_cap: None,
            idle_timeout_secs: None,
            timeout_ms: None,
            lb_policy: None,
            max_body_bytes: 1024 * 1024, // 1MB
            connect_timeout_ms: 1000,
        }
    }
}

/// Timeout configuration for the forwarding path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
