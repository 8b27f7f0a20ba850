//! Inline WAF gateway library.
//!
//! Every client request is inspected by one of a set of external detection
//! engines before it is forwarded to the upstream.

pub mod config;
pub mod engine;
pub mod http;
pub mod inspection;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::schema::WafGateConfig;
pub use http::HttpServer;
pub use inspection::Dispatcher;
pub use lifecycle::{LifecycleManager, Shutdown};
