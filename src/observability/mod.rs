//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, pools, forwarder produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) set at the edge and echoed back
//! - Engine address, method and path on every detection log line

pub mod logging;
pub mod metrics;
