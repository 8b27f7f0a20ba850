//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate [waf] → Build engine pools → Resolve policy → Warm → Start reaper
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop server → Stop reaper → Close every engine pool
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Engine pools are created once at startup and released once at shutdown
//! - Cleanup is idempotent and tolerates a half-provisioned manager

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::LifecycleManager;
