//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, defaults for engine pools)
//!     → WafGateConfig (validated, immutable)
//!     → lifecycle provisioning builds engine pools from it
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup and read-only afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::UpstreamConfig;
pub use schema::WafConfig;
pub use schema::WafGateConfig;
