//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/inspection.rs (build inspection view, ask the dispatcher)
//!         → Block: response.rs (501 + X-Event-ID), upstream never contacted
//!         → Forward: server.rs proxy handler → upstream
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{block_response, BLOCK_STATUS, X_EVENT_ID};
pub use server::HttpServer;
