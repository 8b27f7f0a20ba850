//! Detection engine client subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → InspectRequest (method, host, path, headers, body)
//!     → EngineConnection::detect (one call per request)
//!     → DetectionResult { blocked, event_id }
//! ```
//!
//! # Design Decisions
//! - The wire protocol is owned by the connection type; pools and dispatch
//!   only see the `Connector` / `EngineConnection` seam
//! - Connections are stateful and exclusively borrowed for one call
//! - Transport and protocol failures are distinct error kinds

pub mod address;
pub mod http;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use address::BackendAddress;

/// Verdict returned by a detection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the engine wants the request stopped.
    pub blocked: bool,
    /// Engine-side identifier correlating the decision with its logs.
    #[serde(default)]
    pub event_id: String,
}

impl DetectionResult {
    pub fn allowed() -> Self {
        Self {
            blocked: false,
            event_id: String::new(),
        }
    }

    pub fn blocked(event_id: impl Into<String>) -> Self {
        Self {
            blocked: true,
            event_id: event_id.into(),
        }
    }
}

/// The request attributes handed to a detection engine.
#[derive(Debug, Clone, Default)]
pub struct InspectRequest {
    pub method: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Buffered request body. `None` when the body was not inspected.
    pub body: Option<Bytes>,
    pub remote_addr: Option<SocketAddr>,
}

/// Errors raised by a detection call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection could not be established or broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// Engine answered with something we could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A single live connection to a detection engine.
#[async_trait]
pub trait EngineConnection: Send + fmt::Debug {
    /// Submit one request for inspection.
    async fn detect(&mut self, request: &InspectRequest) -> Result<DetectionResult, EngineError>;

    /// Whether the connection can be handed to another caller.
    fn is_healthy(&self) -> bool;
}

/// Opens new connections to an engine address.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    async fn connect(
        &self,
        addr: &BackendAddress,
    ) -> Result<Box<dyn EngineConnection>, EngineError>;
}
