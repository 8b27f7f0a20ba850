//! JSON-over-HTTP/1.1 engine client.
//!
//! # Protocol
//! ```text
//! POST /detect HTTP/1.1           (kept-alive, one call at a time)
//! content-type: application/json
//!
//! {"method": "GET", "host": "...", "path": "/", "headers": [["k", "v"]], "body": "<base64>"}
//!
//! HTTP/1.1 200 OK
//! {"blocked": true, "event_id": "..."}
//! ```
//!
//! Any non-2xx status or undecodable reply is a protocol error.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use crate::engine::{
    BackendAddress, Connector, DetectionResult, EngineConnection, EngineError, InspectRequest,
};

/// Path the engine serves detection calls on.
pub const DETECT_PATH: &str = "/detect";

/// Request envelope sent to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub method: String,
    pub host: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Base64 (standard alphabet) request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
}

impl WireRequest {
    /// Decode the base64 body, if one was sent.
    pub fn body_bytes(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        self.body.as_deref().map(|b| STANDARD.decode(b)).transpose()
    }
}

impl From<&InspectRequest> for WireRequest {
    fn from(request: &InspectRequest) -> Self {
        Self {
            method: request.method.clone(),
            host: request.host.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            headers: request.headers.clone(),
            body: request.body.as_ref().map(|b| STANDARD.encode(b)),
            remote_addr: request.remote_addr.map(|a| a.to_string()),
        }
    }
}

/// Opens HTTP/1.1 connections to detection engines.
#[derive(Debug, Clone)]
pub struct HttpEngineConnector {
    connect_timeout: Duration,
}

impl HttpEngineConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for HttpEngineConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Connector for HttpEngineConnector {
    async fn connect(
        &self,
        addr: &BackendAddress,
    ) -> Result<Box<dyn EngineConnection>, EngineError> {
        let connect = TcpStream::connect(addr.socket_addr());
        let stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                EngineError::Transport(format!(
                    "connect timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(engine = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let (sender, connection) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let engine = *addr;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(
                    engine = %engine,
                    error = %e,
                    "Engine connection closed with error"
                );
            }
        });

        tracing::debug!(engine = %addr, "Engine connection established");

        Ok(Box::new(HttpEngineConnection {
            addr: *addr,
            sender,
            broken: false,
        }))
    }
}

/// One kept-alive HTTP/1.1 connection to an engine.
#[derive(Debug)]
pub struct HttpEngineConnection {
    addr: BackendAddress,
    sender: SendRequest<Full<Bytes>>,
    broken: bool,
}

impl HttpEngineConnection {
    async fn call(&mut self, request: &InspectRequest) -> Result<DetectionResult, EngineError> {
        let payload = serde_json::to_vec(&WireRequest::from(request))
            .map_err(|e| EngineError::Protocol(e.to_string()))?;

        let req = Request::builder()
            .method(Method::POST)
            .uri(DETECT_PATH)
            .header(HOST, self.addr.to_string())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| EngineError::Protocol(e.to_string()))?;

        self.sender
            .ready()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let response = self
            .sender
            .send_request(req)
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            return Err(EngineError::Protocol(format!("engine replied with status {}", status)));
        }

        serde_json::from_slice(&body).map_err(|e| EngineError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl EngineConnection for HttpEngineConnection {
    async fn detect(&mut self, request: &InspectRequest) -> Result<DetectionResult, EngineError> {
        // Marked broken until the exchange completes, so a call abandoned
        // mid-flight is never reused.
        self.broken = true;
        let result = self.call(request).await;
        self.broken = result.is_err();
        result
    }

    fn is_healthy(&self) -> bool {
        !self.broken && !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_request_carries_body_as_base64() {
        let request = InspectRequest {
            method: "POST".into(),
            host: "shop.example".into(),
            path: "/login".into(),
            query: Some("next=%2F".into()),
            headers: vec![("content-type".into(), "application/octet-stream".into())],
            body: Some(Bytes::from_static(&[0, 159, 146, 150])),
            remote_addr: Some("10.1.2.3:5555".parse().unwrap()),
        };

        let wire = WireRequest::from(&request);
        let json = serde_json::to_string(&wire).unwrap();
        let decoded: WireRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.path, "/login");
        assert_eq!(decoded.remote_addr.as_deref(), Some("10.1.2.3:5555"));
        assert_eq!(decoded.body_bytes().unwrap(), Some(vec![0, 159, 146, 150]));
    }

    #[test]
    fn detection_result_tolerates_missing_event_id() {
        let result: DetectionResult = serde_json::from_str(r#"{"blocked": false}"#).unwrap();
        assert_eq!(result, DetectionResult::allowed());
    }

    #[tokio::test]
    async fn connect_to_closed_port_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = BackendAddress::from(listener.local_addr().unwrap());
        drop(listener);

        let connector = HttpEngineConnector::new(Duration::from_millis(500));
        let err = connector.connect(&addr).await.unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
