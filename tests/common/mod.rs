//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;

use waf_gate::config::{WafConfig, WafGateConfig};
use waf_gate::engine::http::{HttpEngineConnector, WireRequest, DETECT_PATH};
use waf_gate::engine::DetectionResult;
use waf_gate::{HttpServer, LifecycleManager, Shutdown};

#[derive(Clone)]
struct EngineState {
    pattern: &'static str,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

/// Start a detection engine that blocks anything containing `pattern`.
/// Returns its address and a counter of detection calls.
pub async fn start_engine(
    pattern: &'static str,
    delay: Duration,
) -> (SocketAddr, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = EngineState {
        pattern,
        delay,
        calls: calls.clone(),
    };

    let app = Router::new().route(DETECT_PATH, post(detect)).with_state(state);
    (serve(app).await, calls)
}

async fn detect(
    State(state): State<EngineState>,
    Json(request): Json<WireRequest>,
) -> Json<DetectionResult> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;

    let body = request.body_bytes().unwrap().unwrap_or_default();
    let hit = request.path.contains(state.pattern)
        || request.query.as_deref().is_some_and(|q| q.contains(state.pattern))
        || String::from_utf8_lossy(&body).contains(state.pattern);

    if hit {
        Json(DetectionResult::blocked(uuid::Uuid::new_v4().to_string()))
    } else {
        Json(DetectionResult::allowed())
    }
}

/// Start an engine that answers every detection call with 500.
pub async fn start_broken_engine() -> SocketAddr {
    let app = Router::new().route(
        DETECT_PATH,
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    serve(app).await
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start an upstream that answers "upstream" and counts hits.
pub async fn start_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().fallback(move |body: Bytes| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("upstream:{}", body.len())
        }
    });
    (serve(app).await, hits)
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running gateway. Dropping it does not stop the server; call `stop`.
pub struct Gate {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub lifecycle: LifecycleManager,
}

impl Gate {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stop(mut self) {
        self.shutdown.trigger();
        self.lifecycle.cleanup();
    }
}

pub fn waf_config(engines: &[SocketAddr]) -> WafConfig {
    WafConfig {
        engine_addrs: engines.iter().map(|a| a.to_string()).collect(),
        ..WafConfig::default()
    }
}

/// Provision engines and start a gateway in front of `upstream`.
pub async fn start_gate(waf: WafConfig, upstream: SocketAddr) -> Gate {
    let mut config = WafGateConfig::default();
    config.upstream.address = upstream.to_string();
    config.waf = waf;

    let shutdown = Shutdown::new();
    let mut lifecycle = LifecycleManager::new(shutdown.clone());
    let connector = HttpEngineConnector::new(Duration::from_millis(config.waf.connect_timeout_ms));
    let dispatcher = lifecycle.provision(&config.waf, Arc::new(connector)).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, dispatcher).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Gate {
        addr,
        shutdown,
        lifecycle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
