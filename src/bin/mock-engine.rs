//! Stand-in detection engine for local runs.
//!
//! Blocks any request whose path, query or body contains the configured pattern.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use clap::Parser;
use tokio::net::TcpListener;

use waf_gate::engine::http::{WireRequest, DETECT_PATH};
use waf_gate::engine::DetectionResult;
use waf_gate::observability::logging;

#[derive(Parser)]
#[command(name = "mock-engine")]
#[command(about = "Pattern-matching stand-in for a WAF detection engine", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Substring that triggers a block verdict
    #[arg(short = 'p', long, default_value = "attack")]
    block_pattern: String,

    /// Artificial latency added to every verdict
    #[arg(short, long, default_value_t = 0)]
    delay_ms: u64,
}

struct EngineState {
    pattern: String,
    delay: Duration,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging("info");

    let state = Arc::new(EngineState {
        pattern: cli.block_pattern,
        delay: Duration::from_millis(cli.delay_ms),
    });

    let app = Router::new()
        .route(DETECT_PATH, post(detect))
        .with_state(state);

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Mock engine listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn detect(
    State(state): State<Arc<EngineState>>,
    Json(request): Json<WireRequest>,
) -> Json<DetectionResult> {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let body = match request.body_bytes() {
        Ok(body) => body.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Undecodable request body");
            Vec::new()
        }
    };

    let pattern = state.pattern.as_str();
    let hit = request.path.contains(pattern)
        || request.query.as_deref().is_some_and(|q| q.contains(pattern))
        || String::from_utf8_lossy(&body).contains(pattern);

    if hit {
        let event_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            method = %request.method,
            path = %request.path,
            event_id = %event_id,
            "Blocked"
        );
        Json(DetectionResult::blocked(event_id))
    } else {
        Json(DetectionResult::allowed())
    }
}
