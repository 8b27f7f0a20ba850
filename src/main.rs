//! waf-gate: inline WAF reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ inspection middleware ──▶ dispatcher
//!                                                                   │
//!                                         selection policy ◀────────┤
//!                                         engine pool ◀─────────────┤
//!                                         connection pool ◀─────────┘
//!                                                │ detect (deadline)
//!                                                ▼
//!                                         detection engine
//!
//!     Block   ◀── 501 + X-Event-ID
//!     Forward ──▶ upstream ──▶ Client Response
//! ```
//!
//! Cross-cutting: config, lifecycle (startup/shutdown), observability, resilience (timeouts).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use waf_gate::config::load_config;
use waf_gate::engine::http::HttpEngineConnector;
use waf_gate::lifecycle::signals::shutdown_signal;
use waf_gate::observability::{logging, metrics};
use waf_gate::{HttpServer, LifecycleManager, Shutdown};

#[derive(Parser)]
#[command(name = "waf-gate")]
#[command(
    about = "Reverse proxy that inspects every request with an external WAF engine",
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "waf-gate.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging("info");
            tracing::error!(
                path = %cli.config.display(),
                error = %e,
                "Failed to load configuration"
            );
            return Err(e.into());
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("waf-gate v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        engines = config.waf.engine_addrs.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let mut lifecycle = LifecycleManager::new(shutdown.clone());

    let connector = HttpEngineConnector::new(Duration::from_millis(config.waf.connect_timeout_ms));
    let dispatcher = lifecycle.provision(&config.waf, Arc::new(connector)).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, dispatcher)?;
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.trigger();
    });

    let result = server.run(listener, server_shutdown).await;
    lifecycle.cleanup();

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
