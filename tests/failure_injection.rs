//! Failure injection tests for the gateway.
//!
//! Every engine-side failure must fail open: the request reaches the upstream.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use waf_gate::config::{ConfigError, WafConfig};
use waf_gate::engine::http::HttpEngineConnector;
use waf_gate::{LifecycleManager, Shutdown};

mod common;

#[tokio::test]
async fn test_slow_engine_fails_open_on_timeout() {
    let (engine, calls) = common::start_engine("/", Duration::from_millis(500)).await;
    let (upstream, hits) = common::start_upstream().await;

    let waf = WafConfig {
        timeout_ms: Some(50),
        ..common::waf_config(&[engine])
    };
    let gate = common::start_gate(waf, upstream).await;

    let start = Instant::now();
    let res = common::client().get(gate.url("/anything")).send().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), 200, "Late verdicts are ignored");
    assert!(elapsed < Duration::from_millis(450), "Took {:?}", elapsed);

    // The abandoned call finishes in the background; its block verdict is discarded.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "Forwarded exactly once");

    gate.stop();
}

#[tokio::test]
async fn test_unreachable_engine_fails_open() {
    let engine = common::closed_port().await;
    let (upstream, hits) = common::start_upstream().await;
    let gate = common::start_gate(common::waf_config(&[engine]), upstream).await;

    let res = common::client().get(gate.url("/login")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    gate.stop();
}

#[tokio::test]
async fn test_engine_error_status_fails_open() {
    let engine = common::start_broken_engine().await;
    let (upstream, hits) = common::start_upstream().await;
    let gate = common::start_gate(common::waf_config(&[engine]), upstream).await;

    let res = common::client().get(gate.url("/attack")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    gate.stop();
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    let (engine, _) = common::start_engine("attack", Duration::ZERO).await;
    let upstream = common::closed_port().await;
    let gate = common::start_gate(common::waf_config(&[engine]), upstream).await;

    let res = common::client().get(gate.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);

    gate.stop();
}

#[tokio::test]
async fn test_missing_engine_addresses_abort_provisioning() {
    let mut lifecycle = LifecycleManager::new(Shutdown::new());
    let result = lifecycle
        .provision(&WafConfig::default(), Arc::new(HttpEngineConnector::default()))
        .await;

    assert!(matches!(result, Err(ConfigError::Validation(_))));
    assert!(lifecycle.engine_pool().is_none());
}
