//! Inspection middleware.
//! Asks a detection engine about every request before it reaches the upstream.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::split_for_inspection;
use crate::http::response::block_response;
use crate::inspection::{Dispatcher, Verdict};

pub async fn inspection_middleware(
    State(dispatcher): State<Dispatcher>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (inspect, request) =
        match split_for_inspection(request, dispatcher.max_body_bytes(), remote_addr).await {
            Ok(split) => split,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
            }
        };

    match dispatcher.inspect(inspect).await {
        Ok(Verdict::Block(result)) => block_response(&result),
        Ok(Verdict::Forward(_)) => next.run(request).await,
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{middleware, routing::any, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::engine::mock::MockConnector;
    use crate::engine::BackendAddress;
    use crate::http::response::{BLOCK_STATUS, X_EVENT_ID};
    use crate::load_balancer::{EnginePool, PoolConfig, SelectionPolicy};

    fn dispatcher(connector: MockConnector, engines: usize) -> Dispatcher {
        let addrs: Vec<BackendAddress> = (0..engines)
            .map(|i| format!("10.0.0.{}:8000", i + 1).parse().unwrap())
            .collect();
        let pool = EnginePool::from_addresses(&addrs, PoolConfig::default(), Arc::new(connector));
        Dispatcher::new(
            Arc::new(pool),
            Arc::new(SelectionPolicy::default()),
            Duration::from_millis(100),
            1024,
        )
    }

    fn app(dispatcher: Dispatcher, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/{*path}",
                any(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "upstream"
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(dispatcher, inspection_middleware))
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn blocked_request_never_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(dispatcher(MockConnector::blocking("evt-1"), 1), hits.clone());

        let response = app.oneshot(get("/admin")).await.unwrap();

        assert_eq!(response.status(), BLOCK_STATUS);
        assert_eq!(response.headers()[&X_EVENT_ID], "evt-1");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn allowed_request_is_forwarded() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(dispatcher(MockConnector::allowing(), 1), hits.clone());

        let response = app.oneshot(get("/index.html")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn engine_failure_fails_open() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(dispatcher(MockConnector::blocking("evt-2").failing(), 1), hits.clone());

        let response = app.oneshot(get("/search?q=1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_engines_is_service_unavailable() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(dispatcher(MockConnector::allowing(), 0), hits.clone());

        let response = app.oneshot(get("/search?q=1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
