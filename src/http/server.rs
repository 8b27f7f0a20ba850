//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the inspection middleware in front of the proxy handler
//! - Wire up ambient middleware (request ID, tracing, request timeout)
//! - Forward allowed requests to the single upstream
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::WafGateConfig;
use crate::http::middleware::inspection_middleware;
use crate::http::request::X_REQUEST_ID;
use crate::inspection::Dispatcher;
use crate::observability::metrics;

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    upstream: Authority,
}

impl HttpServer {
    /// Create a server that inspects with `dispatcher` and forwards to the configured upstream.
    pub fn new(config: &WafGateConfig, dispatcher: Dispatcher) -> Result<Self, InvalidUri> {
        let upstream: Authority = config.upstream.address.parse()?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            client,
            upstream: upstream.clone(),
        };

        let router = Self::build_router(
            Duration::from_secs(config.timeouts.request_secs),
            dispatcher,
            state,
        );
        Ok(Self { router, upstream })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, dispatcher: Dispatcher, state: AppState) -> Router {
        Router::new()
            .route("/", any(forward_handler))
            .route("/{*path}", any(forward_handler))
            .layer(middleware::from_fn_with_state(dispatcher, inspection_middleware))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.upstream,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward an allowed request to the upstream.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let request_id = parts
        .headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    let uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            metrics::record_upstream(&method, 400, start);
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    let mut upstream_request = Request::from_parts(parts, body);
    *upstream_request.uri_mut() = uri;

    match state.client.request(upstream_request).await {
        Ok(response) => {
            metrics::record_upstream(&method, response.status().as_u16(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %state.upstream,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream(&method, 502, start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
