//! Request handling and transformation.
//!
//! # Responsibilities
//! - Extract the inspection view of a client request (host, path, headers)
//! - Buffer small bodies so the engine and the upstream both see them
//! - Hand back an equivalent request for forwarding
//!
//! # Design Decisions
//! - Bodies are inspected only when Content-Length is present and within the limit
//! - Oversized or chunked bodies are streamed through uninspected
//! - Non-UTF-8 header values are passed to the engine lossily

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, HeaderName, Request};

use crate::engine::InspectRequest;

/// Correlation header set on every request.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Split a client request into the engine's view and a request to forward.
pub async fn split_for_inspection(
    request: Request<Body>,
    max_body_bytes: usize,
    remote_addr: Option<SocketAddr>,
) -> Result<(InspectRequest, Request<Body>), axum::Error> {
    let (parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let inspectable = content_length(&parts.headers).is_some_and(|len| len <= max_body_bytes);

    let (inspected_body, body) = if inspectable {
        let bytes = axum::body::to_bytes(body, max_body_bytes).await?;
        (Some(bytes.clone()), Body::from(bytes))
    } else {
        (None, body)
    };

    let inspect = InspectRequest {
        method: parts.method.to_string(),
        host,
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        headers,
        body: inspected_body.filter(|b| !b.is_empty()),
        remote_addr,
    };

    Ok((inspect, Request::from_parts(parts, body)))
}

fn content_length(headers: &axum::http::HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "shop.example.com")
            .header(header::CONTENT_LENGTH, body.len())
            .header("x-custom", "yes")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn extracts_request_line_and_headers() {
        let remote: SocketAddr = "192.0.2.7:51000".parse().unwrap();
        let (inspect, _) = split_for_inspection(post("/cart/add?id=7", "qty=1"), 1024, Some(remote))
            .await
            .unwrap();

        assert_eq!(inspect.method, "POST");
        assert_eq!(inspect.host, "shop.example.com");
        assert_eq!(inspect.path, "/cart/add");
        assert_eq!(inspect.query.as_deref(), Some("id=7"));
        assert_eq!(inspect.remote_addr, Some(remote));
        assert!(inspect
            .headers
            .contains(&("x-custom".to_string(), "yes".to_string())));
    }

    #[tokio::test]
    async fn small_body_is_inspected_and_preserved() {
        let (inspect, forwarded) = split_for_inspection(post("/", "qty=1"), 1024, None)
            .await
            .unwrap();

        assert_eq!(inspect.body.as_deref(), Some(&b"qty=1"[..]));
        let body = axum::body::to_bytes(forwarded.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"qty=1");
    }

    #[tokio::test]
    async fn oversized_body_is_skipped_but_forwarded() {
        let (inspect, forwarded) = split_for_inspection(post("/", "0123456789"), 4, None)
            .await
            .unwrap();

        assert!(inspect.body.is_none());
        let body = axum::body::to_bytes(forwarded.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"0123456789");
    }

    #[tokio::test]
    async fn host_falls_back_to_uri_authority() {
        let request = Request::builder()
            .uri("http://api.example.com/v1")
            .body(Body::empty())
            .unwrap();
        let (inspect, _) = split_for_inspection(request, 1024, None).await.unwrap();

        assert_eq!(inspect.host, "api.example.com");
        assert!(inspect.body.is_none());
    }
}
