//! Block response construction.
//!
//! # Responsibilities
//! - Render the response sent in place of a blocked request
//! - Carry the engine's event id in both a header and the JSON body
//!
//! # Design Decisions
//! - The upstream is never contacted for a blocked request
//! - An event id that is not a valid header value is still reported in the body

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::engine::DetectionResult;

/// Status code returned for blocked requests.
pub const BLOCK_STATUS: StatusCode = StatusCode::NOT_IMPLEMENTED;

/// Header carrying the engine's event id.
pub static X_EVENT_ID: HeaderName = HeaderName::from_static("x-event-id");

pub const BLOCK_MESSAGE: &str = "Intercept illegal requests";

/// JSON body of a block response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    pub message: String,
    pub event_id: String,
}

/// Build the response for a blocked request.
pub fn block_response(result: &DetectionResult) -> Response {
    let body = BlockBody {
        message: BLOCK_MESSAGE.to_string(),
        event_id: result.event_id.clone(),
    };

    let mut response = (BLOCK_STATUS, Json(body)).into_response();
    match HeaderValue::from_str(&result.event_id) {
        Ok(value) => {
            response.headers_mut().insert(X_EVENT_ID.clone(), value);
        }
        Err(_) => {
            tracing::warn!(event_id = %result.event_id, "Event id is not a valid header value");
        }
    }
    response
}
