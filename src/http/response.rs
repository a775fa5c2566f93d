//! Response rendering.
//!
//! # Responsibilities
//! - Map an `InvocationOutcome` to status, headers and body
//! - Mark responses complete or incomplete
//! - Advertise caching only for complete responses
//!
//! # Decision Table
//! ```text
//! outcome                      status  body                completed  cache-control
//! MethodNotAllowed             405     "\n"                -          -
//! Timeout                      500     generic error       false      -
//! Success, complete, has data  200     JSON data           true       if ttl > 0
//! Success, anything else       200     JSON data or {}     false      -
//! ErrorWithPartialData         200     JSON partial data   false      -
//! ErrorNoData                  500     error text          -          -
//! ```
//!
//! # Design Decisions
//! - Error and completeness are orthogonal; only the presence of data decides
//!   between 200 and 500 when the pipeline failed
//! - Plain-text bodies end with a newline
//! - The identification banner is added by the handler, not here

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::{Map, Value};

use crate::pipeline::{InvocationOutcome, PipelineError};

/// Identification banner set on every response.
pub const GATEWAY_HEADER: HeaderName = HeaderName::from_static("x-edge-gateway");
pub const GATEWAY_HEADER_VALUE: HeaderValue =
    HeaderValue::from_static(concat!("Version ", env!("CARGO_PKG_VERSION")));

/// Completion state of the rendered payload.
pub const COMPLETED_HEADER: HeaderName = HeaderName::from_static("x-edge-gateway-completed");
pub const COMPLETE_VALUE: HeaderValue = HeaderValue::from_static("true");
pub const INCOMPLETE_VALUE: HeaderValue = HeaderValue::from_static("false");

/// Body of the timeout branch.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

const JSON_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("application/json");
const TEXT_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
const NOSNIFF: HeaderValue = HeaderValue::from_static("nosniff");

/// `Cache-Control` value for a cache lifetime, `None` when caching is off.
pub fn cache_control_value(ttl: Duration) -> Option<HeaderValue> {
    if ttl.is_zero() {
        return None;
    }
    HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())).ok()
}

/// Render the outcome of one request.
pub fn render(outcome: InvocationOutcome, cache_control: Option<&HeaderValue>) -> Response {
    match outcome {
        InvocationOutcome::MethodNotAllowed => plain_text(StatusCode::METHOD_NOT_ALLOWED, ""),
        InvocationOutcome::Timeout => {
            let mut response = plain_text(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE);
            response.headers_mut().insert(COMPLETED_HEADER, INCOMPLETE_VALUE);
            response
        }
        InvocationOutcome::ErrorNoData(err) => {
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
        InvocationOutcome::ErrorWithPartialData(partial, _) => json(&partial.data, false, None),
        InvocationOutcome::Success(Some(response)) => {
            let complete = response.is_complete && response.has_data();
            json(&response.data, complete, cache_control.filter(|_| complete))
        }
        InvocationOutcome::Success(None) => json(&Map::new(), false, None),
    }
}

fn json(data: &Map<String, Value>, complete: bool, cache_control: Option<&HeaderValue>) -> Response {
    let body = match serde_json::to_vec(data) {
        Ok(body) => body,
        Err(err) => return render(InvocationOutcome::ErrorNoData(PipelineError::Encode(err)), None),
    };

    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, JSON_CONTENT_TYPE);
    headers.insert(
        COMPLETED_HEADER,
        if complete { COMPLETE_VALUE } else { INCOMPLETE_VALUE },
    );
    if let Some(value) = cache_control {
        headers.insert(header::CACHE_CONTROL, value.clone());
    }
    response
}

fn plain_text(status: StatusCode, message: &str) -> Response {
    let mut response = Response::new(Body::from(format!("{message}\n")));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, TEXT_CONTENT_TYPE);
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF);
    response
}
