//! Correlation id assignment and echo

use axum::http::{HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Generates an id for requests that arrive without one
pub fn set_correlation_id() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(CORRELATION_ID_HEADER), MakeRequestUuid)
}

/// Copies the request's id onto the response
pub fn propagate_correlation_id() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(CORRELATION_ID_HEADER))
}

pub fn correlation_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
