//! Request span for `TraceLayer`.
//!
//! `request_id` and `account_id` start empty; the request ID and identity
//! middleware record them once known.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
};
use tower_http::trace::{DefaultOnResponse, OnResponse};
use tracing::Span;

/// Create the span wrapping a request.
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = tracing::field::Empty,
        account_id = tracing::field::Empty,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    )
}

/// Record status and latency on the request span, then log the response.
pub fn record_response(response: &Response<Body>, latency: Duration, span: &Span) {
    span.record("status", response.status().as_u16());
    span.record(
        "latency_ms",
        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
    );
    DefaultOnResponse::default().on_response(response, latency, span);
}
