//! API middleware
//!
//! Every request carries an `x-request-id` (taken from the caller or
//! generated) that appears in the HTTP span, the audit line and the response.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, info_span, warn, Span};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

/// Span for `TraceLayer`, tagged with the request id
pub fn request_span(request: &Request<Body>) -> Span {
    info_span!(
        "http_request",
        request_id = %request_id(request),
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Audit logging middleware
///
/// One line per API request with its outcome. Client and server errors are
/// logged at `warn` so rejected billing actions stand out.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request_id(&request).to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    if response.status().is_client_error() || response.status().is_server_error() {
        warn!(%method, %uri, %request_id, status, duration_ms, "Billing request rejected");
    } else {
        info!(%method, %uri, %request_id, status, duration_ms, "Billing request");
    }

    response
}
