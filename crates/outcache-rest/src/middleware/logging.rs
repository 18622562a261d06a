//! Request logging middleware.

use crate::context::CacheOutcome;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Logs every request with its status, duration and cache outcome.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    let cache = response
        .extensions()
        .get::<CacheOutcome>()
        .map_or("none", CacheOutcome::as_str);

    info!(
        target: "http",
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        cache,
        duration_ms = %duration.as_millis(),
        "HTTP request completed"
    );

    response
}
