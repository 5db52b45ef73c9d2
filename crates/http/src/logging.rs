//! Access log middleware: one line per request with method, path, status and
//! duration.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16();

    if status >= 500 {
        tracing::warn!(
            method = %method,
            path = %path,
            status,
            duration_ms,
            "request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status,
            duration_ms,
            "request completed"
        );
    }

    response
}
