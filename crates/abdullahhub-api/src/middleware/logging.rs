//! Request/response logging middleware.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use crate::extractors::client_ip::client_ip;

/// Logs request method, path, status, client, and duration.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_ip(request.headers(), request.extensions());
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        client = %client,
        duration_ms = start.elapsed().as_millis() as u64,
        "HTTP request"
    );

    response
}
