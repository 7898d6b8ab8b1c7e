use axum::{extract::Request, middleware::Next, response::Response};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

use super::client_ip::client_ip;

/// Emit one info event per request: method, path, client, status, elapsed.
pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = request
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| client_ip(request.headers(), info.0.ip()).to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let response = next.run(request).await;

    info!(
        target: "magpie::access",
        method = %method,
        path = %path,
        client = %client,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );

    response
}
