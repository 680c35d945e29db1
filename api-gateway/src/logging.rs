/// Request/response logging middleware
use std::time::Instant;

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

/// Best-effort client address: first entry of X-Forwarded-For, then
/// X-Real-IP, then "unknown".
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    "unknown".to_string()
}

pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let ip = client_ip(req.headers());
    let start = Instant::now();

    let response = next.run(req).await;

    // The auth filter runs inside this layer and attaches the verified
    // identity to the response it produces.
    let user_id = response
        .extensions()
        .get::<crate::filter::AuthenticatedUser>()
        .map(|u| u.0.clone());

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        client_ip = %ip,
        user_id = user_id.as_deref().unwrap_or("-"),
        "request completed"
    );

    response
}
