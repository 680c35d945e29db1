/// Upstream request forwarding
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    response::Response,
};

use crate::error::GatewayError;
use crate::GatewayState;

/// Request bodies above this size are rejected before forwarding.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Resolve the upstream base URL for a request path, or None when no
/// service owns the path.
fn upstream_base<'a>(auth_base: &'a str, task_base: &'a str, path: &str) -> Option<&'a str> {
    if path.starts_with("/api/auth") {
        return Some(auth_base);
    }
    for prefix in ["/api/tasks", "/api/categories", "/api/tags", "/api/comments"] {
        if path.starts_with(prefix) {
            return Some(task_base);
        }
    }
    None
}

/// Fallback handler: forwards the request to whichever upstream owns the
/// path, preserving method, query string, headers and body. The Host header
/// is dropped so the HTTP client sets one matching the upstream.
pub async fn forward(
    State(state): State<GatewayState>,
    req: Request,
) -> Result<Response, GatewayError> {
    let base = upstream_base(&state.auth_base, &state.task_base, req.uri().path())
        .ok_or(GatewayError::RouteNotFound)?;
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let url = format!("{}{}", base, path_and_query);

    let (parts, body) = req.into_parts();
    let body_bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::BadGateway(format!("failed to read request body: {}", e)))?;

    let mut headers = parts.headers;
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body_bytes)
        .send()
        .await
        .map_err(|e| GatewayError::Unavailable(format!("upstream unreachable: {}", e)))?;

    let status = upstream.status();
    let mut builder = Response::builder().status(status);
    for (name, value) in upstream.headers() {
        if name != header::TRANSFER_ENCODING && name != header::CONNECTION {
            builder = builder.header(name, value);
        }
    }

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| GatewayError::BadGateway(format!("failed to read upstream body: {}", e)))?;

    builder
        .body(Body::from(bytes))
        .map_err(|e| GatewayError::BadGateway(format!("failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_path_prefix() {
        let auth = "http://auth:8081";
        let tasks = "http://tasks:8082";

        assert_eq!(upstream_base(auth, tasks, "/api/auth/login"), Some(auth));
        assert_eq!(upstream_base(auth, tasks, "/api/auth/sessions"), Some(auth));
        assert_eq!(upstream_base(auth, tasks, "/api/tasks/123"), Some(tasks));
        assert_eq!(upstream_base(auth, tasks, "/api/categories"), Some(tasks));
        assert_eq!(upstream_base(auth, tasks, "/api/tags"), Some(tasks));
        assert_eq!(upstream_base(auth, tasks, "/api/comments/5"), Some(tasks));
        assert_eq!(upstream_base(auth, tasks, "/api/unknown"), None);
        assert_eq!(upstream_base(auth, tasks, "/metrics"), None);
    }
}
