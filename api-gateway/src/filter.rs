/// Authentication filter
///
/// Runs before routing to upstream services. Public paths pass through
/// untouched; everything else must carry a valid, non-revoked Bearer access
/// token. On success the verified identity is injected as request headers so
/// downstream services never re-verify the JWT themselves.
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jwt_auth::TokenError;

use crate::error::GatewayError;
use crate::GatewayState;

/// Paths reachable without a token. Exact matches only; a prefix match
/// would accidentally open authenticated sub-paths.
const PUBLIC_PATHS: &[&str] = &[
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/api/auth/health",
    "/api/tasks/health",
    "/health",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Attached to responses that passed authentication so the logging layer,
/// which runs outside this filter, can report who made the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// Strip the `Bearer ` prefix off the Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub async fn authenticate(
    State(state): State<GatewayState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if is_public_path(&path) {
        // Identity headers are only ever set by this filter; a caller must
        // not be able to smuggle them past an unauthenticated path.
        let headers = req.headers_mut();
        headers.remove("x-user-id");
        headers.remove("x-user-name");
        headers.remove("x-token-valid");
        return next.run(req).await;
    }

    let Some(token) = bearer_token(req.headers()) else {
        return GatewayError::unauthorized("Missing or invalid Authorization header", &path)
            .into_response();
    };
    let token = token.to_string();

    let claims = match state.codec.decode_access(&token) {
        Ok(claims) => claims,
        Err(e) => {
            let message = match e {
                TokenError::Expired => "Token has expired",
                TokenError::WrongType => "Not an access token",
                _ => "Invalid token",
            };
            return GatewayError::unauthorized(message, &path).into_response();
        }
    };

    // Revocation check is authoritative: if Redis cannot answer, the request
    // is rejected rather than let a possibly revoked token through.
    match state.blacklist.is_blacklisted(&token).await {
        Ok(false) => {}
        Ok(true) => {
            return GatewayError::unauthorized("Token has been revoked", &path).into_response();
        }
        Err(e) => {
            return GatewayError::Unavailable(format!("token revocation check failed: {}", e))
                .into_response();
        }
    }

    let (user_id, username) = match (
        HeaderValue::from_str(&claims.user_id.to_string()),
        HeaderValue::from_str(&claims.sub),
    ) {
        (Ok(id), Ok(name)) => (id, name),
        _ => {
            return GatewayError::unauthorized("Token claims are not header-safe", &path)
                .into_response();
        }
    };

    let client_host = req.headers().get(header::HOST).cloned();
    let headers = req.headers_mut();
    headers.insert("x-user-id", user_id);
    headers.insert("x-user-name", username);
    headers.insert("x-token-valid", HeaderValue::from_static("true"));
    if let Some(host) = client_host {
        headers.insert("x-forwarded-host", host);
    }

    let mut response = next.run(req).await;
    response
        .extensions_mut()
        .insert(AuthenticatedUser(claims.user_id.to_string()));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    const TEST_SECRET: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    /// Returns None when Redis is unreachable so these tests skip instead of
    /// failing on machines without a local Redis.
    async fn gateway_state() -> Option<GatewayState> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = redis::Client::open(url).ok()?;
        let conn = redis::aio::ConnectionManager::new(client).await.ok()?;

        let codec =
            jwt_auth::JwtCodec::new(TEST_SECRET, "todo-app", 900_000, 604_800_000).ok()?;
        Some(GatewayState {
            codec: Arc::new(codec),
            blacklist: Arc::new(jwt_auth::TokenBlacklist::new(conn)),
            client: reqwest::Client::new(),
            auth_base: "http://127.0.0.1:1".to_string(),
            task_base: "http://127.0.0.1:1".to_string(),
        })
    }

    fn filtered_app(state: GatewayState) -> Router {
        Router::new()
            .route(
                "/api/tasks",
                get(|headers: HeaderMap| async move {
                    headers
                        .get("x-user-name")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                authenticate,
            ))
            .with_state(state)
    }

    #[tokio::test]
    async fn valid_token_passes_and_injects_identity() {
        let Some(state) = gateway_state().await else {
            eprintln!("skipping: redis unavailable");
            return;
        };
        let token = state
            .codec
            .issue_access_token(Uuid::new_v4(), "alice", "alice@example.com", true)
            .unwrap();

        let response = filtered_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/tasks")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"alice");
    }

    #[tokio::test]
    async fn spoofed_identity_headers_are_dropped_on_public_paths() {
        let Some(state) = gateway_state().await else {
            eprintln!("skipping: redis unavailable");
            return;
        };

        let app = Router::new()
            .route(
                "/api/auth/login",
                get(|headers: HeaderMap| async move {
                    headers
                        .get("x-user-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                authenticate,
            ))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/login")
                    .header("x-user-id", "11111111-1111-1111-1111-111111111111")
                    .header("x-token-valid", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let Some(state) = gateway_state().await else {
            eprintln!("skipping: redis unavailable");
            return;
        };

        let response = filtered_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_rejected_at_the_gateway() {
        let Some(state) = gateway_state().await else {
            eprintln!("skipping: redis unavailable");
            return;
        };
        let token = state
            .codec
            .issue_refresh_token(Uuid::new_v4(), "alice")
            .unwrap();

        let response = filtered_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/tasks")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn public_paths_are_exact_matches() {
        assert!(is_public_path("/api/auth/login"));
        assert!(is_public_path("/api/auth/register"));
        assert!(is_public_path("/api/auth/refresh"));
        assert!(is_public_path("/health"));

        assert!(!is_public_path("/api/auth/login/extra"));
        assert!(!is_public_path("/api/auth/logout"));
        assert!(!is_public_path("/api/tasks"));
        assert!(!is_public_path(""));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
    }
}
