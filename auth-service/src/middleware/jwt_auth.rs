/// JWT authentication extractor
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::error::AuthError;
use crate::AppState;

/// Verified identity extracted from a Bearer access token.
///
/// Verification is codec (signature, type, expiry) plus blacklist; the
/// ordering keeps Redis out of the path for tokens that fail cheap local
/// checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Strip the `Bearer ` prefix off the Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::Unauthorized)?;

        let claims = state.codec.decode_access(token)?;

        if state.blacklist.is_blacklisted(token).await? {
            return Err(AuthError::TokenExpired);
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
        })
    }
}
