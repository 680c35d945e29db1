use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

/// Domain error taxonomy for the authentication core.
///
/// Infrastructure faults (`Unavailable`) are kept distinct from credential
/// and token failures; a store outage must never surface as
/// `InvalidCredentials` or `Unauthorized`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username/email or password")]
    InvalidCredentials,

    #[error("Account is locked due to too many failed login attempts")]
    AccountLocked,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Username or email already exists")]
    DuplicateIdentity,

    #[error("Invalid or expired token")]
    TokenExpired,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Missing or invalid authorization")]
    Unauthorized,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::AccountLocked => "AccountLocked",
            AuthError::AccountDisabled => "AccountDisabled",
            AuthError::DuplicateIdentity => "DuplicateIdentity",
            AuthError::TokenExpired => "TokenExpired",
            AuthError::NotFound(_) => "NotFound",
            AuthError::Unauthorized => "Unauthorized",
            AuthError::Unavailable(_) => "Unavailable",
            AuthError::Validation(_) => "Validation",
            AuthError::Internal(_) => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountLocked => StatusCode::LOCKED,
            AuthError::AccountDisabled => StatusCode::FORBIDDEN,
            AuthError::DuplicateIdentity => StatusCode::CONFLICT,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AuthError::NotFound("Record"),
            other => AuthError::Unavailable(format!("database error: {}", other)),
        }
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Unavailable(format!("revocation store error: {}", err))
    }
}

impl From<jwt_auth::TokenError> for AuthError {
    fn from(_err: jwt_auth::TokenError) -> Self {
        // Malformed, bad-signature, wrong-type and expired tokens all present
        // the same way to callers.
        AuthError::TokenExpired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_collapse_to_token_expired() {
        let err: AuthError = jwt_auth::TokenError::Malformed.into();
        assert!(matches!(err, AuthError::TokenExpired));
        let err: AuthError = jwt_auth::TokenError::WrongType.into();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn store_faults_map_to_unavailable() {
        let err: AuthError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AuthError::Unavailable(_)));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AuthError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AuthError::NotFound(_)));
    }
}
