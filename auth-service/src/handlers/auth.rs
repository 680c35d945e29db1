/// Authentication handlers
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AuthError, Result};
use crate::middleware::jwt_auth::{bearer_token, AuthUser};
use crate::models::{SessionDto, UserDto};
use crate::services::{ClientMeta, TokenValidity};
use crate::AppState;

const MAX_DEVICE_INFO_LEN: usize = 255;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50), custom(function = "validate_username"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

/// Usernames travel in identity headers (`X-User-Name`) at the gateway, so
/// the charset is restricted to ASCII word characters at registration.
fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset"))
    }
}

/// Token pair plus profile, returned by register/login/refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Register a new user.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    payload
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let meta = client_meta(&headers);
    let response = state.auth.register(&payload, &meta).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with username or email.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let meta = client_meta(&headers);
    let response = state.auth.login(&payload, &meta).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<AuthResponse>> {
    let response = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(response))
}

/// Log out: blacklist the presented access token and revoke the presented
/// refresh token. Both are optional and best-effort.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<LogoutRequest>>,
) -> Json<MessageResponse> {
    let access_token = bearer_token(&headers);
    let body = payload.map(|Json(b)| b).unwrap_or_default();

    state
        .auth
        .logout(access_token, body.refresh_token.as_deref())
        .await;

    Json(MessageResponse::new("Successfully logged out"))
}

/// Revoke every session of the authenticated user.
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MessageResponse>> {
    state.auth.logout_all(&user.username).await?;
    Ok(Json(MessageResponse::new(
        "Successfully logged out from all devices",
    )))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserDto>> {
    let profile = state.auth.get_profile(&user.username).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserDto>> {
    let profile = state
        .auth
        .update_profile(
            &user.username,
            payload.first_name.as_deref(),
            payload.last_name.as_deref(),
        )
        .await?;
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(AuthError::Validation(
            "Both current_password and new_password are required".to_string(),
        ));
    }
    if payload.new_password.len() < 8 {
        return Err(AuthError::Validation(
            "New password must be at least 8 characters".to_string(),
        ));
    }

    state
        .auth
        .change_password(&user.username, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::new(
        "Password changed successfully. Please log in again.",
    )))
}

/// Explicit token validation for downstream services.
pub async fn validate_token(
    State(state): State<AppState>,
    Json(payload): Json<ValidateTokenRequest>,
) -> Result<Json<Value>> {
    if payload.token.is_empty() {
        return Err(AuthError::Validation("Token is required".to_string()));
    }

    let body = match state.auth.validate_token(&payload.token).await? {
        TokenValidity::Valid => json!({ "valid": true }),
        TokenValidity::Invalid => json!({
            "valid": false,
            "error": "Invalid or expired token",
        }),
    };
    Ok(Json(body))
}

pub async fn get_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionDto>>> {
    let sessions = state.auth.active_sessions(&user.username).await?;
    Ok(Json(sessions))
}

pub async fn revoke_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    state.auth.revoke_session(&user.username, session_id).await?;
    Ok(Json(MessageResponse::new("Session revoked successfully")))
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Pull client IP and device description out of the request headers, the
/// same way the gateway reports them.
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
                .filter(|v| !v.is_empty())
        });

    let device_info = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| {
            if v.len() > MAX_DEVICE_INFO_LEN {
                v[..MAX_DEVICE_INFO_LEN].to_string()
            } else {
                v.to_string()
            }
        })
        .or_else(|| Some("Unknown Device".to_string()));

    ClientMeta {
        ip_address,
        device_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        let meta = client_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        let meta = client_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn device_info_is_truncated() {
        let long_agent = "a".repeat(400);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&long_agent).unwrap(),
        );

        let meta = client_meta(&headers);
        assert_eq!(meta.device_info.unwrap().len(), MAX_DEVICE_INFO_LEN);
    }

    #[test]
    fn missing_user_agent_gets_placeholder() {
        let meta = client_meta(&HeaderMap::new());
        assert_eq!(meta.device_info.as_deref(), Some("Unknown Device"));
        assert!(meta.ip_address.is_none());
    }

    #[test]
    fn register_request_validation() {
        let valid = RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "SecurePass123!".into(),
            first_name: None,
            last_name: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            password: "short".into(),
            ..valid.clone()
        };
        assert!(short_password.validate().is_err());

        let short_username = RegisterRequest {
            username: "ab".into(),
            ..valid
        };
        assert!(short_username.validate().is_err());
    }

    #[test]
    fn username_charset_is_header_safe() {
        let base = RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "SecurePass123!".into(),
            first_name: None,
            last_name: None,
        };

        for ok in ["alice_01", "alice-smith", "alice.smith", "Alice99"] {
            let req = RegisterRequest {
                username: ok.into(),
                ..base.clone()
            };
            assert!(req.validate().is_ok(), "{ok} should be accepted");
        }

        for bad in ["алиса", "alice smith", "alice\n", "ålice"] {
            let req = RegisterRequest {
                username: bad.into(),
                ..base.clone()
            };
            assert!(req.validate().is_err(), "{bad} should be rejected");
        }
    }
}
