//! Authentication orchestrator.
//!
//! Composes the credential store, lockout policy, token codec, revocation
//! store and refresh-token ledger into the register / login / refresh /
//! logout / password flows. Holds no state of its own between requests.

use chrono::{Duration, Utc};
use jwt_auth::{JwtCodec, TokenBlacklist};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{token_repo, user_repo};
use crate::error::{AuthError, Result};
use crate::handlers::{AuthResponse, LoginRequest, RegisterRequest};
use crate::models::{SessionDto, User, UserDto};
use crate::security::lockout::LockoutPolicy;
use crate::security::password;

/// Request metadata recorded alongside issued refresh tokens.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

/// Result of an explicit `/validate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidity {
    Valid,
    Invalid,
}

pub struct AuthService {
    db: PgPool,
    codec: Arc<JwtCodec>,
    blacklist: Arc<TokenBlacklist>,
    lockout: LockoutPolicy,
}

impl AuthService {
    pub fn new(
        db: PgPool,
        codec: Arc<JwtCodec>,
        blacklist: Arc<TokenBlacklist>,
        lockout: LockoutPolicy,
    ) -> Self {
        Self {
            db,
            codec,
            blacklist,
            lockout,
        }
    }

    /// Register a new user and hand back an initial token pair.
    pub async fn register(&self, req: &RegisterRequest, meta: &ClientMeta) -> Result<AuthResponse> {
        if user_repo::exists_by_username_or_email(&self.db, &req.username, &req.email).await? {
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = password::hash_password(&req.password)?;
        let user = user_repo::create_user(
            &self.db,
            &req.username,
            &req.email,
            &password_hash,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
        )
        .await?;

        info!(user_id = %user.id, username = %user.username, "user registered");

        self.issue_token_pair(&user, meta).await
    }

    /// Authenticate with username-or-email plus password.
    ///
    /// Lazy unlock runs before the enabled/locked check; a credential
    /// mismatch feeds the lockout policy before the error is returned. The
    /// unknown-identifier and wrong-password cases are indistinguishable to
    /// the caller.
    pub async fn login(&self, req: &LoginRequest, meta: &ClientMeta) -> Result<AuthResponse> {
        let now = Utc::now();

        let Some(mut user) =
            user_repo::find_by_username_or_email(&self.db, &req.username_or_email).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if self.lockout.should_unlock(&user, now) {
            user_repo::unlock_account(&self.db, user.id).await?;
            user.account_locked = false;
            user.login_attempts = 0;
        }

        if !self.lockout.can_login(&user, now) {
            // Locked takes precedence when the account is also disabled.
            return if user.account_locked {
                Err(AuthError::AccountLocked)
            } else {
                Err(AuthError::AccountDisabled)
            };
        }

        if !password::verify_password(&req.password, &user.password_hash)? {
            let lock = self.lockout.locks_after(user.login_attempts + 1);
            user_repo::record_failed_login(&self.db, user.id, lock).await?;
            if lock {
                warn!(user_id = %user.id, "account locked after repeated failed logins");
            }
            return Err(AuthError::InvalidCredentials);
        }

        user_repo::record_successful_login(&self.db, user.id).await?;
        user.login_attempts = 0;
        user.last_login = Some(now);

        info!(user_id = %user.id, "user logged in");

        self.issue_token_pair(&user, meta).await
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Ledger state is authoritative over the JWT's own expiry: a revoked
    /// entry invalidates a token the signature alone would still accept.
    /// The refresh token itself is returned unchanged (non-rotating design).
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let now = Utc::now();

        self.codec
            .decode_refresh(refresh_token)
            .map_err(|_| AuthError::TokenExpired)?;

        let entry = token_repo::find_by_token(&self.db, refresh_token)
            .await?
            .ok_or(AuthError::TokenExpired)?;
        if !entry.is_valid(now) {
            return Err(AuthError::TokenExpired);
        }

        let user = user_repo::find_by_id(&self.db, entry.user_id)
            .await?
            .ok_or(AuthError::NotFound("User"))?;

        if !self.lockout.can_login(&user, now) {
            token_repo::revoke_all_user_tokens(&self.db, user.id).await?;
            warn!(user_id = %user.id, "refresh attempt by unusable account; all sessions revoked");
            return Err(AuthError::AccountDisabled);
        }

        token_repo::update_last_used(&self.db, refresh_token, now).await?;

        let access_token =
            self.codec
                .issue_access_token(user.id, &user.username, &user.email, user.enabled)?;

        Ok(AuthResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: self.codec.access_expiry_secs(),
            user: UserDto::from(&user),
        })
    }

    /// Best-effort logout: blacklist the presented access token and revoke
    /// the presented refresh token. Either may be absent; neither failure
    /// aborts the other.
    pub async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            match self.codec.extract_expiry(token) {
                Ok(exp) => {
                    if let Err(e) = self.blacklist.blacklist(token, exp).await {
                        warn!("failed to blacklist access token on logout: {}", e);
                    }
                }
                // Already unusable; nothing to blacklist.
                Err(_) => {}
            }
        }

        if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
            if let Err(e) = token_repo::revoke_token(&self.db, token).await {
                warn!("failed to revoke refresh token on logout: {}", e);
            }
        }
    }

    /// Revoke every ledger entry for the user ("logout all devices").
    pub async fn logout_all(&self, username: &str) -> Result<()> {
        if let Some(user) = user_repo::find_by_username(&self.db, username).await? {
            token_repo::revoke_all_user_tokens(&self.db, user.id).await?;
            info!(user_id = %user.id, "all sessions revoked");
        }
        Ok(())
    }

    pub async fn get_profile(&self, username: &str) -> Result<UserDto> {
        let user = self.require_user(username).await?;
        Ok(UserDto::from(&user))
    }

    pub async fn update_profile(
        &self,
        username: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<UserDto> {
        let user = self.require_user(username).await?;
        let updated = user_repo::update_profile(&self.db, user.id, first_name, last_name).await?;
        Ok(UserDto::from(&updated))
    }

    /// Change the password and force re-authentication everywhere.
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.require_user(username).await?;

        if !password::verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = password::hash_password(new_password)?;
        user_repo::update_password(&self.db, user.id, &new_hash).await?;
        token_repo::revoke_all_user_tokens(&self.db, user.id).await?;

        info!(user_id = %user.id, "password changed; all sessions revoked");
        Ok(())
    }

    /// Codec plus blacklist check. Store failures propagate; they are never
    /// read as "valid" or "invalid".
    pub async fn validate_token(&self, token: &str) -> Result<TokenValidity> {
        if self.codec.decode(token).is_err() {
            return Ok(TokenValidity::Invalid);
        }
        if self.blacklist.is_blacklisted(token).await? {
            return Ok(TokenValidity::Invalid);
        }
        Ok(TokenValidity::Valid)
    }

    /// Valid sessions for the user, most recent first.
    pub async fn active_sessions(&self, username: &str) -> Result<Vec<SessionDto>> {
        let user = self.require_user(username).await?;
        let tokens = token_repo::find_valid_by_user(&self.db, user.id, Utc::now()).await?;
        Ok(tokens.iter().map(SessionDto::from).collect())
    }

    /// Revoke one session by ledger id. A session owned by a different user
    /// is left untouched and the call still succeeds.
    pub async fn revoke_session(&self, username: &str, session_id: Uuid) -> Result<()> {
        let user = self.require_user(username).await?;

        if let Some(entry) = token_repo::find_by_id(&self.db, session_id).await? {
            if entry.user_id == user.id {
                token_repo::revoke_by_id(&self.db, entry.id).await?;
                info!(user_id = %user.id, session_id = %entry.id, "session revoked");
            }
        }
        Ok(())
    }

    /// Delete ledger rows past their expiry.
    pub async fn cleanup_expired_tokens(&self) -> Result<u64> {
        let removed = token_repo::delete_expired(&self.db, Utc::now()).await?;
        if removed > 0 {
            info!(removed, "expired refresh tokens purged");
        }
        Ok(removed)
    }

    /// Delete revoked ledger rows older than `days_old` days.
    pub async fn cleanup_old_revoked_tokens(&self, days_old: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days_old);
        let removed = token_repo::delete_revoked_older_than(&self.db, cutoff).await?;
        if removed > 0 {
            info!(removed, "old revoked refresh tokens purged");
        }
        Ok(removed)
    }

    async fn require_user(&self, username: &str) -> Result<User> {
        user_repo::find_by_username(&self.db, username)
            .await?
            .ok_or(AuthError::NotFound("User"))
    }

    async fn issue_token_pair(&self, user: &User, meta: &ClientMeta) -> Result<AuthResponse> {
        let access_token =
            self.codec
                .issue_access_token(user.id, &user.username, &user.email, user.enabled)?;
        let refresh_token = self.codec.issue_refresh_token(user.id, &user.username)?;

        let expires_at = Utc::now() + self.codec.refresh_ttl();
        token_repo::create_refresh_token(
            &self.db,
            user.id,
            &refresh_token,
            expires_at,
            meta.ip_address.clone(),
            meta.device_info.clone(),
        )
        .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            expires_in: self.codec.access_expiry_secs(),
            user: UserDto::from(user),
        })
    }
}
