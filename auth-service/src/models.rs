use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User record as persisted by the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub account_locked: bool,
    pub login_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Touched on every mutation; lockout expiry is computed from it.
    pub updated_at: DateTime<Utc>,
}

/// Ledger row for an issued refresh token.
///
/// `token` is the signed JWT text itself; `user_id` is a back-reference, the
/// user record stays owned by the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// A ledger entry is usable iff it is not revoked and not yet expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// Public profile view of a user, returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            enabled: user.enabled,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Session view exposed by `GET /sessions`. The raw token string never
/// leaves the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDto {
    pub id: Uuid,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl From<&RefreshToken> for SessionDto {
    fn from(token: &RefreshToken) -> Self {
        Self {
            id: token.id,
            device_info: token.device_info.clone(),
            ip_address: token.ip_address.clone(),
            created_at: token.created_at,
            last_used: token.last_used,
            expires_at: token.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(revoked: bool, expires_in: Duration) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            id: Uuid::new_v4(),
            token: "t".into(),
            user_id: Uuid::new_v4(),
            expires_at: now + expires_in,
            revoked,
            device_info: None,
            ip_address: None,
            created_at: now,
            last_used: None,
        }
    }

    #[test]
    fn validity_requires_unrevoked_and_unexpired() {
        let now = Utc::now();
        assert!(entry(false, Duration::hours(1)).is_valid(now));
        assert!(!entry(true, Duration::hours(1)).is_valid(now));
        assert!(!entry(false, Duration::seconds(-1)).is_valid(now));
    }

    #[test]
    fn expiry_boundary_is_invalid() {
        let now = Utc::now();
        let mut e = entry(false, Duration::zero());
        e.expires_at = now;
        assert!(!e.is_valid(now));
    }
}
