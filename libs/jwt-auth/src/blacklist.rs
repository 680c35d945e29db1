//! Access-token blacklist backed by Redis.
//!
//! Entries are keyed by the raw token string with a TTL equal to the token's
//! remaining lifetime, so a blacklisted token stops being tracked exactly
//! when it would have expired anyway. Store failures propagate to the caller;
//! a Redis outage must never be read as "not blacklisted".

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

const BLACKLIST_KEY_PREFIX: &str = "blacklisted_token:";

/// Revocation store for still-cryptographically-valid access tokens.
pub struct TokenBlacklist {
    redis: ConnectionManager,
}

impl TokenBlacklist {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Blacklist a token until its natural expiry.
    ///
    /// `expires_at` is the token's own `exp` claim (Unix seconds). Tokens
    /// that are already expired need no entry; the codec rejects them on its
    /// own, so this is a no-op. Re-blacklisting an existing entry just
    /// rewrites the same key.
    pub async fn blacklist(&self, token: &str, expires_at: i64) -> Result<(), redis::RedisError> {
        let ttl = expires_at - Utc::now().timestamp();
        if ttl <= 0 {
            return Ok(());
        }

        let key = format!("{BLACKLIST_KEY_PREFIX}{token}");
        let mut conn = self.redis.clone();
        let _: () = conn.set_ex(&key, "blacklisted", ttl as u64).await?;

        info!(ttl, "token blacklisted");
        Ok(())
    }

    /// Existence check by raw token string.
    pub async fn is_blacklisted(&self, token: &str) -> Result<bool, redis::RedisError> {
        let key = format!("{BLACKLIST_KEY_PREFIX}{token}");
        let mut conn = self.redis.clone();
        conn.exists(&key).await
    }
}
