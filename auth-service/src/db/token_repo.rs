use crate::error::Result;
use crate::models::RefreshToken;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Record a newly issued refresh token. `created_at` is set at insertion and
/// never mutated afterwards.
pub async fn create_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
    ip_address: Option<String>,
    device_info: Option<String>,
) -> Result<RefreshToken> {
    let entry = sqlx::query_as::<_, RefreshToken>(
        r#"
        INSERT INTO refresh_tokens (id, token, user_id, expires_at, revoked, device_info, ip_address, created_at)
        VALUES (gen_random_uuid(), $1, $2, $3, false, $4, $5, CURRENT_TIMESTAMP)
        RETURNING *
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .bind(device_info)
    .bind(ip_address)
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<RefreshToken>> {
    let entry = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(entry)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RefreshToken>> {
    let entry = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(entry)
}

pub async fn revoke_token(pool: &PgPool, token: &str) -> Result<()> {
    sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn revoke_by_id(pool: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bulk revocation for password change and "logout all devices".
pub async fn revoke_all_user_tokens(pool: &PgPool, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Stamp `last_used` on a successful refresh; validity is unaffected.
pub async fn update_last_used(pool: &PgPool, token: &str, at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE refresh_tokens SET last_used = $1 WHERE token = $2")
        .bind(at)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Valid (unrevoked, unexpired) tokens for a user, most recent first.
pub async fn find_valid_by_user(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<RefreshToken>> {
    let entries = sqlx::query_as::<_, RefreshToken>(
        r#"
        SELECT * FROM refresh_tokens
        WHERE user_id = $1 AND revoked = false AND expires_at > $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Maintenance: drop rows that can never be used again. Safe to run
/// concurrently with normal traffic.
pub async fn delete_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Maintenance: drop long-revoked rows created before the cutoff.
pub async fn delete_revoked_older_than(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result =
        sqlx::query("DELETE FROM refresh_tokens WHERE revoked = true AND created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
