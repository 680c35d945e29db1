//! Shared JWT codec and revocation store for the todo platform.
//!
//! The codec creates and verifies HMAC-SHA256 signed tokens carrying the
//! platform claim set. Revocation (blacklisting) lives in [`blacklist`] and
//! is deliberately a separate collaborator: token-format validity can be
//! checked without Redis, and revocation state without re-verifying
//! signatures.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod blacklist;

pub use blacklist::TokenBlacklist;

/// Errors surfaced by token creation and verification.
///
/// `Expired` covers the strict boundary rule: a token whose `exp` equals the
/// current second is already unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("unexpected token type")]
    WrongType,
    #[error("signing secret is not valid base64")]
    InvalidSecret,
}

/// Token type discriminator embedded in every claim set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claim set carried by platform tokens.
///
/// `sub` is the username; `email` and `enabled` are present on access tokens
/// only and reflect the user record at issuance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Owning user id
    pub user_id: Uuid,
    /// "access" or "refresh"
    pub token_type: String,
    /// Configured issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Unique token id. Without it two tokens minted in the same second for
    /// the same user would be byte-identical.
    pub jti: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == TokenKind::Access.as_str()
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenKind::Refresh.as_str()
    }
}

/// HS256 token codec.
///
/// The signing key is derived once from a base64-encoded shared secret at
/// startup and never mutated afterwards; both the auth service and the
/// gateway construct their own codec from the same configuration.
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Build a codec from a base64-encoded secret and millisecond TTLs.
    pub fn new(
        base64_secret: &str,
        issuer: &str,
        access_ttl_ms: u64,
        refresh_ttl_ms: u64,
    ) -> Result<Self, TokenError> {
        let encoding =
            EncodingKey::from_base64_secret(base64_secret).map_err(|_| TokenError::InvalidSecret)?;
        let decoding =
            DecodingKey::from_base64_secret(base64_secret).map_err(|_| TokenError::InvalidSecret)?;

        Ok(Self {
            encoding,
            decoding,
            issuer: issuer.to_string(),
            access_ttl: Duration::milliseconds(access_ttl_ms as i64),
            refresh_ttl: Duration::milliseconds(refresh_ttl_ms as i64),
        })
    }

    /// Build a decode-only codec. The gateway verifies tokens but never
    /// issues them; tokens signed by a verifier would be born expired.
    pub fn verifier(base64_secret: &str, issuer: &str) -> Result<Self, TokenError> {
        Self::new(base64_secret, issuer, 0, 0)
    }

    /// Access token lifetime in whole seconds, as reported to clients.
    pub fn access_expiry_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token carrying the email/enabled snapshot.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        enabled: bool,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            user_id,
            token_type: TokenKind::Access.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4(),
            email: Some(email.to_string()),
            enabled: Some(enabled),
        };
        self.sign(&claims)
    }

    /// Issue a refresh token (no profile snapshot claims).
    pub fn issue_refresh_token(&self, user_id: Uuid, username: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            user_id,
            token_type: TokenKind::Refresh.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4(),
            email: None,
            enabled: None,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| TokenError::Malformed)
    }

    /// Verify signature and structure, then apply the strict expiry rule.
    ///
    /// Does NOT consult the blacklist; revocation is a separate check so the
    /// two failure modes stay independently testable. No clock-skew leeway is
    /// applied: `exp <= now` fails closed.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked manually below so the boundary second fails closed.
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// `decode` plus the access type check.
    pub fn decode_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if !claims.is_access() {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    /// `decode` plus the refresh type check.
    pub fn decode_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;
        if !claims.is_refresh() {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    /// Project the subject (username) out of a token.
    pub fn extract_username(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.decode(token)?.sub)
    }

    /// Project the owning user id out of a token.
    pub fn extract_user_id(&self, token: &str) -> Result<Uuid, TokenError> {
        Ok(self.decode(token)?.user_id)
    }

    /// Project the expiry (Unix timestamp) out of a token.
    pub fn extract_expiry(&self, token: &str) -> Result<i64, TokenError> {
        Ok(self.decode(token)?.exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64 of a 32-byte test secret
    const TEST_SECRET: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
    const OTHER_SECRET: &str = "ZmVkY2JhOTg3NjU0MzIxMGZlZGNiYTk4NzY1NDMyMTA=";
    const ISSUER: &str = "todo-auth-service";

    fn codec() -> JwtCodec {
        JwtCodec::new(TEST_SECRET, ISSUER, 900_000, 604_800_000).unwrap()
    }

    #[test]
    fn access_token_round_trip() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let token = codec
            .issue_access_token(user_id, "alice", "alice@example.com", true)
            .unwrap();
        let claims = codec.decode_access(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.enabled, Some(true));
    }

    #[test]
    fn refresh_token_omits_profile_claims() {
        let codec = codec();
        let token = codec
            .issue_refresh_token(Uuid::new_v4(), "alice")
            .unwrap();
        let claims = codec.decode_refresh(&token).unwrap();

        assert_eq!(claims.token_type, "refresh");
        assert!(claims.email.is_none());
        assert!(claims.enabled.is_none());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let codec = codec();
        let access = codec
            .issue_access_token(Uuid::new_v4(), "alice", "alice@example.com", true)
            .unwrap();
        let refresh = codec.issue_refresh_token(Uuid::new_v4(), "alice").unwrap();

        assert_eq!(codec.decode_refresh(&access), Err(TokenError::WrongType));
        assert_eq!(codec.decode_access(&refresh), Err(TokenError::WrongType));
    }

    #[test]
    fn zero_ttl_token_is_already_expired() {
        // exp == iat == now: the boundary second fails closed.
        let codec = JwtCodec::new(TEST_SECRET, ISSUER, 0, 0).unwrap();
        let token = codec
            .issue_access_token(Uuid::new_v4(), "alice", "alice@example.com", true)
            .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let codec = codec();
        let other = JwtCodec::new(OTHER_SECRET, ISSUER, 900_000, 604_800_000).unwrap();
        let token = other
            .issue_access_token(Uuid::new_v4(), "alice", "alice@example.com", true)
            .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        assert_eq!(codec.decode("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(codec.decode("a.b.c"), Err(TokenError::Malformed));
        assert_eq!(codec.decode(""), Err(TokenError::Malformed));
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let codec = codec();
        let other = JwtCodec::new(TEST_SECRET, "someone-else", 900_000, 604_800_000).unwrap();
        let token = other
            .issue_access_token(Uuid::new_v4(), "alice", "alice@example.com", true)
            .unwrap();

        assert!(codec.decode(&token).is_err());
    }

    #[test]
    fn claim_projections() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec
            .issue_access_token(user_id, "alice", "alice@example.com", true)
            .unwrap();

        assert_eq!(codec.extract_username(&token).unwrap(), "alice");
        assert_eq!(codec.extract_user_id(&token).unwrap(), user_id);
        assert!(codec.extract_expiry(&token).unwrap() > Utc::now().timestamp());

        assert_eq!(
            codec.extract_username("garbage"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn identical_inputs_yield_distinct_tokens() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let a = codec.issue_refresh_token(user_id, "alice").unwrap();
        let b = codec.issue_refresh_token(user_id, "alice").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_secret_is_fatal() {
        assert_eq!(
            JwtCodec::new("!!not-base64!!", ISSUER, 1000, 1000).unwrap_err(),
            TokenError::InvalidSecret
        );
    }
}
