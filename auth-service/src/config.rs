/// Configuration management
use serde::Deserialize;

/// Environment-backed configuration. Every field without a default is
/// required at startup; a missing key is a fatal configuration error.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// Base64-encoded HMAC-SHA256 signing secret, shared with the gateway.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Access token lifetime in milliseconds.
    pub jwt_access_token_expiration: u64,
    /// Refresh token lifetime in milliseconds.
    pub jwt_refresh_token_expiration: u64,
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: i32,
    /// Lockout window in milliseconds.
    #[serde(default = "default_account_lockout_duration")]
    pub account_lockout_duration: u64,
}

fn default_max_login_attempts() -> i32 {
    5
}

fn default_account_lockout_duration() -> u64 {
    3_600_000 // 1 hour
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
