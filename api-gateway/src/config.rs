/// Configuration management
use serde::Deserialize;

/// Gateway configuration. All keys are required at startup; the gateway
/// refuses to boot without the shared JWT secret and the upstream URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub redis_url: String,
    /// Base64-encoded HMAC-SHA256 secret, shared with the auth service.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub auth_service_url: String,
    pub task_service_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
