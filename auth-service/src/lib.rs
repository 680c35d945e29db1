// Todo platform authentication service

use std::sync::Arc;

use jwt_auth::{JwtCodec, TokenBlacklist};

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;

pub use error::{AuthError, Result};
pub use models::{RefreshToken, User, UserDto};

/// Shared application state: connection handles plus the token codec and
/// blacklist, all constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub codec: Arc<JwtCodec>,
    pub blacklist: Arc<TokenBlacklist>,
    pub auth: Arc<services::AuthService>,
}
