/// Todo platform auth service - main entry point
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use auth_service::{
    config::Config,
    handlers,
    security::lockout::LockoutPolicy,
    services::AuthService,
    AppState,
};
use jwt_auth::{JwtCodec, TokenBlacklist};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration from environment: {}", e))?;

    tracing::info!(
        "Starting auth service on {}:{}",
        config.server_host,
        config.server_port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database connection pool initialized");

    let redis_client = redis::Client::open(config.redis_url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("Redis connection initialized");

    let codec = Arc::new(
        JwtCodec::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            config.jwt_access_token_expiration,
            config.jwt_refresh_token_expiration,
        )
        .map_err(|e| anyhow::anyhow!("failed to initialize JWT codec: {}", e))?,
    );

    let blacklist = Arc::new(TokenBlacklist::new(redis_conn));
    let lockout = LockoutPolicy::new(config.max_login_attempts, config.account_lockout_duration);

    let auth = Arc::new(AuthService::new(
        db_pool.clone(),
        codec.clone(),
        blacklist.clone(),
        lockout,
    ));

    spawn_token_cleanup(auth.clone());

    let state = AppState {
        db: db_pool,
        codec,
        blacklist,
        auth,
    };

    let app = Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/refresh", post(handlers::refresh_token))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/logout-all", post(handlers::logout_all))
        .route("/api/auth/profile", get(handlers::get_profile))
        .route("/api/auth/profile", put(handlers::update_profile))
        .route("/api/auth/change-password", post(handlers::change_password))
        .route("/api/auth/validate", post(handlers::validate_token))
        .route("/api/auth/sessions", get(handlers::get_sessions))
        .route("/api/auth/sessions/:id", axum::routing::delete(handlers::revoke_session))
        .route("/api/auth/health", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic ledger maintenance: purge expired rows and revoked rows older
/// than 30 days. Both deletes only touch rows that are already unusable, so
/// running alongside live traffic is safe.
fn spawn_token_cleanup(auth: Arc<AuthService>) {
    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(24 * 60 * 60);
        loop {
            tokio::time::sleep(interval).await;
            if let Err(e) = auth.cleanup_expired_tokens().await {
                tracing::warn!("expired token cleanup failed: {}", e);
            }
            if let Err(e) = auth.cleanup_old_revoked_tokens(30).await {
                tracing::warn!("revoked token cleanup failed: {}", e);
            }
        }
    });
}
