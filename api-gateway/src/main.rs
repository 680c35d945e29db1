/// Todo platform API gateway - main entry point
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use redis::aio::ConnectionManager;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jwt_auth::{JwtCodec, TokenBlacklist};

mod config;
mod error;
mod filter;
mod logging;
mod proxy;

use config::Config;

/// Shared gateway state: the token codec and blacklist for the
/// authentication filter, plus the HTTP client and upstream base URLs
/// for forwarding.
#[derive(Clone)]
pub struct GatewayState {
    pub codec: Arc<JwtCodec>,
    pub blacklist: Arc<TokenBlacklist>,
    pub client: reqwest::Client,
    pub auth_base: String,
    pub task_base: String,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "UP", "service": "api-gateway" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration from environment: {}", e))?;

    tracing::info!(
        "Starting API gateway on {}:{}",
        config.server_host,
        config.server_port
    );

    let redis_client = redis::Client::open(config.redis_url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("Redis connection initialized");

    let codec = Arc::new(
        JwtCodec::verifier(&config.jwt_secret, &config.jwt_issuer)
            .map_err(|e| anyhow::anyhow!("failed to initialize JWT codec: {}", e))?,
    );
    let blacklist = Arc::new(TokenBlacklist::new(redis_conn));

    let state = GatewayState {
        codec,
        blacklist,
        client: reqwest::Client::new(),
        auth_base: config.auth_service_url.trim_end_matches('/').to_string(),
        task_base: config.task_service_url.trim_end_matches('/').to_string(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            filter::authenticate,
        ))
        .layer(middleware::from_fn(logging::log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Gateway listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
