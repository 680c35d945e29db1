/// Gateway error types and HTTP responses
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{message}")]
    Unauthorized { message: String, path: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("bad gateway: {0}")]
    BadGateway(String),

    #[error("no route for request path")]
    RouteNotFound,
}

impl GatewayError {
    pub fn unauthorized(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            path: path.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::Unauthorized { message, path } => json!({
                "error": "Unauthorized",
                "message": message,
                "path": path,
                "timestamp": Utc::now().to_rfc3339(),
            }),
            other => json!({
                "error": status.canonical_reason().unwrap_or("Error"),
                "message": other.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
        };

        if status.is_server_error() {
            tracing::error!("gateway error: {}", self);
        }

        (status, Json(body)).into_response()
    }
}
