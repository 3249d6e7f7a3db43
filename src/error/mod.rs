// Error types for smartsports-edge
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Precache failed for {url}: {reason}")]
    SeedFailed { url: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown notification: {0}")]
    NotificationNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Convert EdgeError to HTTP responses for Axum
impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            EdgeError::InvalidRequest(_) | EdgeError::Url(_) | EdgeError::Json(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            EdgeError::NotificationNotFound(_) => (StatusCode::NOT_FOUND, "not_found_error"),
            EdgeError::Network(_) | EdgeError::Http(_) => (StatusCode::BAD_GATEWAY, "network_error"),
            EdgeError::SeedFailed { .. } => (StatusCode::SERVICE_UNAVAILABLE, "install_error"),
            EdgeError::Config(_) | EdgeError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            EdgeError::Storage(_) | EdgeError::Sqlite(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EdgeError>;
