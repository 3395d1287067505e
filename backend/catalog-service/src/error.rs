/// Error types for Catalog Service
///
/// This module defines all error types that can occur in the catalog-service.
/// Errors are converted to appropriate HTTP responses for API clients.
///
/// Two situations deliberately map to 409 Conflict rather than 5xx: a second
/// catalog-wide sync while one is running, and a manual playlist sync while
/// another worker holds that playlist's rebuild lease. Both mean "already
/// being handled", not "broken".
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use upstream_client::UpstreamError;

/// Result type for catalog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Database operation failed
    Database(String),

    /// The upstream platform failed or answered outside its contract
    Upstream(String),

    /// Service misconfiguration (missing API key, bad URL)
    Config(String),

    /// Resource not found
    NotFound(String),

    /// Bad request
    BadRequest(String),

    /// A catalog-wide sync is already running
    SyncInProgress,

    /// Another worker holds the playlist's rebuild lease
    LeaseHeld(String),

    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind used in response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Upstream(_) => "upstream",
            AppError::Config(_) => "config",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::SyncInProgress => "sync_in_progress",
            AppError::LeaseHeld(_) => "lease_held",
            AppError::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::SyncInProgress => write!(f, "A full catalog sync is already running"),
            AppError::LeaseHeld(slug) => {
                write!(f, "Playlist '{}' is being rebuilt by another worker", slug)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SyncInProgress | AppError::LeaseHeld(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingCredentials => AppError::Config(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}
