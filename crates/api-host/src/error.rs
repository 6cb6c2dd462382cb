//! Error types for the API host

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::HostError;
use serde_json::json;
use thiserror::Error;

/// Main error type for the API host
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] common::ConfigurationError),

    /// Module graph or service registration error
    #[error("Module error: {0}")]
    Module(#[from] crate::modules::ModuleError),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication error
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Invalid request
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Cache error
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Key ring or payload protection failure
    #[error("Data protection error: {message}")]
    DataProtection { message: String },

    /// Internal server error
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Not found
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl HostError for Error {}

impl Error {
    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config(_) => "API_HOST_CONFIG_ERROR",
            Error::Module(_) => "API_HOST_MODULE_ERROR",
            Error::HttpClient(_) => "API_HOST_HTTP_CLIENT_ERROR",
            Error::Redis(_) => "API_HOST_REDIS_ERROR",
            Error::Database(_) => "API_HOST_DATABASE_ERROR",
            Error::Authentication { .. } => "API_HOST_AUTH_ERROR",
            Error::InvalidRequest { .. } => "API_HOST_INVALID_REQUEST",
            Error::Cache { .. } => "API_HOST_CACHE_ERROR",
            Error::DataProtection { .. } => "API_HOST_DATA_PROTECTION_ERROR",
            Error::Internal { .. } => "API_HOST_INTERNAL_ERROR",
            Error::NotFound { .. } => "API_HOST_NOT_FOUND",
            Error::Serialization(_) => "API_HOST_SERIALIZATION_ERROR",
            Error::Other(_) => "API_HOST_OTHER_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::HttpClient(_) | Error::Redis(_) | Error::Database(_)
        )
    }

    /// Check if error is a client error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Authentication { .. }
                | Error::InvalidRequest { .. }
                | Error::NotFound { .. }
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Error::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::HttpClient(_) => StatusCode::BAD_GATEWAY,
            Error::Redis(_) | Error::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now(),
                "retryable": self.is_retryable(),
            }
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Error response structure for API documentation
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorDetails {
    /// Error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// ISO 8601 timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Whether the error is retryable
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::NotFound {
                resource: "x".to_string()
            }
            .error_code(),
            "API_HOST_NOT_FOUND"
        );
        assert_eq!(
            Error::DataProtection {
                message: "x".to_string()
            }
            .error_code(),
            "API_HOST_DATA_PROTECTION_ERROR"
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::Authentication {
            message: "test".to_string()
        }
        .is_client_error());
        assert!(!Error::Internal {
            message: "test".to_string()
        }
        .is_client_error());
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = Error::Authentication {
            message: "missing token".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_status_mapping() {
        let response = Error::InvalidRequest {
            message: "bad".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::Cache {
            message: "down".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
