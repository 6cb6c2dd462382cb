//! Error handling shared by ApiHost crates
//!
//! - `HostError` marker trait for errors that cross crate boundaries
//! - `ConfigurationError` for loading, parsing and validating configuration
//!
//! Library code uses `thiserror` enums; binaries may wrap them in `anyhow`.

use thiserror::Error;

/// Base trait for all ApiHost error types
///
/// Errors implementing this trait are thread-safe, own their data and
/// implement the standard `Error` trait, so they can travel across tasks
/// and be boxed as `Box<dyn HostError>`.
pub trait HostError: std::error::Error + Send + Sync + 'static {}

/// Configuration-related errors
///
/// These errors occur during configuration loading, parsing, or validation.
/// They are never handled locally: startup aborts when one surfaces.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration file cannot be read
    #[error("Cannot read configuration file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration parsing failed
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Missing required configuration
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    /// Environment variable error
    #[error("Environment variable error for {var}: {details}")]
    EnvironmentError { var: String, details: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {details}")]
    ValidationFailed { details: String },
}

impl HostError for ConfigurationError {}

impl ConfigurationError {
    /// Create a validation failed error
    pub fn validation_failed(details: impl Into<String>) -> Self {
        Self::ValidationFailed {
            details: details.into(),
        }
    }

    /// Create an invalid value error for a configuration key
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing required value error
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingRequired { key: key.into() }
    }
}

/// Result type alias for shared ApiHost operations
pub type HostResult<T, E = Box<dyn HostError>> = Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = ConfigurationError::invalid_value("auth_server.secret", "***", "too short");
        let display = format!("{err}");
        assert!(display.contains("auth_server.secret"));
        assert!(display.contains("too short"));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let config_err = ConfigurationError::ReadError {
            path: "/etc/apihost/apihost.toml".to_string(),
            source: Box::new(io_error),
        };

        assert!(config_err.source().is_some());
    }

    #[test]
    fn test_host_error_trait() {
        fn accepts_host_error(_: impl HostError) {}

        accepts_host_error(ConfigurationError::missing("redis.configuration"));
        accepts_host_error(ConfigurationError::validation_failed("test"));
    }
}
