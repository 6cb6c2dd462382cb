//! Configuration module for the API host

mod app;
mod auth;
mod cache;
mod redis;
mod server;

pub use app::{parse_origins, AppConfig, ConnectionStrings};
pub use auth::{AuthMode, AuthServerConfig, MIN_SECRET_LEN};
pub use cache::{CacheBackend, CacheConfig};
pub use redis::{DataProtectionConfig, RedisConfig, MAX_KEY_LIFETIME_DAYS};
pub use server::ServerConfig;

use common::config::{load_config_with_options, ConfigLoader, LoadOptions};
use common::logging::LogFormat;
use common::ConfigurationError as ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hosting environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEnvironment {
    Development,
    Staging,
    #[default]
    Production,
}

impl HostEnvironment {
    pub fn is_development(self) -> bool {
        matches!(self, HostEnvironment::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HostEnvironment::Development => "Development",
            HostEnvironment::Staging => "Staging",
            HostEnvironment::Production => "Production",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration structure for the API host
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Hosting environment
    pub environment: HostEnvironment,

    /// Server configuration
    pub server: ServerConfig,

    /// Application settings
    pub app: AppConfig,

    /// Authentication server settings
    pub auth_server: AuthServerConfig,

    /// Redis connection
    pub redis: RedisConfig,

    /// Distributed cache configuration
    pub cache: CacheConfig,

    /// Connection strings
    pub connection_strings: ConnectionStrings,

    /// Data protection key storage
    pub data_protection: DataProtectionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment, then validate it
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_path {
            Some(path) => <Config as ConfigLoader<Config>>::load_from_file(path)?,
            None => <Config as ConfigLoader<Config>>::load(None)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigError> {
        let config = Self::default();
        toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }

    /// Reject configurations that cannot start
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth_server.mode {
            AuthMode::Local => {
                if self.auth_server.secret.len() < MIN_SECRET_LEN {
                    return Err(ConfigError::invalid_value(
                        "auth_server.secret",
                        "<redacted>",
                        format!("must be at least {MIN_SECRET_LEN} bytes"),
                    ));
                }
                if self.auth_server.issuer.is_empty() {
                    return Err(ConfigError::missing("auth_server.issuer"));
                }
                if self.auth_server.audience.is_empty() {
                    return Err(ConfigError::missing("auth_server.audience"));
                }
            }
            AuthMode::Remote => {
                let authority = url::Url::parse(&self.auth_server.authority).map_err(|e| {
                    ConfigError::invalid_value(
                        "auth_server.authority",
                        &self.auth_server.authority,
                        e.to_string(),
                    )
                })?;
                if self.auth_server.require_https_metadata && authority.scheme() != "https" {
                    return Err(ConfigError::invalid_value(
                        "auth_server.authority",
                        &self.auth_server.authority,
                        "HTTPS is required for the metadata address",
                    ));
                }
            }
        }

        if matches!(self.cache.backend, CacheBackend::Redis) && self.redis.configuration.is_empty()
        {
            return Err(ConfigError::missing("redis.configuration"));
        }

        if self.data_protection.key_lifetime().is_none() {
            return Err(ConfigError::invalid_value(
                "data_protection.key_lifetime_days",
                self.data_protection.key_lifetime_days.to_string(),
                format!("must be between 1 and {MAX_KEY_LIFETIME_DAYS}"),
            ));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout)
    }

    /// Get cache default TTL as Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl)
    }
}

impl ConfigLoader<Config> for Config {
    fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
        load_config_with_options(LoadOptions {
            config_path: path,
            ..Default::default()
        })
    }

    fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
        load_config_with_options(LoadOptions::from_file(path))
    }
}
