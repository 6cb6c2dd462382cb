//! # Configuration Loader
//!
//! Figment-based configuration loading with layered support:
//! 1. Compiled defaults
//! 2. Configuration file (TOML)
//! 3. Environment variable overrides
//!
//! Nested fields map to environment variables with a double underscore:
//! `APIHOST_AUTH_SERVER__AUTHORITY` sets `auth_server.authority`.

use crate::error::ConfigurationError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::env::{self, VarError};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "apihost.toml";

/// Environment variable prefix for ApiHost
pub const DEFAULT_ENV_PREFIX: &str = "APIHOST";

/// Suffix of the variable that points at a configuration file
const CONFIG_PATH_SUFFIX: &str = "CONFIG_PATH";

/// Configuration loading options
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Explicit configuration file, e.g. from `--config`
    pub config_path: Option<PathBuf>,
    /// Environment variable prefix, without the trailing underscore
    pub env_prefix: String,
    /// Fail when the configuration file does not exist
    pub require_file: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            require_file: false,
        }
    }
}

impl LoadOptions {
    /// Options for an explicit file that must exist
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
            require_file: true,
            ..Default::default()
        }
    }
}

/// Load configuration with custom options
///
/// # Configuration Layer Priority (highest to lowest)
/// 1. Environment variables (`{prefix}_*`)
/// 2. Configuration file (explicit path, `{prefix}_CONFIG_PATH`, or `apihost.toml`)
/// 3. Compiled defaults
pub fn load_config_with_options<T>(options: LoadOptions) -> Result<T, ConfigurationError>
where
    T: Default + DeserializeOwned + Serialize,
{
    let mut figment = Figment::new().merge(Serialized::defaults(T::default()));

    let path = config_path(&options)?;
    if path.exists() {
        info!("Loading configuration from file: {}", path.display());
        figment = figment.merge(Toml::file(&path));
    } else if options.require_file {
        return Err(ConfigurationError::FileNotFound {
            path: path.display().to_string(),
        });
    } else {
        warn!(
            "Configuration file not found: {} (using defaults)",
            path.display()
        );
    }

    debug!(
        "Loading environment variables with prefix: {}",
        options.env_prefix
    );
    figment = figment.merge(env_provider(&options.env_prefix));

    figment
        .extract()
        .map_err(|err| ConfigurationError::ParseError {
            details: format!("Failed to parse configuration: {err}"),
        })
}

/// Environment provider for a prefix; nested keys are split on `__`
fn env_provider(prefix: &str) -> Env {
    Env::prefixed(&format!("{prefix}_"))
        .split("__")
        .ignore(&[CONFIG_PATH_SUFFIX])
}

/// Explicit path, then `{prefix}_CONFIG_PATH`, then the default file name
fn config_path(options: &LoadOptions) -> Result<PathBuf, ConfigurationError> {
    if let Some(path) = &options.config_path {
        return Ok(path.clone());
    }

    let var = format!("{}_{CONFIG_PATH_SUFFIX}", options.env_prefix);
    match env::var(&var) {
        Ok(path) => {
            debug!("Using config path from {}: {}", var, path);
            Ok(PathBuf::from(path))
        }
        Err(VarError::NotPresent) => Ok(PathBuf::from(DEFAULT_CONFIG_FILE)),
        Err(e) => Err(ConfigurationError::EnvironmentError {
            var,
            details: e.to_string(),
        }),
    }
}
