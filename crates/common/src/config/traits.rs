//! # Configuration Traits

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

/// Configuration loader trait
///
/// Provides a standardized interface for loading configuration with layered
/// sources: compiled defaults, then a configuration file, then environment
/// variables.
pub trait ConfigLoader<C: DeserializeOwned + Send + Sync> {
    /// Load configuration, optionally from a file that may be absent
    fn load(path_override: Option<PathBuf>) -> Result<C, ConfigurationError>;

    /// Load configuration from a specific file, which must exist
    fn load_from_file(path: &Path) -> Result<C, ConfigurationError>;
}
