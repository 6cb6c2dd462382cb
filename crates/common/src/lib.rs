//! # ApiHost Common
//!
//! Shared building blocks for the ApiHost workspace.
//!
//! ## Key Features
//! - `HostError` marker trait and `ConfigurationError`
//! - Figment-based layered configuration loading
//! - Tracing subscriber initialization
//! - Health state types used by probes

pub mod config;
pub mod error;
pub mod health;
pub mod logging;

pub use config::*;
pub use error::*;
pub use health::{HealthState, HealthStatus};

/// Version of the common crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(VERSION.chars().any(|c| c.is_ascii_digit()));
    }
}
