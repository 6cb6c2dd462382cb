//! # API Host
//!
//! Bootstraps an HTTP API from a graph of modules.
//!
//! ## Features
//!
//! - **Module graph**: modules declare dependencies and configure in order
//! - **Versioned controllers**: handler sets mounted under `/api/v{major}/{root}`
//! - **Authentication**: HS256 tokens issued locally or RS256 tokens from a remote authority
//! - **Localization**: per-request culture with resource and culture fallback
//! - **Caching**: key-prefixed distributed cache over moka or Redis
//! - **Data protection**: AES-GCM key ring shared through Redis outside development
//! - **Auditing**: one audit entry per request with unit-of-work entity changes
//! - **OpenAPI documentation**: one document per major version behind Swagger UI

pub mod api;
pub mod auditing;
pub mod auth;
pub mod cache;
pub mod config;
pub mod data_protection;
pub mod docs;
pub mod error;
pub mod health;
pub mod host;
pub mod localization;
pub mod modules;
pub mod pipeline;
pub mod server;
pub mod uow;
pub mod versioning;
pub mod vfs;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use host::{Host, HostBuilder};
pub use server::{AppState, Server};

/// Version of the api-host crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
    }
}
