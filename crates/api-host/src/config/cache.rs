//! Cache configuration

use serde::{Deserialize, Serialize};

/// Distributed cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend type
    pub backend: CacheBackend,

    /// Default TTL in seconds
    pub default_ttl: u64,

    /// Maximum number of entries (in-memory only)
    pub max_size: u64,

    /// Prefix applied to every cache key
    pub key_prefix: String,
}

/// Cache backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-memory cache
    InMemory,

    /// Redis cache, using `redis.configuration`
    Redis,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::InMemory,
            default_ttl: 1200,
            max_size: 10_000,
            key_prefix: "ApiHost:".to_string(),
        }
    }
}
