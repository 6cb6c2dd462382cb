//! Distributed cache
//!
//! Entries are stored under `{key_prefix}{key}` so several hosts can share
//! one Redis instance. The in-memory backend is used for single-node and
//! development deployments.

use crate::config::{CacheBackend, CacheConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use moka::future::Cache;
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Options registered by the caching module and refined by the host
#[derive(Debug, Clone)]
pub struct DistributedCacheOptions {
    pub key_prefix: String,
    pub default_ttl: Duration,
}

impl Default for DistributedCacheOptions {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            default_ttl: Duration::from_secs(20 * 60),
        }
    }
}

/// Raw byte storage behind [`DistributedCache`]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Clone)]
struct CachedEntry {
    value: Arc<Vec<u8>>,
    expires_at: Instant,
}

/// Process-local store backed by moka
pub struct MemoryCacheStore {
    cache: Cache<String, CachedEntry>,
}

impl MemoryCacheStore {
    pub fn new(max_size: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_size).build(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.cache.get(key).await {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.as_ref().clone()));
            }
            self.cache.remove(key).await;
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = CachedEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.cache.remove(key).await;
        Ok(())
    }
}

/// Store backed by a shared Redis instance
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// Open a managed Redis connection
pub async fn connect_redis(configuration: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(configuration)?;
    let conn = ConnectionManager::new(client).await?;
    info!("Connected to Redis");
    Ok(conn)
}

/// Typed, key-prefixed cache shared by the handler sets
#[derive(Clone)]
pub struct DistributedCache {
    store: Arc<dyn CacheStore>,
    options: DistributedCacheOptions,
}

impl DistributedCache {
    pub fn new(store: Arc<dyn CacheStore>, options: DistributedCacheOptions) -> Self {
        Self { store, options }
    }

    /// Build the backend selected by configuration
    pub async fn from_config(config: &CacheConfig, redis: &str, options: DistributedCacheOptions) -> Result<Self> {
        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::InMemory => Arc::new(MemoryCacheStore::new(config.max_size)),
            CacheBackend::Redis => Arc::new(RedisCacheStore::new(connect_redis(redis).await?)),
        };
        debug!(backend = ?config.backend, prefix = %options.key_prefix, "Distributed cache ready");
        Ok(Self::new(store, options))
    }

    pub fn key_prefix(&self) -> &str {
        &self.options.key_prefix
    }

    fn normalize_key(&self, key: &str) -> String {
        format!("{}{key}", self.options.key_prefix)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(&self.normalize_key(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store with the default expiration
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.options.default_ttl).await
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(Error::Cache {
                message: "cache entries need a positive expiration".to_string(),
            });
        }
        let bytes = serde_json::to_vec(value)?;
        self.store.set(&self.normalize_key(key), bytes, ttl).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.normalize_key(key)).await
    }
}
