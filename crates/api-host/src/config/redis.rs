//! Redis configuration

use serde::{Deserialize, Serialize};

/// Redis connection settings shared by the cache and data protection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection string, e.g. `redis://127.0.0.1:6379/0`
    pub configuration: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            configuration: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Data protection key storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProtectionConfig {
    /// Redis key holding the persisted key ring
    pub key_namespace: String,

    /// Lifetime of a freshly generated key, in days
    pub key_lifetime_days: i64,
}

/// Upper bound for `key_lifetime_days`, about ten years
pub const MAX_KEY_LIFETIME_DAYS: i64 = 3650;

impl DataProtectionConfig {
    /// Key lifetime as a duration; `None` when out of range
    pub fn key_lifetime(&self) -> Option<chrono::Duration> {
        if (1..=MAX_KEY_LIFETIME_DAYS).contains(&self.key_lifetime_days) {
            chrono::Duration::try_days(self.key_lifetime_days)
        } else {
            None
        }
    }
}

impl Default for DataProtectionConfig {
    fn default() -> Self {
        Self {
            key_namespace: "ApiHost-Protection-Keys".to_string(),
            key_lifetime_days: 90,
        }
    }
}
