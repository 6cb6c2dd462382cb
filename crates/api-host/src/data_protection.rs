//! Payload protection with a shared key ring
//!
//! Keys are AES-256-GCM keys with a bounded lifetime. Outside development
//! the ring lives in Redis so every instance behind a load balancer can
//! unprotect what another one protected.

use crate::config::HostEnvironment;
use crate::error::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_ID_LEN: usize = 16;

/// Where key material is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStorage {
    Redis,
    Ephemeral,
}

impl KeyStorage {
    /// Redis persistence is used exactly when not in development
    pub fn for_environment(environment: HostEnvironment) -> Self {
        if environment.is_development() {
            KeyStorage::Ephemeral
        } else {
            KeyStorage::Redis
        }
    }
}

/// Data protection settings recorded during service configuration
#[derive(Debug, Clone)]
pub struct DataProtectionOptions {
    pub application_name: String,
    pub key_lifetime: Duration,
}

impl Default for DataProtectionOptions {
    fn default() -> Self {
        Self {
            application_name: "ApiHost".to_string(),
            key_lifetime: Duration::days(90),
        }
    }
}

/// A key in the ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionKey {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Base64url key material
    material: String,
}

impl ProtectionKey {
    fn generate(lifetime: Duration) -> Result<Self> {
        if lifetime <= Duration::zero() {
            return Err(protection_error("key lifetime must be positive"));
        }
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| protection_error("key lifetime is out of range"))?;

        let mut material = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut material);
        Ok(Self {
            id: Uuid::new_v4(),
            created_at: now,
            expires_at,
            material: URL_SAFE_NO_PAD.encode(material),
        })
    }

    fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.created_at <= at && at < self.expires_at
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.material)
            .map_err(|e| protection_error(format!("corrupt key {}: {e}", self.id)))?;
        Aes256Gcm::new_from_slice(&bytes)
            .map_err(|_| protection_error(format!("key {} has the wrong length", self.id)))
    }
}

/// Persistence for the key ring
#[async_trait]
pub trait KeyRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<ProtectionKey>>;
    async fn store(&self, key: &ProtectionKey) -> Result<()>;
    fn storage(&self) -> KeyStorage;
}

/// Keys held in process memory; lost on restart
#[derive(Default)]
pub struct EphemeralKeyRepository {
    keys: Mutex<Vec<ProtectionKey>>,
}

#[async_trait]
impl KeyRepository for EphemeralKeyRepository {
    async fn load_all(&self) -> Result<Vec<ProtectionKey>> {
        Ok(self.keys.lock().clone())
    }

    async fn store(&self, key: &ProtectionKey) -> Result<()> {
        self.keys.lock().push(key.clone());
        Ok(())
    }

    fn storage(&self) -> KeyStorage {
        KeyStorage::Ephemeral
    }
}

/// Keys appended to a Redis list under a fixed namespace
pub struct RedisKeyRepository {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisKeyRepository {
    pub fn new(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl KeyRepository for RedisKeyRepository {
    async fn load_all(&self) -> Result<Vec<ProtectionKey>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.namespace)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str(entry) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(namespace = %self.namespace, error = %e, "Skipping unreadable protection key");
                    None
                }
            })
            .collect())
    }

    async fn store(&self, key: &ProtectionKey) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("RPUSH")
            .arg(&self.namespace)
            .arg(serde_json::to_string(key)?)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    fn storage(&self) -> KeyStorage {
        KeyStorage::Redis
    }
}

/// Protects and unprotects payloads with the key ring
pub struct DataProtector {
    repository: Arc<dyn KeyRepository>,
    ring: RwLock<Vec<ProtectionKey>>,
    options: DataProtectionOptions,
}

impl DataProtector {
    /// Load the ring and make sure an active key exists
    pub async fn initialize(
        repository: Arc<dyn KeyRepository>,
        options: DataProtectionOptions,
    ) -> Result<Self> {
        let protector = Self {
            repository,
            ring: RwLock::new(Vec::new()),
            options,
        };
        protector.reload().await?;
        protector.ensure_active_key().await?;

        info!(
            keys = protector.ring.read().len(),
            storage = ?protector.repository.storage(),
            application = %protector.options.application_name,
            "Data protection key ring loaded"
        );
        Ok(protector)
    }

    pub fn storage(&self) -> KeyStorage {
        self.repository.storage()
    }

    /// Newest key that is currently valid in the local ring
    pub fn active_key(&self) -> Option<ProtectionKey> {
        let now = Utc::now();
        self.ring
            .read()
            .iter()
            .filter(|k| k.is_active(now))
            .max_by_key(|k| k.created_at)
            .cloned()
    }

    fn find_key(&self, id: Uuid) -> Option<ProtectionKey> {
        self.ring.read().iter().find(|k| k.id == id).cloned()
    }

    /// Replace the local ring with the repository's keys
    async fn reload(&self) -> Result<()> {
        let keys = self.repository.load_all().await?;
        debug!(keys = keys.len(), "Reloaded data protection key ring");
        *self.ring.write() = keys;
        Ok(())
    }

    /// Active key, reloading the ring and creating a key when none is valid
    async fn ensure_active_key(&self) -> Result<ProtectionKey> {
        if let Some(key) = self.active_key() {
            return Ok(key);
        }

        // Another instance may have rotated already
        self.reload().await?;
        if let Some(key) = self.active_key() {
            return Ok(key);
        }

        let key = ProtectionKey::generate(self.options.key_lifetime)?;
        self.repository.store(&key).await?;
        info!(key_id = %key.id, expires_at = %key.expires_at, "Created data protection key");
        self.ring.write().push(key.clone());
        Ok(key)
    }

    fn aad(&self, purpose: &str) -> Vec<u8> {
        format!("{}\u{1f}{purpose}", self.options.application_name).into_bytes()
    }

    /// Encrypt `plaintext` for `purpose`; output is base64url
    pub async fn protect(&self, purpose: &str, plaintext: &[u8]) -> Result<String> {
        let key = self.ensure_active_key().await?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let aad = self.aad(purpose);
        let ciphertext = key
            .cipher()?
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| protection_error("encryption failed"))?;

        let mut blob = Vec::with_capacity(KEY_ID_LEN + NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(key.id.as_bytes());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Decrypt a payload produced by [`protect`](Self::protect) with the same purpose
    pub async fn unprotect(&self, purpose: &str, protected: &str) -> Result<Vec<u8>> {
        let blob = URL_SAFE_NO_PAD
            .decode(protected)
            .map_err(|_| protection_error("payload is not base64url"))?;
        if blob.len() < KEY_ID_LEN + NONCE_LEN {
            return Err(protection_error("payload is truncated"));
        }

        let (key_id, rest) = blob.split_at(KEY_ID_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let key_id = Uuid::from_slice(key_id).map_err(|_| protection_error("bad key id"))?;

        // Expired keys still decrypt; they only stop protecting new payloads
        let key = match self.find_key(key_id) {
            Some(key) => key,
            None => {
                self.reload().await?;
                self.find_key(key_id)
                    .ok_or_else(|| protection_error(format!("key {key_id} is not in the ring")))?
            }
        };

        let aad = self.aad(purpose);
        key.cipher()?
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| protection_error("payload failed authentication"))
    }
}

fn protection_error(message: impl Into<String>) -> Error {
    Error::DataProtection {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn protector() -> DataProtector {
        DataProtector::initialize(
            Arc::new(EphemeralKeyRepository::default()),
            DataProtectionOptions::default(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_storage_follows_environment() {
        assert_eq!(
            KeyStorage::for_environment(HostEnvironment::Development),
            KeyStorage::Ephemeral
        );
        assert_eq!(
            KeyStorage::for_environment(HostEnvironment::Staging),
            KeyStorage::Redis
        );
        assert_eq!(
            KeyStorage::for_environment(HostEnvironment::Production),
            KeyStorage::Redis
        );
    }

    #[tokio::test]
    async fn test_active_key_created_once() {
        let repository = Arc::new(EphemeralKeyRepository::default());
        let first = DataProtector::initialize(repository.clone(), DataProtectionOptions::default())
            .await
            .unwrap();
        let second = DataProtector::initialize(repository.clone(), DataProtectionOptions::default())
            .await
            .unwrap();

        assert_eq!(repository.load_all().await.unwrap().len(), 1);
        assert_eq!(
            first.active_key().map(|k| k.id),
            second.active_key().map(|k| k.id)
        );
    }

    #[tokio::test]
    async fn test_protect_unprotect() {
        let protector = protector().await;
        let protected = protector.protect("session", b"secret payload").await.unwrap();
        assert!(!protected.contains('+'));

        let plain = protector.unprotect("session", &protected).await.unwrap();
        assert_eq!(plain, b"secret payload");
    }

    #[tokio::test]
    async fn test_purpose_isolation() {
        let protector = protector().await;
        let protected = protector.protect("session", b"x").await.unwrap();
        assert!(protector.unprotect("csrf", &protected).await.is_err());
    }

    #[tokio::test]
    async fn test_shared_ring_across_instances() {
        let repository = Arc::new(EphemeralKeyRepository::default());
        let a = DataProtector::initialize(repository.clone(), DataProtectionOptions::default())
            .await
            .unwrap();
        let b = DataProtector::initialize(repository, DataProtectionOptions::default())
            .await
            .unwrap();

        let protected = a.protect("cookie", b"shared").await.unwrap();
        assert_eq!(b.unprotect("cookie", &protected).await.unwrap(), b"shared");
    }

    fn short_lived() -> DataProtectionOptions {
        DataProtectionOptions {
            key_lifetime: Duration::milliseconds(200),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_key_created_by_later_instance_is_found() {
        let repository = Arc::new(EphemeralKeyRepository::default());
        let a = DataProtector::initialize(repository.clone(), short_lived())
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        let b = DataProtector::initialize(repository.clone(), short_lived())
            .await
            .unwrap();
        assert_ne!(
            a.active_key().map(|k| k.id),
            b.active_key().map(|k| k.id)
        );

        let protected = b.protect("cookie", b"from b").await.unwrap();
        assert_eq!(a.unprotect("cookie", &protected).await.unwrap(), b"from b");
    }

    #[tokio::test]
    async fn test_expired_ring_rotates_once() {
        let repository = Arc::new(EphemeralKeyRepository::default());
        let a = DataProtector::initialize(repository.clone(), short_lived())
            .await
            .unwrap();
        let b = DataProtector::initialize(repository.clone(), short_lived())
            .await
            .unwrap();
        let old = a.protect("p", b"old").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        let fresh = a.protect("p", b"new").await.unwrap();
        b.protect("p", b"other").await.unwrap();

        // b picked up the key a rotated in instead of creating its own
        assert_eq!(repository.load_all().await.unwrap().len(), 2);
        assert_eq!(b.unprotect("p", &fresh).await.unwrap(), b"new");
        assert_eq!(b.unprotect("p", &old).await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_non_positive_lifetime_rejected() {
        let options = DataProtectionOptions {
            key_lifetime: Duration::zero(),
            ..Default::default()
        };
        let result =
            DataProtector::initialize(Arc::new(EphemeralKeyRepository::default()), options).await;
        assert!(matches!(result, Err(Error::DataProtection { .. })));
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let protector = protector().await;
        assert!(protector.unprotect("p", "not base64!").await.is_err());
        assert!(protector.unprotect("p", "AAAA").await.is_err());

        let mut protected = protector.protect("p", b"data").await.unwrap();
        protected.push('A');
        assert!(protector.unprotect("p", &protected).await.is_err());
    }
}
