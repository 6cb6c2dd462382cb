use super::{claims_map, AuthFailure, CurrentUser, TokenValidator};
use crate::config::{AuthMode, AuthServerConfig};
use async_trait::async_trait;
use common::ConfigurationError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Audience every remote-issued token must carry
pub const REMOTE_AUDIENCE: &str = "ApiHost";

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
struct OpenIdMetadata {
    issuer: String,
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// RSA components of a published key; `DecodingKey` is rebuilt on demand
#[derive(Debug, Clone)]
struct CachedJwk {
    n: String,
    e: String,
}

impl CachedJwk {
    fn to_decoding_key(&self) -> Result<DecodingKey, AuthFailure> {
        DecodingKey::from_rsa_components(&self.n, &self.e)
            .map_err(|e| AuthFailure::invalid(format!("unusable signing key: {e}")))
    }
}

#[derive(Default)]
struct KeyCache {
    metadata: Option<OpenIdMetadata>,
    keys: HashMap<String, CachedJwk>,
    last_refresh_attempt: Option<Instant>,
}

/// Validates RS256 tokens issued by an external OpenID authority
pub struct RemoteIssuer {
    authority: String,
    client: reqwest::Client,
    cache: RwLock<KeyCache>,
    refresh_lock: Mutex<()>,
}

impl RemoteIssuer {
    pub fn new(config: &AuthServerConfig) -> Result<Self, ConfigurationError> {
        let authority = config.authority_base().to_string();
        let parsed = url::Url::parse(&authority).map_err(|e| {
            ConfigurationError::invalid_value("auth_server.authority", &authority, e.to_string())
        })?;
        if config.require_https_metadata && parsed.scheme() != "https" {
            return Err(ConfigurationError::invalid_value(
                "auth_server.authority",
                &authority,
                "HTTPS is required for the metadata address",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| ConfigurationError::ValidationFailed {
                details: format!("failed to build metadata client: {e}"),
            })?;

        Ok(Self {
            authority,
            client,
            cache: RwLock::new(KeyCache::default()),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Signing key for `kid`, refreshing the key set once if it is unknown
    async fn signing_key(&self, kid: &str) -> Result<(DecodingKey, String), AuthFailure> {
        if let Some(found) = self.cached(kid).await {
            return found;
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited
        if let Some(found) = self.cached(kid).await {
            return found;
        }

        let can_attempt = {
            let cache = self.cache.read().await;
            cache
                .last_refresh_attempt
                .map(|ts| ts.elapsed() >= MIN_REFRESH_INTERVAL)
                .unwrap_or(true)
        };
        if can_attempt {
            self.refresh().await?;
        }

        self.cached(kid)
            .await
            .unwrap_or_else(|| Err(AuthFailure::invalid(format!("unknown signing key '{kid}'"))))
    }

    async fn cached(&self, kid: &str) -> Option<Result<(DecodingKey, String), AuthFailure>> {
        let cache = self.cache.read().await;
        let issuer = cache.metadata.as_ref()?.issuer.clone();
        let jwk = cache.keys.get(kid)?;
        Some(jwk.to_decoding_key().map(|key| (key, issuer)))
    }

    async fn refresh(&self) -> Result<(), AuthFailure> {
        self.cache.write().await.last_refresh_attempt = Some(Instant::now());

        let cached = self.cache.read().await.metadata.clone();
        let metadata = match cached {
            Some(metadata) => metadata,
            None => self.fetch_metadata().await?,
        };

        let jwks: JwksResponse = self
            .client
            .get(&metadata.jwks_uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthFailure::invalid(format!("failed to fetch signing keys: {e}")))?
            .json()
            .await
            .map_err(|e| AuthFailure::invalid(format!("failed to parse signing keys: {e}")))?;

        let keys: HashMap<String, CachedJwk> = jwks
            .keys
            .into_iter()
            .filter(|jwk| jwk.kty == "RSA")
            .filter_map(|jwk| {
                Some((
                    jwk.kid?,
                    CachedJwk {
                        n: jwk.n?,
                        e: jwk.e?,
                    },
                ))
            })
            .collect();

        debug!(authority = %self.authority, keys = keys.len(), "Refreshed signing keys");

        let mut cache = self.cache.write().await;
        cache.metadata = Some(metadata);
        cache.keys = keys;
        Ok(())
    }

    async fn fetch_metadata(&self) -> Result<OpenIdMetadata, AuthFailure> {
        let url = format!("{}{DISCOVERY_PATH}", self.authority);
        self.client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(url = %url, error = %e, "OpenID discovery failed");
                AuthFailure::invalid(format!("authority metadata unavailable: {e}"))
            })?
            .json::<OpenIdMetadata>()
            .await
            .map_err(|e| AuthFailure::invalid(format!("invalid authority metadata: {e}")))
    }
}

#[async_trait]
impl TokenValidator for RemoteIssuer {
    async fn validate(&self, token: &str) -> Result<CurrentUser, AuthFailure> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthFailure::invalid(format!(
                "unsupported signing algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthFailure::invalid("token header has no key id"))?;

        let (key, issuer) = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[REMOTE_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let data = decode::<Value>(token, &key, &validation)?;
        CurrentUser::from_claims(claims_map(data.claims)?)
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Remote
    }
}
