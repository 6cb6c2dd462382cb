use super::{claims_map, AuthFailure, CurrentUser, TokenValidator};
use crate::config::{AuthMode, AuthServerConfig, MIN_SECRET_LEN};
use crate::error::{Error, Result};
use async_trait::async_trait;
use common::ConfigurationError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Value};

/// Issues and validates HS256 tokens signed with the configured secret
pub struct LocalIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    expiration: u64,
}

impl LocalIssuer {
    pub fn new(config: &AuthServerConfig) -> std::result::Result<Self, ConfigurationError> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigurationError::invalid_value(
                "auth_server.secret",
                "<redacted>",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        // Clock skew tolerance equals the expiration window
        validation.leeway = config.expiration;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiration: config.expiration,
        })
    }

    /// Mint a token for `subject` valid for the expiration window
    pub fn issue(&self, subject: &str, name: Option<&str>, roles: &[String]) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let mut claims = json!({
            "sub": subject,
            "iss": self.issuer,
            "aud": self.audience,
            "iat": now,
            "nbf": now,
            "exp": now + self.expiration as i64,
        });
        if let Some(name) = name {
            claims["name"] = Value::from(name);
        }
        if !roles.is_empty() {
            claims["role"] = Value::from(roles.to_vec());
        }

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            Error::Internal {
                message: format!("failed to sign token: {e}"),
            }
        })
    }
}

#[async_trait]
impl TokenValidator for LocalIssuer {
    async fn validate(&self, token: &str) -> std::result::Result<CurrentUser, AuthFailure> {
        let data = decode::<Value>(token, &self.decoding_key, &self.validation)?;
        CurrentUser::from_claims(claims_map(data.claims)?)
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Local
    }
}
