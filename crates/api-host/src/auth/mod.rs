//! Bearer token validation
//!
//! Exactly one [`TokenValidator`] is active per deployment, selected by
//! `auth_server.mode`: [`LocalIssuer`] signs and checks HS256 tokens with a
//! shared secret, [`RemoteIssuer`] checks RS256 tokens against the JWKS of
//! an external authority.

mod local;
mod remote;

pub use local::LocalIssuer;
pub use remote::{RemoteIssuer, REMOTE_AUDIENCE};

use crate::config::{AuthMode, AuthServerConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::errors::ErrorKind;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Why a presented token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    TokenExpired,
    InvalidToken,
}

/// A rejected token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub kind: AuthFailureKind,
    pub message: String,
}

impl AuthFailure {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: AuthFailureKind::InvalidToken,
            message: message.into(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.kind == AuthFailureKind::TokenExpired
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthFailure {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::ExpiredSignature => AuthFailureKind::TokenExpired,
            _ => AuthFailureKind::InvalidToken,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// The authenticated caller of a request
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub claims: Map<String, Value>,
}

impl CurrentUser {
    /// Build a user from validated token claims; `sub` is required
    pub fn from_claims(claims: Map<String, Value>) -> std::result::Result<Self, AuthFailure> {
        let id = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthFailure::invalid("token has no subject"))?
            .to_string();

        let name = ["name", "preferred_username", "unique_name"]
            .iter()
            .find_map(|k| claims.get(*k).and_then(Value::as_str))
            .map(str::to_string);

        let roles = match claims.get("role").or_else(|| claims.get("roles")) {
            Some(Value::String(role)) => vec![role.clone()],
            Some(Value::Array(roles)) => roles
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            id,
            name,
            roles,
            claims,
        })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| Error::Authentication {
                message: "Authentication required".to_string(),
            })
    }
}

/// Validates bearer tokens
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> std::result::Result<CurrentUser, AuthFailure>;

    fn mode(&self) -> AuthMode;
}

/// Build the validator selected by configuration
pub fn validator_for(config: &AuthServerConfig) -> Result<Arc<dyn TokenValidator>> {
    let validator: Arc<dyn TokenValidator> = match config.mode {
        AuthMode::Local => Arc::new(LocalIssuer::new(config)?),
        AuthMode::Remote => Arc::new(RemoteIssuer::new(config)?),
    };
    Ok(validator)
}

/// Route prefixes that answer 401 to anonymous callers
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    protected_prefixes: Vec<String>,
}

impl AuthorizationPolicy {
    pub fn new(protected_prefixes: Vec<String>) -> Self {
        Self { protected_prefixes }
    }

    /// Whether `path` lies under a protected prefix
    pub fn requires_user(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .map(|rest| rest.is_empty() || rest.starts_with('/'))
                .unwrap_or(false)
        })
    }
}

fn claims_map(value: Value) -> std::result::Result<Map<String, Value>, AuthFailure> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AuthFailure::invalid("token claims are not an object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        claims_map(value).unwrap()
    }

    #[test]
    fn test_user_from_claims() {
        let user = CurrentUser::from_claims(claims(json!({
            "sub": "42",
            "preferred_username": "alice",
            "role": ["admin", "reader"],
        })))
        .unwrap();

        assert_eq!(user.id, "42");
        assert_eq!(user.name.as_deref(), Some("alice"));
        assert_eq!(user.roles, vec!["admin", "reader"]);
    }

    #[test]
    fn test_single_role_claim() {
        let user = CurrentUser::from_claims(claims(json!({"sub": "1", "role": "admin"}))).unwrap();
        assert_eq!(user.roles, vec!["admin"]);
    }

    #[test]
    fn test_subject_required() {
        let err = CurrentUser::from_claims(claims(json!({"name": "x"}))).unwrap_err();
        assert_eq!(err.kind, AuthFailureKind::InvalidToken);
    }

    #[test]
    fn test_expired_signature_classified() {
        let failure: AuthFailure =
            jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(failure.is_expired());

        let failure: AuthFailure =
            jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature).into();
        assert!(!failure.is_expired());
    }

    #[test]
    fn test_policy_matches_whole_segments() {
        let policy = AuthorizationPolicy::new(vec!["/api/v1/account".to_string()]);
        assert!(policy.requires_user("/api/v1/account"));
        assert!(policy.requires_user("/api/v1/account/profile"));
        assert!(!policy.requires_user("/api/v1/accounts"));
        assert!(!policy.requires_user("/api/v1/app/info"));
    }
}
