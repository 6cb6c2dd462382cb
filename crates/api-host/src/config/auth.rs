//! Authentication configuration

use serde::{Deserialize, Serialize};

/// Minimum length of the local-issuer signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Which token issuer this deployment trusts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Tokens are issued and signed by an external authority
    Remote,

    /// Tokens are issued by this service with a shared secret
    Local,
}

/// Authentication server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthServerConfig {
    /// Selected issuer strategy
    pub mode: AuthMode,

    /// Authority base URL (remote mode)
    pub authority: String,

    /// Refuse a non-https authority
    pub require_https_metadata: bool,

    /// Symmetric signing secret (local mode)
    pub secret: String,

    /// Token expiration window in seconds, also used as clock-skew tolerance
    pub expiration: u64,

    /// Expected audience (local mode)
    pub audience: String,

    /// Expected issuer (local mode)
    pub issuer: String,

    /// OAuth client id injected into the Swagger UI (remote mode)
    pub swagger_client_id: Option<String>,

    /// OAuth client secret injected into the Swagger UI (remote mode)
    pub swagger_client_secret: Option<String>,
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Local,
            authority: "https://localhost:44301".to_string(),
            require_https_metadata: true,
            secret: "apihost-development-signing-secret-change-me".to_string(),
            expiration: 300,
            audience: "ApiHost".to_string(),
            issuer: "ApiHost".to_string(),
            swagger_client_id: Some("ApiHost_Swagger".to_string()),
            swagger_client_secret: None,
        }
    }
}

impl AuthServerConfig {
    /// Authority without a trailing slash
    pub fn authority_base(&self) -> &str {
        self.authority.trim_end_matches('/')
    }
}
