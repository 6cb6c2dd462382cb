//! Shared helpers for host integration tests

#![allow(dead_code)]

use anyhow::Result;
use api_host::{
    auditing::{AuditLogEntry, AuditingStore},
    auth::LocalIssuer,
    config::{Config, HostEnvironment},
    modules::{HostModule, ServiceConfigurationContext},
    Host,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub fn dev_config() -> Config {
    Config {
        environment: HostEnvironment::Development,
        ..Default::default()
    }
}

pub async fn host(config: Config) -> Result<Host> {
    Ok(Host::builder(config).build().await?)
}

pub async fn send(host: &Host, request: Request<Body>) -> Result<Response<Body>> {
    Ok(host.service().oneshot(request).await?)
}

pub async fn get(host: &Host, uri: &str) -> Result<Response<Body>> {
    send(host, Request::builder().uri(uri).body(Body::empty())?).await
}

pub async fn get_with_token(host: &Host, uri: &str, token: &str) -> Result<Response<Body>> {
    send(
        host,
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())?,
    )
    .await
}

pub async fn body_json(response: Response<Body>) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// A fresh token from the configured local issuer
pub fn local_token(config: &Config, subject: &str) -> Result<String> {
    let issuer = LocalIssuer::new(&config.auth_server)?;
    Ok(issuer.issue(subject, Some("alice"), &["admin".to_string()])?)
}

/// A token that expired well beyond the configured clock skew
pub fn expired_local_token(config: &Config, subject: &str) -> Result<String> {
    let auth = &config.auth_server;
    let past = chrono::Utc::now().timestamp() - 2 * auth.expiration as i64 - 60;
    let claims = json!({
        "sub": subject,
        "iss": auth.issuer,
        "aud": auth.audience,
        "exp": past,
    });
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )?)
}

/// Audit store keeping entries in memory
#[derive(Default)]
pub struct RecordingAuditStore {
    pub entries: Mutex<Vec<AuditLogEntry>>,
}

#[async_trait]
impl AuditingStore for RecordingAuditStore {
    async fn save(&self, entry: AuditLogEntry) -> api_host::Result<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}

/// Replaces the default audit store after the host module configured it
pub struct RecordingAuditModule(pub Arc<RecordingAuditStore>);

#[async_trait]
impl HostModule for RecordingAuditModule {
    fn name(&self) -> &'static str {
        "recording-audit"
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec!["api-host"]
    }

    async fn configure_services(&self, ctx: &mut ServiceConfigurationContext) -> api_host::Result<()> {
        let store: Arc<dyn AuditingStore> = self.0.clone();
        ctx.insert(store);
        Ok(())
    }
}
