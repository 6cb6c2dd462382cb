mod support;

use anyhow::Result;
use api_host::{auditing::EntityChangeType, Host};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use support::{dev_config, get, local_token, send, RecordingAuditModule, RecordingAuditStore};
use serde_json::json;
use std::sync::Arc;

async fn recording_host() -> Result<(Host, Arc<RecordingAuditStore>, String)> {
    let config = dev_config();
    let token = local_token(&config, "user-1")?;
    let store = Arc::new(RecordingAuditStore::default());
    let host = Host::builder(config)
        .add_module(RecordingAuditModule(store.clone()))
        .build()
        .await?;
    Ok((host, store, token))
}

fn put_profile(token: &str, body: serde_json::Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("PUT")
        .uri("/api/v1/account/profile")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

#[tokio::test]
async fn test_committed_changes_are_audited() -> Result<()> {
    let (host, store, token) = recording_host().await?;

    let response = send(
        &host,
        put_profile(&token, json!({ "display_name": "Alice", "email": "alice@example.com" }))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let entries = store.entries.lock();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.user_id.as_deref(), Some("user-1"));
    assert_eq!(entry.http_method, "PUT");
    assert_eq!(entry.status_code, 200);
    assert!(entry.correlation_id.is_some());
    assert_eq!(entry.entity_changes.len(), 1);

    let change = &entry.entity_changes[0];
    assert_eq!(change.entity_type, "Profile");
    assert_eq!(change.entity_id, "user-1");
    assert_eq!(change.change_type, EntityChangeType::Created);
    assert_eq!(
        change.properties.get("display_name"),
        Some(&(None, Some("Alice".to_string())))
    );
    Ok(())
}

#[tokio::test]
async fn test_second_update_records_previous_values() -> Result<()> {
    let (host, store, token) = recording_host().await?;

    send(&host, put_profile(&token, json!({ "display_name": "Alice" }))?).await?;
    send(&host, put_profile(&token, json!({ "display_name": "Alicia" }))?).await?;

    let entries = store.entries.lock();
    assert_eq!(entries.len(), 2);
    let change = &entries[1].entity_changes[0];
    assert_eq!(change.change_type, EntityChangeType::Updated);
    assert_eq!(
        change.properties.get("display_name"),
        Some(&(Some("Alice".to_string()), Some("Alicia".to_string())))
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_request_rolls_back_changes() -> Result<()> {
    let (host, store, token) = recording_host().await?;

    let response = send(&host, put_profile(&token, json!({ "display_name": "   " }))?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let entries = store.entries.lock();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status_code, 400);
    assert!(entries[0].entity_changes.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_anonymous_request_audited_without_user() -> Result<()> {
    let (host, store, _) = recording_host().await?;

    let response = get(&host, "/api/v1/app/info").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let entries = store.entries.lock();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, None);
    assert_eq!(entries[0].url, "/api/v1/app/info");
    Ok(())
}

#[tokio::test]
async fn test_health_endpoint_not_audited() -> Result<()> {
    let (host, store, _) = recording_host().await?;

    get(&host, "/health").await?;
    assert!(store.entries.lock().is_empty());
    Ok(())
}
