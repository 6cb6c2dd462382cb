//! Audit capture

use super::correlation::correlation_id;
use crate::{
    auditing::{AuditLogEntry, AuditScope},
    auth::CurrentUser,
    server::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::time::Instant;
use tracing::warn;

/// Record one audit entry per request, with the entity changes committed
/// by its unit of work
pub async fn audit_request(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auditing = state.auditing.clone();
    if !auditing.options.is_enabled {
        return next.run(req).await;
    }

    let execution_time = Utc::now();
    let started = Instant::now();
    let http_method = req.method().to_string();
    let url = req.uri().to_string();
    let user_id = req.extensions().get::<CurrentUser>().map(|u| u.id.clone());
    let correlation_id = correlation_id(req.headers());

    let scope = AuditScope::default();
    req.extensions_mut().insert(scope.clone());

    let response = next.run(req).await;

    let entry = AuditLogEntry {
        application_name: auditing.options.application_name.clone(),
        user_id,
        correlation_id,
        http_method,
        url,
        status_code: response.status().as_u16(),
        execution_time,
        duration_ms: started.elapsed().as_millis() as u64,
        entity_changes: auditing.select_changes(scope.take()),
    };

    if let Err(e) = auditing.store.save(entry).await {
        warn!(error = %e, "Failed to save audit log entry");
    }

    response
}
