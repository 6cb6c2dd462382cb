//! Health check route handler

use crate::{api::types::HealthReportResponse, server::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Every probe is healthy or degraded", body = HealthReportResponse),
        (status = 503, description = "At least one probe is unhealthy", body = HealthReportResponse),
    ),
    tag = "health",
)]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let report = state.health.run().await;
    let status = if report.status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthReportResponse::from(&report))).into_response()
}
