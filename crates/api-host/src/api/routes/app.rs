//! Application information handlers

use crate::{api::types::AppInfoResponse, localization::RequestCulture, server::AppState};
use axum::{extract::State, Extension, Json};

/// Application name, version and a localized greeting
#[utoipa::path(
    get,
    path = "/api/v{version}/app/info",
    operation_id = "app_info",
    params(("version" = String, Path, description = "API version")),
    responses(
        (status = 200, description = "Application information", body = AppInfoResponse),
    ),
    tag = "application",
)]
pub async fn app_info(
    State(state): State<AppState>,
    culture: Option<Extension<RequestCulture>>,
) -> Json<AppInfoResponse> {
    let culture = culture
        .map(|Extension(RequestCulture(c))| c)
        .unwrap_or_else(|| state.localizer.default_culture().to_string());

    Json(AppInfoResponse {
        name: state.config.app.name.clone(),
        version: crate::VERSION.to_string(),
        environment: state.environment.as_str().to_string(),
        welcome: state.localizer.text(&culture, "Welcome"),
        culture,
    })
}
