//! Account handlers

use crate::{
    api::types::{MeQuery, MeResponse, ProfileDto, UpdateProfileRequest, UpdateProfileResponse},
    auditing::{EntityChange, EntityChangeType},
    auth::CurrentUser,
    error::{Error, Result},
    localization::RequestCulture,
    server::AppState,
    uow::UnitOfWork,
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

fn profile_key(user_id: &str) -> String {
    format!("profile:{user_id}")
}

async fn load_profile(state: &AppState, user: &CurrentUser) -> Result<Option<ProfileDto>> {
    state.cache.get(&profile_key(&user.id)).await
}

/// Profile of the calling user
#[utoipa::path(
    get,
    path = "/api/v{version}/account/profile",
    operation_id = "get_profile",
    params(("version" = String, Path, description = "API version")),
    responses(
        (status = 200, description = "Current profile", body = ProfileDto),
        (status = 401, description = "No authenticated caller", body = crate::error::ErrorResponse),
    ),
    tag = "account",
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileDto>> {
    let profile = load_profile(&state, &user).await?.unwrap_or_else(|| ProfileDto {
        user_id: user.id.clone(),
        display_name: user.name.clone().unwrap_or_else(|| user.id.clone()),
        email: None,
        updated_at: None,
    });

    Ok(Json(profile))
}

/// Update the calling user's profile
#[utoipa::path(
    put,
    path = "/api/v{version}/account/profile",
    operation_id = "update_profile",
    params(("version" = String, Path, description = "API version")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UpdateProfileResponse),
        (status = 400, description = "Display name is blank", body = crate::error::ErrorResponse),
        (status = 401, description = "No authenticated caller", body = crate::error::ErrorResponse),
    ),
    tag = "account",
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    uow: UnitOfWork,
    culture: Option<Extension<RequestCulture>>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>> {
    let culture = culture
        .map(|Extension(RequestCulture(c))| c)
        .unwrap_or_else(|| state.localizer.default_culture().to_string());

    let display_name = request.display_name.trim();
    if display_name.is_empty() {
        return Err(Error::InvalidRequest {
            message: state.localizer.text(&culture, "DisplayNameRequired"),
        });
    }

    let previous = load_profile(&state, &user).await?;
    let profile = ProfileDto {
        user_id: user.id.clone(),
        display_name: display_name.to_string(),
        email: request.email,
        updated_at: Some(Utc::now()),
    };

    let change = match &previous {
        Some(old) => EntityChange::new("Profile", &user.id, EntityChangeType::Updated)
            .property(
                "display_name",
                Some(old.display_name.as_str()),
                Some(profile.display_name.as_str()),
            )
            .property("email", old.email.as_deref(), profile.email.as_deref()),
        None => EntityChange::new("Profile", &user.id, EntityChangeType::Created)
            .property("display_name", None, Some(profile.display_name.as_str()))
            .property("email", None, profile.email.as_deref()),
    };
    uow.record(change)?;

    state.cache.set(&profile_key(&user.id), &profile).await?;
    info!(user_id = %user.id, "Profile updated");

    Ok(Json(UpdateProfileResponse {
        profile,
        message: state.localizer.text(&culture, "ProfileUpdated"),
    }))
}

/// The calling user
#[utoipa::path(
    get,
    path = "/api/v{version}/account/me",
    operation_id = "me",
    params(("version" = String, Path, description = "API version"), MeQuery),
    responses(
        (status = 200, description = "Calling user", body = MeResponse),
        (status = 401, description = "No authenticated caller", body = crate::error::ErrorResponse),
    ),
    tag = "account",
)]
pub async fn me(user: CurrentUser, Query(query): Query<MeQuery>) -> Json<MeResponse> {
    let claims = query
        .include_claims
        .unwrap_or(false)
        .then(|| Value::Object(user.claims.clone()));

    Json(MeResponse {
        id: user.id,
        name: user.name,
        roles: user.roles,
        claims,
    })
}
