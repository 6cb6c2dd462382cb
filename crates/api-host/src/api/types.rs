//! API types for the host endpoints

use crate::health::HealthReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

/// Health report returned by `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReportResponse {
    /// Worst state across all probes
    pub status: String,

    /// Wall time of the whole report
    pub total_duration_ms: f64,

    /// Probe results keyed by probe name
    pub entries: BTreeMap<String, HealthEntryResponse>,
}

/// Result of one probe
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntryResponse {
    pub status: String,
    pub description: Option<String>,
    pub duration_ms: f64,
}

impl From<&HealthReport> for HealthReportResponse {
    fn from(report: &HealthReport) -> Self {
        Self {
            status: report.status.to_string(),
            total_duration_ms: report.total_duration.as_secs_f64() * 1000.0,
            entries: report
                .entries
                .iter()
                .map(|entry| {
                    (
                        entry.name.clone(),
                        HealthEntryResponse {
                            status: entry.status.to_string(),
                            description: entry.description.clone(),
                            duration_ms: entry.duration.as_secs_f64() * 1000.0,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Application information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppInfoResponse {
    /// Application name
    pub name: String,

    /// Host version
    pub version: String,

    /// Hosting environment
    pub environment: String,

    /// Culture selected for this request
    pub culture: String,

    /// Localized welcome text
    pub welcome: String,
}

/// Profile of the calling user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Profile update
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    /// New display name; must not be blank
    pub display_name: String,

    pub email: Option<String>,
}

/// Result of a profile update
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileResponse {
    pub profile: ProfileDto,

    /// Localized confirmation
    pub message: String,
}

/// Query options for `GET /me`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MeQuery {
    /// Include raw token claims in the response
    pub include_claims: Option<bool>,
}

/// The calling user as seen by the host
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub name: Option<String>,
    pub roles: Vec<String>,

    /// Token claims, present when requested
    #[schema(value_type = Option<Object>)]
    pub claims: Option<serde_json::Value>,
}
