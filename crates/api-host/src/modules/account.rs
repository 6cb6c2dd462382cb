//! Account module: authenticated profile endpoints

use super::{ControllerSet, EndpointGroup, HostModule, ModuleError, ServiceConfigurationContext};
use crate::api::{
    routes::account,
    types::{MeResponse, ProfileDto, UpdateProfileRequest, UpdateProfileResponse},
};
use crate::cache::DistributedCacheOptions;
use crate::error::{ErrorDetails, ErrorResponse, Result};
use crate::server::AppState;
use crate::versioning::ApiVersion;
use async_trait::async_trait;
use axum::{routing::get, Router};
use utoipa::OpenApi;

pub const MODULE_NAME: &str = "account";

#[derive(OpenApi)]
#[openapi(
    paths(account::get_profile, account::update_profile),
    components(schemas(
        ProfileDto,
        UpdateProfileRequest,
        UpdateProfileResponse,
        ErrorResponse,
        ErrorDetails
    )),
    tags((name = "account", description = "Profile of the calling user")),
)]
struct AccountV1Doc;

#[derive(OpenApi)]
#[openapi(
    paths(account::me),
    components(schemas(MeResponse, ErrorResponse, ErrorDetails)),
    tags((name = "account", description = "Profile of the calling user")),
)]
struct AccountV2Doc;

fn v1_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(account::get_profile).put(account::update_profile),
    )
}

fn v1_doc() -> utoipa::openapi::OpenApi {
    AccountV1Doc::openapi()
}

fn v2_routes() -> Router<AppState> {
    Router::new().route("/me", get(account::me))
}

fn v2_doc() -> utoipa::openapi::OpenApi {
    AccountV2Doc::openapi()
}

/// Controller set mounted at `/api/v{major}/account`
pub fn controllers() -> ControllerSet {
    ControllerSet {
        name: MODULE_NAME,
        root: "account",
        requires_authentication: true,
        groups: vec![
            EndpointGroup {
                version: ApiVersion::new(1, 0),
                routes: v1_routes,
                openapi: v1_doc,
            },
            EndpointGroup {
                version: ApiVersion::new(2, 0),
                routes: v2_routes,
                openapi: v2_doc,
            },
        ],
    }
}

pub struct AccountModule;

#[async_trait]
impl HostModule for AccountModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec![super::caching::MODULE_NAME]
    }

    /// Profiles live in the distributed cache
    async fn configure_services(&self, ctx: &mut ServiceConfigurationContext) -> Result<()> {
        if ctx.get::<DistributedCacheOptions>().is_none() {
            return Err(ModuleError::MissingService("DistributedCacheOptions").into());
        }
        Ok(())
    }
}
