//! Application module: anonymous application endpoints

use super::{ControllerSet, EndpointGroup, HostModule, ServiceConfigurationContext};
use crate::api::{routes::app, types::AppInfoResponse};
use crate::error::Result;
use crate::server::AppState;
use crate::versioning::ApiVersion;
use async_trait::async_trait;
use axum::{routing::get, Router};
use utoipa::OpenApi;

pub const MODULE_NAME: &str = "application";

#[derive(OpenApi)]
#[openapi(
    paths(app::app_info),
    components(schemas(AppInfoResponse)),
    tags((name = "application", description = "Application information")),
)]
struct ApplicationV1Doc;

fn v1_routes() -> Router<AppState> {
    Router::new().route("/info", get(app::app_info))
}

fn v1_doc() -> utoipa::openapi::OpenApi {
    ApplicationV1Doc::openapi()
}

/// Controller set mounted at `/api/v{major}/app`
pub fn controllers() -> ControllerSet {
    ControllerSet {
        name: MODULE_NAME,
        root: "app",
        requires_authentication: false,
        groups: vec![EndpointGroup {
            version: ApiVersion::new(1, 0),
            routes: v1_routes,
            openapi: v1_doc,
        }],
    }
}

pub struct ApplicationModule;

#[async_trait]
impl HostModule for ApplicationModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec![super::caching::MODULE_NAME]
    }

    async fn configure_services(&self, _ctx: &mut ServiceConfigurationContext) -> Result<()> {
        Ok(())
    }
}
