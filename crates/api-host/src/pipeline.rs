//! Request pipeline assembly
//!
//! Modules describe the pipeline as an ordered list of [`Stage`]s, outermost
//! first. [`ApplicationBuilder::build`] checks the ordering rules and turns
//! the list into a router.

use crate::api::middleware::{
    audit_request, authenticate, authorize, developer_exception_page, enrich_logs,
    localize_request, propagate_correlation_id, set_correlation_id, unit_of_work,
};
use crate::api::routes::{files::virtual_file, health::health_check};
use crate::config::HostEnvironment;
use crate::error::Result;
use crate::server::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use common::ConfigurationError;
use std::fmt;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

pub const HEALTH_PATH: &str = "/health";

/// One step of the request pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Panics become a 500 with details; development only
    DeveloperExceptionPage,
    RequestLocalization,
    CorrelationId,
    /// Virtual files served for any path no route claims
    StaticFiles,
    Routing,
    Cors,
    Authentication,
    Authorization,
    HealthChecks,
    Swagger,
    Auditing,
    LogEnrichment,
    UnitOfWork,
    Endpoints,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered pipeline description contributed by modules
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    environment: HostEnvironment,
    stages: Vec<Stage>,
}

impl ApplicationBuilder {
    pub fn new(environment: HostEnvironment) -> Self {
        Self {
            environment,
            stages: Vec::new(),
        }
    }

    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }

    /// Append a stage inside the ones added so far
    pub fn use_stage(&mut self, stage: Stage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }

    /// Check the ordering rules
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        let invalid = |details: String| ConfigurationError::validation_failed(details);

        for (i, stage) in self.stages.iter().enumerate() {
            if self.stages[..i].contains(stage) {
                return Err(invalid(format!("stage {stage} is registered twice")));
            }
        }

        if self.stages.last() != Some(&Stage::Endpoints) {
            return Err(invalid("endpoint dispatch must be the last stage".to_string()));
        }

        let before = |a: Stage, b: Stage| match (self.position(a), self.position(b)) {
            (Some(a), Some(b)) => a < b,
            _ => true,
        };
        if !before(Stage::Cors, Stage::Authentication) {
            return Err(invalid("CORS must run before authentication".to_string()));
        }
        if !before(Stage::Authentication, Stage::Authorization) {
            return Err(invalid(
                "authentication must run before authorization".to_string(),
            ));
        }
        if let Some(uow) = self.position(Stage::UnitOfWork) {
            if uow + 2 != self.stages.len() {
                return Err(invalid(
                    "unit of work must wrap endpoint dispatch directly".to_string(),
                ));
            }
        }
        if let Some(page) = self.position(Stage::DeveloperExceptionPage) {
            if !self.environment.is_development() {
                return Err(invalid(format!(
                    "developer exception page is not allowed in {}",
                    self.environment.as_str()
                )));
            }
            if page != 0 {
                return Err(invalid(
                    "developer exception page must be the outermost stage".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Assemble the router, innermost stage first
    pub fn build(
        &self,
        state: AppState,
        endpoints: Router<AppState>,
        swagger: SwaggerUi,
        cors: CorsLayer,
    ) -> Result<Router> {
        self.validate()?;

        let mut endpoints = Some(endpoints);
        let mut swagger = Some(swagger);
        let mut cors = Some(cors);

        let mut router: Router<AppState> = Router::new();
        for stage in self.stages.iter().rev() {
            router = match stage {
                Stage::Endpoints => match endpoints.take() {
                    Some(endpoints) => router.merge(endpoints),
                    None => router,
                },
                Stage::UnitOfWork => {
                    router.layer(from_fn_with_state(state.clone(), unit_of_work))
                }
                Stage::LogEnrichment => router.layer(from_fn(enrich_logs)),
                Stage::Auditing => router.layer(from_fn_with_state(state.clone(), audit_request)),
                Stage::Swagger => match swagger.take() {
                    Some(ui) => router.merge(ui),
                    None => router,
                },
                Stage::HealthChecks => router.route(HEALTH_PATH, get(health_check)),
                Stage::Authorization => router.layer(from_fn_with_state(state.clone(), authorize)),
                Stage::Authentication => {
                    router.layer(from_fn_with_state(state.clone(), authenticate))
                }
                Stage::Cors => match cors.take() {
                    Some(cors) => router.layer(cors),
                    None => router,
                },
                // Route matching is the router itself
                Stage::Routing => router,
                Stage::StaticFiles => router.fallback(virtual_file),
                Stage::CorrelationId => router
                    .layer(propagate_correlation_id())
                    .layer(set_correlation_id()),
                Stage::RequestLocalization => {
                    router.layer(from_fn_with_state(state.clone(), localize_request))
                }
                Stage::DeveloperExceptionPage => {
                    router.layer(CatchPanicLayer::custom(developer_exception_page))
                }
            };
        }

        info!(
            stages = %self
                .stages
                .iter()
                .map(Stage::to_string)
                .collect::<Vec<_>>()
                .join(" -> "),
            "Request pipeline assembled"
        );

        Ok(router
            .layer(TimeoutLayer::new(state.config.request_timeout()))
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }
}
