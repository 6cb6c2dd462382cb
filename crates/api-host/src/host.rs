//! Host bootstrap
//!
//! [`Host::builder`] collects modules, resolves their dependency order and
//! runs the configuration passes. The result is an [`AppState`] and a
//! router assembled from the pipeline the modules describe.

use crate::{
    api::middleware::{cors_layer, CorsOptions},
    config::Config,
    docs::{ApiDocumentation, SwaggerOptions},
    error::Result,
    modules::{
        account::AccountModule, application::ApplicationModule, caching::CachingModule,
        host::ApiHostModule, HostModule, ModuleGraph, ServiceConfigurationContext,
    },
    pipeline::{ApplicationBuilder, Stage},
    server::{AppState, HostService, Server},
    versioning::{ApiPathNormalizer, ApiVersioningOptions, NormalizeApiPathLayer},
};
use std::sync::Arc;
use tower::Layer;
use tracing::info;

/// Modules every host runs with
fn default_modules() -> Vec<Arc<dyn HostModule>> {
    vec![
        Arc::new(CachingModule),
        Arc::new(ApplicationModule),
        Arc::new(AccountModule),
        Arc::new(ApiHostModule),
    ]
}

pub struct HostBuilder {
    config: Config,
    modules: Vec<Arc<dyn HostModule>>,
}

impl HostBuilder {
    /// Register a module in addition to the defaults
    pub fn add_module(mut self, module: impl HostModule + 'static) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    pub async fn build(self) -> Result<Host> {
        self.config.validate()?;
        let config = Arc::new(self.config);

        let mut modules = default_modules();
        modules.extend(self.modules);
        let modules = ModuleGraph::resolve(modules)?;

        let mut ctx = ServiceConfigurationContext::new(config.clone());
        for module in &modules {
            module.pre_configure_services(&mut ctx).await?;
        }
        for module in &modules {
            module.configure_services(&mut ctx).await?;
            info!(module = module.name(), "Module configured");
        }

        let state = AppState::from_context(&ctx).await?;

        let mut app = ApplicationBuilder::new(config.environment);
        for module in &modules {
            module.on_application_initialization(&mut app)?;
        }

        let swagger = ctx.options::<SwaggerOptions>();
        let documentation = ApiDocumentation::build(&ctx.controllers.documents(), &swagger);
        let router = app.build(
            state.clone(),
            ctx.controllers.routes(),
            documentation.swagger_ui(&swagger),
            cors_layer(ctx.options::<CorsOptions>().origins),
        )?;

        let normalizer = ApiPathNormalizer::new(
            ctx.options::<ApiVersioningOptions>(),
            ctx.controllers.versions(),
            ctx.controllers.literal_segments(),
        );
        let service = NormalizeApiPathLayer::new(normalizer).layer(router);

        Ok(Host {
            config,
            state,
            service,
            stages: app.stages().to_vec(),
            modules: modules.iter().map(|m| m.name()).collect(),
        })
    }
}

/// A configured host, ready to serve
pub struct Host {
    config: Arc<Config>,
    state: AppState,
    service: HostService,
    stages: Vec<Stage>,
    modules: Vec<&'static str>,
}

impl Host {
    pub fn builder(config: Config) -> HostBuilder {
        HostBuilder {
            config,
            modules: Vec::new(),
        }
    }

    /// The request-handling service
    pub fn service(&self) -> HostService {
        self.service.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Pipeline stages, outermost first
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Module names in initialization order
    pub fn modules(&self) -> &[&'static str] {
        &self.modules
    }

    pub async fn run(self) -> Result<()> {
        Server::new(self.config, self.service).run().await
    }
}
