//! The API host module
//!
//! Registers the controller sets of the application and account modules and
//! configures every cross-cutting service the host runs with, then lays out
//! the request pipeline.

use super::{account, application, caching, HostModule, ServiceConfigurationContext};
use crate::api::middleware::CorsOptions;
use crate::auditing::{
    AuditingOptions, AuditingStore, EntityHistorySelector, LoggingAuditStore,
};
use crate::auth::validator_for;
use crate::cache::{connect_redis, DistributedCacheOptions};
use crate::data_protection::{
    DataProtectionOptions, EphemeralKeyRepository, KeyRepository, KeyStorage, RedisKeyRepository,
};
use crate::docs::SwaggerOptions;
use crate::error::Result;
use crate::health::{DatabaseHealthCheck, HealthCheckRegistry};
use crate::localization::{LocalizationOptions, LocalizationResourceOptions};
use crate::pipeline::{ApplicationBuilder, Stage};
use crate::versioning::{ApiVersion, ApiVersioningOptions};
use crate::vfs::VirtualFileOptions;
use async_trait::async_trait;
use common::ConfigurationError;
use std::sync::Arc;
use tracing::{debug, info};

pub const MODULE_NAME: &str = "api-host";

/// Base text resource shared by every module
pub const UI_RESOURCE: &str = "Ui";

/// Texts of the host itself; falls back to [`UI_RESOURCE`]
pub const HOST_RESOURCE: &str = "ApiHost";

pub struct ApiHostModule;

impl ApiHostModule {
    fn configure_health_checks(ctx: &mut ServiceConfigurationContext) -> Result<()> {
        let mut registry = ctx.options::<HealthCheckRegistry>();
        if let Some(url) = ctx.config().connection_strings.default.clone() {
            registry.add(Arc::new(DatabaseHealthCheck::connect_lazy(&url)?));
        }
        debug!(checks = ?registry.names(), "Health checks registered");
        ctx.insert(registry);
        Ok(())
    }

    fn configure_auditing(ctx: &mut ServiceConfigurationContext) {
        let application_name = ctx.config().app.name.clone();
        ctx.configure::<AuditingOptions, _>(|options| {
            options.application_name = application_name;
            options.is_enabled = true;
            options.entity_history = EntityHistorySelector::AllEntities;
        });

        let store: Arc<dyn AuditingStore> = Arc::new(LoggingAuditStore);
        ctx.try_insert(store);
    }

    fn configure_versioning(ctx: &mut ServiceConfigurationContext) {
        ctx.configure::<ApiVersioningOptions, _>(|options| {
            options.default_version = ApiVersion::DEFAULT;
            options.assume_default_when_unspecified = true;
            options.lowercase_urls = true;
        });
    }

    fn configure_authentication(ctx: &mut ServiceConfigurationContext) -> Result<()> {
        let validator = validator_for(&ctx.config().auth_server)?;
        info!(mode = ?validator.mode(), "Authentication configured");
        ctx.insert(validator);
        Ok(())
    }

    fn configure_localization(ctx: &mut ServiceConfigurationContext) {
        ctx.configure::<LocalizationOptions, _>(|options| {
            options.resources.push(LocalizationResourceOptions {
                name: UI_RESOURCE.to_string(),
                base: None,
                virtual_path: "localization/ui".to_string(),
            });
            options.resources.push(LocalizationResourceOptions {
                name: HOST_RESOURCE.to_string(),
                base: Some(UI_RESOURCE.to_string()),
                virtual_path: "localization/apihost".to_string(),
            });
            options.default_resource = Some(HOST_RESOURCE.to_string());
        });
    }

    fn configure_cache(ctx: &mut ServiceConfigurationContext) {
        let key_prefix = ctx.config().cache.key_prefix.clone();
        ctx.configure::<DistributedCacheOptions, _>(|options| {
            options.key_prefix = key_prefix;
        });
    }

    fn configure_virtual_files(ctx: &mut ServiceConfigurationContext) {
        let options = VirtualFileOptions::for_environment(ctx.environment());
        ctx.insert(options);
    }

    async fn configure_data_protection(ctx: &mut ServiceConfigurationContext) -> Result<()> {
        let config = ctx.shared_config();
        let key_lifetime = config.data_protection.key_lifetime().ok_or_else(|| {
            ConfigurationError::invalid_value(
                "data_protection.key_lifetime_days",
                config.data_protection.key_lifetime_days.to_string(),
                "out of range",
            )
        })?;
        ctx.configure::<DataProtectionOptions, _>(|options| {
            options.application_name = config.app.name.clone();
            options.key_lifetime = key_lifetime;
        });

        let repository: Arc<dyn KeyRepository> = match KeyStorage::for_environment(ctx.environment())
        {
            KeyStorage::Redis => {
                let conn = connect_redis(&config.redis.configuration).await?;
                Arc::new(RedisKeyRepository::new(
                    conn,
                    config.data_protection.key_namespace.clone(),
                ))
            }
            KeyStorage::Ephemeral => Arc::new(EphemeralKeyRepository::default()),
        };
        ctx.try_insert(repository);
        Ok(())
    }

    fn configure_cors(ctx: &mut ServiceConfigurationContext) {
        let origins = ctx.config().app.cors_origins();
        debug!(origins = ?origins, "CORS origins");
        ctx.insert(CorsOptions { origins });
    }

    fn configure_documentation(ctx: &mut ServiceConfigurationContext) {
        let options = SwaggerOptions::for_auth(&ctx.config().auth_server);
        ctx.insert(options);
    }
}

#[async_trait]
impl HostModule for ApiHostModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec![
            caching::MODULE_NAME,
            application::MODULE_NAME,
            account::MODULE_NAME,
        ]
    }

    async fn pre_configure_services(&self, ctx: &mut ServiceConfigurationContext) -> Result<()> {
        ctx.controllers.create(application::controllers())?;
        ctx.controllers.create(account::controllers())?;
        Ok(())
    }

    async fn configure_services(&self, ctx: &mut ServiceConfigurationContext) -> Result<()> {
        Self::configure_health_checks(ctx)?;
        Self::configure_auditing(ctx);
        Self::configure_versioning(ctx);
        Self::configure_authentication(ctx)?;
        Self::configure_localization(ctx);
        Self::configure_cache(ctx);
        Self::configure_virtual_files(ctx);
        Self::configure_data_protection(ctx).await?;
        Self::configure_cors(ctx);
        Self::configure_documentation(ctx);
        Ok(())
    }

    fn on_application_initialization(&self, app: &mut ApplicationBuilder) -> Result<()> {
        if app.environment().is_development() {
            app.use_stage(Stage::DeveloperExceptionPage);
        }

        app.use_stage(Stage::RequestLocalization)
            .use_stage(Stage::CorrelationId)
            .use_stage(Stage::StaticFiles)
            .use_stage(Stage::Routing)
            .use_stage(Stage::Cors)
            .use_stage(Stage::Authentication)
            .use_stage(Stage::Authorization)
            .use_stage(Stage::HealthChecks)
            .use_stage(Stage::Swagger)
            .use_stage(Stage::Auditing)
            .use_stage(Stage::LogEnrichment)
            .use_stage(Stage::UnitOfWork)
            .use_stage(Stage::Endpoints);
        Ok(())
    }
}
