//! Shared request state and the HTTP server

use crate::{
    auditing::{AuditingOptions, AuditingService, AuditingStore},
    auth::{AuthorizationPolicy, TokenValidator},
    cache::{DistributedCache, DistributedCacheOptions},
    config::{Config, HostEnvironment},
    data_protection::{DataProtectionOptions, DataProtector, KeyRepository},
    error::{Error, Result},
    health::HealthCheckRegistry,
    localization::{LocalizationOptions, Localizer},
    modules::ServiceConfigurationContext,
    uow::UnitOfWorkManager,
    versioning::NormalizeApiPath,
    vfs::{VirtualFileOptions, VirtualFileSystem},
};
use axum::{extract::Request, Router, ServiceExt};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// The assembled application: path normalization in front of the router
pub type HostService = NormalizeApiPath<Router>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    pub environment: HostEnvironment,

    /// Active bearer token validator
    pub auth: Arc<dyn TokenValidator>,

    /// Prefixes that need an authenticated caller
    pub authorization: Arc<AuthorizationPolicy>,

    pub localizer: Arc<Localizer>,

    pub cache: DistributedCache,

    /// Module assets
    pub vfs: Arc<VirtualFileSystem>,

    pub data_protector: Arc<DataProtector>,

    pub health: Arc<HealthCheckRegistry>,

    pub auditing: Arc<AuditingService>,

    pub unit_of_work: UnitOfWorkManager,
}

impl AppState {
    /// Materialize the services recorded during module configuration
    pub async fn from_context(ctx: &ServiceConfigurationContext) -> Result<Self> {
        let config = ctx.shared_config();

        let vfs = VirtualFileSystem::from_options(&ctx.options::<VirtualFileOptions>());
        let localizer = Localizer::load(ctx.options::<LocalizationOptions>(), &vfs).await?;

        let cache = DistributedCache::from_config(
            &config.cache,
            &config.redis.configuration,
            ctx.options::<DistributedCacheOptions>(),
        )
        .await?;

        let repository = ctx.require::<Arc<dyn KeyRepository>>()?.clone();
        let data_protector =
            DataProtector::initialize(repository, ctx.options::<DataProtectionOptions>()).await?;

        let auditing = AuditingService::new(
            ctx.options::<AuditingOptions>(),
            ctx.require::<Arc<dyn AuditingStore>>()?.clone(),
        );

        Ok(Self {
            environment: config.environment,
            auth: ctx.require::<Arc<dyn TokenValidator>>()?.clone(),
            authorization: Arc::new(AuthorizationPolicy::new(
                ctx.controllers.protected_prefixes(),
            )),
            localizer: Arc::new(localizer),
            cache,
            vfs: Arc::new(vfs),
            data_protector: Arc::new(data_protector),
            health: Arc::new(ctx.options::<HealthCheckRegistry>()),
            auditing: Arc::new(auditing),
            unit_of_work: UnitOfWorkManager,
            config,
        })
    }
}

/// Main server structure
pub struct Server {
    config: Arc<Config>,
    app: HostService,
}

impl Server {
    pub fn new(config: Arc<Config>, app: HostService) -> Self {
        Self { config, app }
    }

    /// Run the server until shutdown signal
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal {
                message: format!("Failed to bind to address {addr}: {e}"),
            })?;

        info!(environment = self.config.environment.as_str(), "API host listening on {}", addr);

        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service(self.app),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal {
            message: format!("Server error: {e}"),
        })?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down");
        },
    }
}
