//! Module system
//!
//! A host is assembled from [`HostModule`]s. Modules declare their
//! dependencies by name; [`ModuleGraph::resolve`] orders them so every
//! dependency configures before its dependents. Each module then gets two
//! passes over a shared [`ServiceConfigurationContext`], followed by an
//! initialization pass over the [`ApplicationBuilder`] that describes the
//! request pipeline.

pub mod account;
pub mod application;
pub mod caching;
mod context;
mod graph;
pub mod host;
mod registry;

pub use context::ServiceConfigurationContext;
pub use graph::ModuleGraph;
pub use registry::{ControllerRegistry, ControllerSet, EndpointGroup};

use crate::error::Result;
use crate::pipeline::ApplicationBuilder;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while resolving modules or registering their services
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module '{module}' depends on '{dependency}', which is not registered")]
    MissingDependency {
        module: String,
        dependency: String,
    },

    #[error("Circular module dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("Module '{0}' is registered more than once")]
    DuplicateModule(String),

    #[error("Required service is not registered: {0}")]
    MissingService(&'static str),

    #[error("Route prefix '{route}' is registered more than once")]
    DuplicateRoute { route: String },

    #[error("Invalid controller set '{name}': {reason}")]
    InvalidControllerSet { name: String, reason: String },
}

/// A unit of host composition
#[async_trait]
pub trait HostModule: Send + Sync {
    /// Unique module name, referenced by dependents
    fn name(&self) -> &'static str;

    /// Names of modules that must configure first
    fn depends_on(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// First pass, run for every module before any `configure_services`
    async fn pre_configure_services(&self, _ctx: &mut ServiceConfigurationContext) -> Result<()> {
        Ok(())
    }

    /// Register services and options
    async fn configure_services(&self, ctx: &mut ServiceConfigurationContext) -> Result<()>;

    /// Contribute request pipeline stages
    fn on_application_initialization(&self, _app: &mut ApplicationBuilder) -> Result<()> {
        Ok(())
    }
}
