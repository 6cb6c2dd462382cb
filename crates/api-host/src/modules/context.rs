//! Shared state threaded through module configuration

use super::{ControllerRegistry, ModuleError};
use crate::config::{Config, HostEnvironment};
use axum::http::Extensions;
use std::sync::Arc;

/// Services and options registered by modules during startup
pub struct ServiceConfigurationContext {
    config: Arc<Config>,
    services: Extensions,

    /// Controller sets registered during pre-configuration
    pub controllers: ControllerRegistry,
}

impl ServiceConfigurationContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            services: Extensions::new(),
            controllers: ControllerRegistry::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn environment(&self) -> HostEnvironment {
        self.config.environment
    }

    /// Register a service, replacing any previous value of the same type
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.services.insert(value)
    }

    /// Register a service unless one of the same type already exists
    pub fn try_insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        if self.services.get::<T>().is_none() {
            self.services.insert(value);
        }
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.services.get::<T>()
    }

    pub fn require<T: Clone + Send + Sync + 'static>(&self) -> Result<&T, ModuleError> {
        self.services
            .get::<T>()
            .ok_or(ModuleError::MissingService(std::any::type_name::<T>()))
    }

    /// Mutate an options value in place, starting from its default
    pub fn configure<T, F>(&mut self, f: F)
    where
        T: Default + Clone + Send + Sync + 'static,
        F: FnOnce(&mut T),
    {
        if self.services.get::<T>().is_none() {
            self.services.insert(T::default());
        }
        if let Some(options) = self.services.get_mut::<T>() {
            f(options);
        }
    }

    /// Current value of an options type, or its default
    pub fn options<T: Default + Clone + Send + Sync + 'static>(&self) -> T {
        self.services.get::<T>().cloned().unwrap_or_default()
    }
}
