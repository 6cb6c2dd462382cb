//! Caching module

use super::{HostModule, ServiceConfigurationContext};
use crate::cache::DistributedCacheOptions;
use crate::error::Result;
use async_trait::async_trait;

pub const MODULE_NAME: &str = "caching";

/// Registers the distributed cache defaults the host refines later
pub struct CachingModule;

#[async_trait]
impl HostModule for CachingModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn configure_services(&self, ctx: &mut ServiceConfigurationContext) -> Result<()> {
        let default_ttl = ctx.config().cache_ttl();
        ctx.configure::<DistributedCacheOptions, _>(|options| {
            options.default_ttl = default_ttl;
        });
        Ok(())
    }
}
