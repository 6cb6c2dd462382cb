//! Static controller registry
//!
//! Handler sets are registered explicitly. Each set owns a route root and
//! one endpoint group per API version; every group is mounted under
//! `/api/v{major}/{root}`.

use super::ModuleError;
use crate::server::AppState;
use crate::versioning::{ApiVersion, API_ROOT, VERSION_TOKEN};
use axum::Router;
use std::collections::{BTreeSet, HashSet};
use utoipa::openapi::OpenApi;

/// Builds the routes of one endpoint group, relative to the set root
pub type RouteFactory = fn() -> Router<AppState>;

/// Builds the OpenAPI fragment of one endpoint group
pub type DocumentFactory = fn() -> OpenApi;

/// Endpoints of a controller set for one API version
#[derive(Clone)]
pub struct EndpointGroup {
    pub version: ApiVersion,
    pub routes: RouteFactory,
    pub openapi: DocumentFactory,
}

/// A conventional controller set
#[derive(Clone)]
pub struct ControllerSet {
    /// Module that owns the set
    pub name: &'static str,

    /// Route root below the version segment
    pub root: &'static str,

    /// Whether every endpoint in the set needs an authenticated caller
    pub requires_authentication: bool,

    pub groups: Vec<EndpointGroup>,
}

/// Registered controller sets
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    sets: Vec<ControllerSet>,
}

impl ControllerRegistry {
    /// Register a controller set
    pub fn create(&mut self, set: ControllerSet) -> Result<(), ModuleError> {
        let invalid = |reason: String| ModuleError::InvalidControllerSet {
            name: set.name.to_string(),
            reason,
        };

        if set.root.is_empty() || set.root.contains('/') {
            return Err(invalid(format!("root '{}' must be a single segment", set.root)));
        }
        if set.root != set.root.to_ascii_lowercase() {
            return Err(invalid(format!("root '{}' must be lowercase", set.root)));
        }
        if set.groups.is_empty() {
            return Err(invalid("no endpoint groups".to_string()));
        }

        let template_prefix = format!("/{API_ROOT}/{VERSION_TOKEN}/{}", set.root);
        let mut seen: HashSet<String> = self.prefixes().collect();
        for group in &set.groups {
            let prefix = Self::route_prefix(&set, group.version);
            if !seen.insert(prefix.clone()) {
                return Err(ModuleError::DuplicateRoute { route: prefix });
            }

            let doc = (group.openapi)();
            if let Some(path) = doc
                .paths
                .paths
                .keys()
                .find(|p| !p.starts_with(&template_prefix))
            {
                return Err(invalid(format!(
                    "documented path '{path}' is outside '{template_prefix}'"
                )));
            }
        }

        self.sets.push(set);
        Ok(())
    }

    /// Mount point of a controller set for one version
    pub fn route_prefix(set: &ControllerSet, version: ApiVersion) -> String {
        format!("/{API_ROOT}/{}/{}", version.group_name(), set.root)
    }

    fn prefixes(&self) -> impl Iterator<Item = String> + '_ {
        self.sets.iter().flat_map(|set| {
            set.groups
                .iter()
                .map(move |g| Self::route_prefix(set, g.version))
        })
    }

    pub fn sets(&self) -> &[ControllerSet] {
        &self.sets
    }

    /// Every API version exposed by a registered set
    pub fn versions(&self) -> BTreeSet<ApiVersion> {
        self.sets
            .iter()
            .flat_map(|s| s.groups.iter().map(|g| g.version))
            .collect()
    }

    /// Route prefixes that require an authenticated caller
    pub fn protected_prefixes(&self) -> Vec<String> {
        self.sets
            .iter()
            .filter(|s| s.requires_authentication)
            .flat_map(|set| {
                set.groups
                    .iter()
                    .map(move |g| Self::route_prefix(set, g.version))
            })
            .collect()
    }

    /// Literal, lowercase route segments known to the registry
    pub fn literal_segments(&self) -> HashSet<String> {
        let mut literals = HashSet::new();
        for set in &self.sets {
            literals.insert(set.root.to_string());
            for group in &set.groups {
                for path in (group.openapi)().paths.paths.keys() {
                    literals.extend(
                        path.split('/')
                            .filter(|s| !s.is_empty() && !s.contains('{'))
                            .map(str::to_ascii_lowercase),
                    );
                }
            }
        }
        literals
    }

    /// Router with every endpoint group nested under its prefix
    pub fn routes(&self) -> Router<AppState> {
        self.sets.iter().fold(Router::new(), |router, set| {
            set.groups.iter().fold(router, |router, group| {
                router.nest(&Self::route_prefix(set, group.version), (group.routes)())
            })
        })
    }

    /// OpenAPI fragment of every endpoint group with its version
    pub fn documents(&self) -> Vec<(ApiVersion, OpenApi)> {
        self.sets
            .iter()
            .flat_map(|s| s.groups.iter().map(|g| (g.version, (g.openapi)())))
            .collect()
    }
}
