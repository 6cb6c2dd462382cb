//! Dependency ordering for host modules

use super::{HostModule, ModuleError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Resolves registered modules into initialization order
pub struct ModuleGraph;

impl ModuleGraph {
    /// Order modules dependency-first, keeping registration order between
    /// modules that do not depend on each other.
    pub fn resolve(
        modules: Vec<Arc<dyn HostModule>>,
    ) -> Result<Vec<Arc<dyn HostModule>>, ModuleError> {
        let mut by_name: HashMap<&'static str, Arc<dyn HostModule>> = HashMap::new();
        for module in &modules {
            if by_name.insert(module.name(), module.clone()).is_some() {
                return Err(ModuleError::DuplicateModule(module.name().to_string()));
            }
        }

        let mut resolver = Resolver {
            by_name: &by_name,
            visited: HashSet::new(),
            stack: Vec::new(),
            ordered: Vec::with_capacity(modules.len()),
        };
        for module in &modules {
            resolver.visit(module.name())?;
        }

        debug!(
            order = ?resolver.ordered.iter().map(|m| m.name()).collect::<Vec<_>>(),
            "Resolved module graph"
        );
        Ok(resolver.ordered)
    }
}

struct Resolver<'a> {
    by_name: &'a HashMap<&'static str, Arc<dyn HostModule>>,
    visited: HashSet<&'static str>,
    stack: Vec<&'static str>,
    ordered: Vec<Arc<dyn HostModule>>,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &'static str) -> Result<(), ModuleError> {
        if self.visited.contains(name) {
            return Ok(());
        }

        if let Some(pos) = self.stack.iter().position(|n| *n == name) {
            let mut path: Vec<String> = self.stack[pos..].iter().map(|n| n.to_string()).collect();
            path.push(name.to_string());
            return Err(ModuleError::CircularDependency { path });
        }

        let Some(module) = self.by_name.get(name).cloned() else {
            return Ok(());
        };

        self.stack.push(name);
        for dependency in module.depends_on() {
            if !self.by_name.contains_key(dependency) {
                return Err(ModuleError::MissingDependency {
                    module: name.to_string(),
                    dependency: dependency.to_string(),
                });
            }
            self.visit(dependency)?;
        }
        self.stack.pop();

        self.visited.insert(name);
        self.ordered.push(module);
        Ok(())
    }
}
