//! Locating referenced assemblies.
//!
//! Resolution is pull-based: a [`crate::metadata::ModuleDefinition`] asks its resolver for a
//! referenced assembly the first time the decompiler needs it, and caches the answer.

use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, warn};

use crate::metadata::{AssemblyDefinition, AssemblyName};

/// Locates assemblies referenced by a module.
pub trait AssemblyResolver: Send + Sync {
    /// Return the assembly matching `name`, or `None` if it is not available.
    fn resolve(&self, name: &AssemblyName) -> Option<Arc<AssemblyDefinition>>;
}

/// A resolver that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl AssemblyResolver for NullResolver {
    fn resolve(&self, _name: &AssemblyName) -> Option<Arc<AssemblyDefinition>> {
        None
    }
}

/// Resolves against a set of already loaded assemblies, keyed by simple name.
///
/// Typically filled with the other assemblies of the same package, or of its dependencies.
/// A request for a different version than the registered one still resolves, since a
/// best-effort view beats no view, but the mismatch is logged.
#[derive(Debug, Default)]
pub struct AssemblyCache {
    assemblies: DashMap<String, Arc<AssemblyDefinition>>,
}

impl AssemblyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        AssemblyCache::default()
    }

    /// Register an assembly, replacing any earlier one with the same simple name.
    pub fn insert(&self, assembly: Arc<AssemblyDefinition>) {
        debug!("registering {}", assembly.name);
        self.assemblies.insert(assembly.name.name.clone(), assembly);
    }

    /// Number of registered assemblies.
    pub fn len(&self) -> usize {
        self.assemblies.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.assemblies.is_empty()
    }
}

impl AssemblyResolver for AssemblyCache {
    fn resolve(&self, name: &AssemblyName) -> Option<Arc<AssemblyDefinition>> {
        let entry = self.assemblies.get(&name.name)?;
        let found = entry.value();
        if found.name.version != name.version {
            warn!(
                "{} requested, resolving to version {}",
                name, found.name.version
            );
        }
        Some(found.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ModuleDefinition, Version};

    fn assembly(name: &str, version: Version) -> Arc<AssemblyDefinition> {
        let module = ModuleDefinition::new(
            format!("{name}.dll"),
            Vec::new(),
            Vec::new(),
            Arc::new(NullResolver),
        );
        Arc::new(AssemblyDefinition::new(AssemblyName::new(name, version), module))
    }

    #[test]
    fn null_resolver_finds_nothing() {
        let name = AssemblyName::new("System.Runtime", Version::new(8, 0, 0, 0));
        assert!(NullResolver.resolve(&name).is_none());
    }

    #[test]
    fn cache_resolves_by_simple_name() {
        let cache = AssemblyCache::new();
        assert!(cache.is_empty());

        let registered = assembly("Acme.Core", Version::new(2, 0, 0, 0));
        cache.insert(registered.clone());
        assert_eq!(cache.len(), 1);

        let exact = AssemblyName::new("Acme.Core", Version::new(2, 0, 0, 0));
        let older = AssemblyName::new("Acme.Core", Version::new(1, 0, 0, 0));
        let other = AssemblyName::new("Acme.Other", Version::new(2, 0, 0, 0));

        assert!(Arc::ptr_eq(&cache.resolve(&exact).unwrap(), &registered));
        assert!(Arc::ptr_eq(&cache.resolve(&older).unwrap(), &registered));
        assert!(cache.resolve(&other).is_none());
    }
}
