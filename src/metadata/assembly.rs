//! Assemblies, their identities and their main modules.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use log::{debug, trace};

use crate::{
    metadata::{FullTypeName, TypeDefinition},
    reader::AssemblyResolver,
};

/// Four-part assembly version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    /// Major version number
    pub major: u16,
    /// Minor version number
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl Version {
    /// Create a version from its four parts.
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Version {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Identity of an assembly, as written in `Assembly` and `AssemblyRef` rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyName {
    /// Simple name
    pub name: String,
    /// Version
    pub version: Version,
    /// Culture, `None` for culture-neutral assemblies
    pub culture: Option<String>,
    /// Public key token, `None` for unsigned assemblies
    pub public_key_token: Option<Vec<u8>>,
}

impl AssemblyName {
    /// A culture-neutral, unsigned assembly name.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        AssemblyName {
            name: name.into(),
            version,
            culture: None,
            public_key_token: None,
        }
    }
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Version={}, Culture={}, PublicKeyToken=",
            self.name,
            self.version,
            self.culture.as_deref().unwrap_or("neutral")
        )?;
        match &self.public_key_token {
            Some(token) if !token.is_empty() => {
                for byte in token {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            _ => write!(f, "null"),
        }
    }
}

/// A module: the unit that holds type definitions.
pub struct ModuleDefinition {
    /// Module file name, e.g. `Acme.Widgets.dll`
    pub name: String,
    /// Top-level types, each carrying its nested types
    pub types: Vec<TypeDefinition>,
    /// Assemblies referenced by this module
    pub assembly_references: Vec<AssemblyName>,
    resolver: Arc<dyn AssemblyResolver>,
    resolved: DashMap<String, Option<Arc<AssemblyDefinition>>>,
}

impl ModuleDefinition {
    /// Create a module over `types`, resolving references through `resolver`.
    pub fn new(
        name: impl Into<String>,
        mut types: Vec<TypeDefinition>,
        assembly_references: Vec<AssemblyName>,
        resolver: Arc<dyn AssemblyResolver>,
    ) -> Self {
        for ty in &mut types {
            ty.assign_full_names(None);
        }

        ModuleDefinition {
            name: name.into(),
            types,
            assembly_references,
            resolver,
            resolved: DashMap::new(),
        }
    }

    /// Find a type definition by its reflection name.
    pub fn find_type(&self, name: &FullTypeName) -> Option<&TypeDefinition> {
        let (outer, nested) = name.names.split_first()?;
        let mut current = self
            .types
            .iter()
            .find(|ty| ty.namespace == name.namespace && &ty.name == outer)?;

        for inner in nested {
            current = current.nested_types.iter().find(|ty| &ty.name == inner)?;
        }

        Some(current)
    }

    /// All type definitions, depth-first with nested types after their declaring type.
    pub fn all_types(&self) -> Vec<&TypeDefinition> {
        fn walk<'a>(ty: &'a TypeDefinition, out: &mut Vec<&'a TypeDefinition>) {
            out.push(ty);
            for nested in &ty.nested_types {
                walk(nested, out);
            }
        }

        let mut out = Vec::new();
        for ty in &self.types {
            walk(ty, &mut out);
        }
        out
    }

    /// Resolve a referenced assembly, asking the resolver at most once per simple name.
    pub fn resolve(&self, reference: &AssemblyName) -> Option<Arc<AssemblyDefinition>> {
        if let Some(cached) = self.resolved.get(&reference.name) {
            trace!("resolution cache hit for {}", reference.name);
            return cached.clone();
        }

        let resolved = self
            .resolved
            .entry(reference.name.clone())
            .or_insert_with(|| {
                let result = self.resolver.resolve(reference);
                if result.is_none() {
                    debug!("{}: could not resolve {}", self.name, reference);
                }
                result
            });
        resolved.clone()
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("types", &self.types.len())
            .field("assembly_references", &self.assembly_references)
            .finish_non_exhaustive()
    }
}

/// A loaded assembly.
#[derive(Debug)]
pub struct AssemblyDefinition {
    /// Identity of the assembly
    pub name: AssemblyName,
    /// The manifest module
    pub main_module: Arc<ModuleDefinition>,
}

impl AssemblyDefinition {
    /// Create an assembly around its main module.
    pub fn new(name: AssemblyName, main_module: ModuleDefinition) -> Self {
        AssemblyDefinition {
            name,
            main_module: Arc::new(main_module),
        }
    }
}
