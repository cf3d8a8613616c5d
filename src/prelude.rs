//! # nuscope Prelude
//!
//! The most commonly used types of the library. Import this module to get quick access to
//! package browsing and decompilation.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all nuscope operations
pub use crate::Error;

/// The result type used throughout nuscope
pub use crate::Result;

// ================================================================================================
// Packages
// ================================================================================================

/// Opened `.nupkg` archives and their files
pub use crate::package::{ArchiveEntry, PackageArchive, PackageFile};

/// Lazily loaded assembly of a package
pub use crate::package::{PackageAssembly, NO_DECOMPILER};

// ================================================================================================
// Reading and Resolution
// ================================================================================================

/// Parsing assembly images
pub use crate::reader::{AssemblyReader, CilReader, ReaderParameters, ValidationLevel};

/// Resolving referenced assemblies
pub use crate::reader::{AssemblyCache, AssemblyResolver, NullResolver};

// ================================================================================================
// Metadata Model
// ================================================================================================

/// Assemblies and modules
pub use crate::metadata::{AssemblyDefinition, AssemblyName, ModuleDefinition, Version};

/// Types and their members
pub use crate::metadata::{
    EventDefinition, FieldDefinition, FullTypeName, MethodDefinition, PropertyDefinition,
    TypeDefinition, TypeKind, TypeSig,
};

/// Compiler-generated documentation files
pub use crate::metadata::XmlDocumentation;

// ================================================================================================
// Decompilation
// ================================================================================================

/// Rendering types as source text
pub use crate::decompiler::{CodeView, Decompiler, DecompilerSettings, FormattingOptions};
