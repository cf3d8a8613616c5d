//! Owned, immutable model of a loaded .NET assembly.
//!
//! The reader converts the metadata tables of an assembly image into this model once; after
//! that the model is shared read-only (behind `Arc`) between the package adapter and any
//! number of concurrent decompilations. Nothing in here refers back to the image bytes.
//!
//! # Key Components
//!
//! - [`AssemblyDefinition`] / [`ModuleDefinition`] - the assembly and its main module
//! - [`TypeDefinition`] - a type with its members and nested types
//! - [`TypeSig`] - decoded type signatures
//! - [`FullTypeName`] - reflection names used to address types
//! - [`XmlDocumentation`] - summaries from the compiler-generated documentation file

mod assembly;
mod docs;
mod members;
mod name;
mod signature;
mod types;

pub use assembly::{AssemblyDefinition, AssemblyName, ModuleDefinition, Version};
pub use docs::{method_id, type_id, XmlDocumentation};
pub use members::{
    escape_string, Constant, EventDefinition, FieldAttributes, FieldDefinition, FieldReference,
    Instruction, MethodAttributes, MethodBody, MethodDefinition, MethodReference, Operand,
    ParameterDefinition, ParameterDirection, PropertyDefinition,
};
pub use name::FullTypeName;
pub use signature::{strip_arity, PrimitiveType, TypeReference, TypeScope, TypeSig};
pub use types::{TypeAttributes, TypeDefinition, TypeKind, Visibility};
