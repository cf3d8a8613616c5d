//! Decoded type signatures.
//!
//! [`TypeSig`] is the owned, resolved form of an ECMA-335 type signature (§II.23.2.12) as it
//! appears on fields, parameters, return values, locals and instruction operands. Type
//! references are resolved to namespace/name pairs at read time so the model does not need
//! the metadata tables to be displayed.

use std::fmt;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::metadata::AssemblyName;

/// Built-in types that C# spells with a keyword.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PrimitiveType {
    #[strum(to_string = "void")]
    Void,
    #[strum(to_string = "bool")]
    Boolean,
    #[strum(to_string = "char")]
    Char,
    #[strum(to_string = "sbyte")]
    SByte,
    #[strum(to_string = "byte")]
    Byte,
    #[strum(to_string = "short")]
    Int16,
    #[strum(to_string = "ushort")]
    UInt16,
    #[strum(to_string = "int")]
    Int32,
    #[strum(to_string = "uint")]
    UInt32,
    #[strum(to_string = "long")]
    Int64,
    #[strum(to_string = "ulong")]
    UInt64,
    #[strum(to_string = "float")]
    Single,
    #[strum(to_string = "double")]
    Double,
    #[strum(to_string = "nint")]
    IntPtr,
    #[strum(to_string = "nuint")]
    UIntPtr,
    #[strum(to_string = "string")]
    String,
    #[strum(to_string = "object")]
    Object,
    #[strum(to_string = "decimal")]
    Decimal,
    #[strum(to_string = "TypedReference")]
    TypedReference,
}

impl PrimitiveType {
    /// The runtime type name, e.g. `Int32` for `int`.
    pub fn type_name(self) -> &'static str {
        match self {
            PrimitiveType::Void => "Void",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Char => "Char",
            PrimitiveType::SByte => "SByte",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Int16 => "Int16",
            PrimitiveType::UInt16 => "UInt16",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::UInt32 => "UInt32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::UInt64 => "UInt64",
            PrimitiveType::Single => "Single",
            PrimitiveType::Double => "Double",
            PrimitiveType::IntPtr => "IntPtr",
            PrimitiveType::UIntPtr => "UIntPtr",
            PrimitiveType::String => "String",
            PrimitiveType::Object => "Object",
            PrimitiveType::Decimal => "Decimal",
            PrimitiveType::TypedReference => "TypedReference",
        }
    }

    /// Map a `System.*` type name back onto its keyword form.
    pub fn from_system_name(namespace: &str, name: &str) -> Option<Self> {
        if namespace != "System" {
            return None;
        }
        PrimitiveType::iter().find(|primitive| primitive.type_name() == name)
    }
}

/// Where a referenced type is defined.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeScope {
    /// Defined in the module being read
    Module,
    /// Imported from another assembly
    Assembly(AssemblyName),
    /// Imported through a module reference, file or exported type
    Other,
}

/// A reference to a named class, interface, struct, enum or delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    /// Namespace, empty for nested types and the global namespace
    pub namespace: String,
    /// Metadata name, including a generic arity suffix; nested types are joined with `.`
    pub name: String,
    /// Defining scope of the type
    pub scope: TypeScope,
    /// Generic arguments for an instantiated generic type
    pub generic_args: Vec<TypeSig>,
    /// The signature marked this as a value type
    pub is_value_type: bool,
}

impl TypeReference {
    /// A reference to a class defined in the module being read.
    pub fn local(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeReference {
            namespace: namespace.into(),
            name: name.into(),
            scope: TypeScope::Module,
            generic_args: Vec::new(),
            is_value_type: false,
        }
    }

    /// A reference to a class imported from `assembly`.
    pub fn external(
        namespace: impl Into<String>,
        name: impl Into<String>,
        assembly: AssemblyName,
    ) -> Self {
        TypeReference {
            namespace: namespace.into(),
            name: name.into(),
            scope: TypeScope::Assembly(assembly),
            generic_args: Vec::new(),
            is_value_type: false,
        }
    }

    /// Returns the full name (Namespace.Name) of the referenced type
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// The name without its generic arity suffix.
    pub fn simple_name(&self) -> &str {
        strip_arity(&self.name)
    }

    /// Returns true if this references `namespace.name`.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}

/// An owned type signature.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSig {
    /// A built-in type
    Primitive(PrimitiveType),
    /// A named type, possibly a generic instantiation
    Named(TypeReference),
    /// A generic parameter of the enclosing type or method
    GenericParam(String),
    /// An array with the given rank (1 for single-dimension arrays)
    Array {
        /// Element type
        element: Box<TypeSig>,
        /// Number of dimensions
        rank: u32,
    },
    /// An unmanaged pointer
    Pointer(Box<TypeSig>),
    /// A managed reference (`ref`, `out`, `in`)
    ByRef(Box<TypeSig>),
    /// The signature could not be decoded
    Invalid(String),
}

impl TypeSig {
    /// Shorthand for a named type signature.
    pub fn named(reference: TypeReference) -> Self {
        TypeSig::Named(reference)
    }

    /// Shorthand for a single-dimension array.
    pub fn sz_array(element: TypeSig) -> Self {
        TypeSig::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    /// Returns true for `void`.
    pub fn is_void(&self) -> bool {
        matches!(self, TypeSig::Primitive(PrimitiveType::Void))
    }

    /// Returns true for `bool`.
    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeSig::Primitive(PrimitiveType::Boolean))
    }

    /// The first decoding failure nested anywhere in this signature.
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            TypeSig::Invalid(reason) => Some(reason),
            TypeSig::Named(reference) => reference
                .generic_args
                .iter()
                .find_map(TypeSig::invalid_reason),
            TypeSig::Array { element, .. } => element.invalid_reason(),
            TypeSig::Pointer(inner) | TypeSig::ByRef(inner) => inner.invalid_reason(),
            TypeSig::Primitive(_) | TypeSig::GenericParam(_) => None,
        }
    }

    /// Visit every named reference in this signature, outermost first.
    pub fn for_each_reference<'a>(&'a self, visit: &mut dyn FnMut(&'a TypeReference)) {
        match self {
            TypeSig::Named(reference) => {
                visit(reference);
                for arg in &reference.generic_args {
                    arg.for_each_reference(visit);
                }
            }
            TypeSig::Array { element, .. } => element.for_each_reference(visit),
            TypeSig::Pointer(inner) | TypeSig::ByRef(inner) => inner.for_each_reference(visit),
            TypeSig::Primitive(_) | TypeSig::GenericParam(_) | TypeSig::Invalid(_) => {}
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Primitive(primitive) => write!(f, "{primitive}"),
            TypeSig::Named(reference) => {
                write!(f, "{}", reference.full_name())?;
                if !reference.generic_args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in reference.generic_args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeSig::GenericParam(name) => write!(f, "{name}"),
            TypeSig::Array { element, rank } => {
                write!(f, "{element}[")?;
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            TypeSig::Pointer(inner) => write!(f, "{inner}*"),
            TypeSig::ByRef(inner) => write!(f, "{inner}&"),
            TypeSig::Invalid(reason) => write!(f, "<invalid: {reason}>"),
        }
    }
}

/// Strip a generic arity suffix (`` `1 ``) from a metadata name.
pub fn strip_arity(name: &str) -> &str {
    match name.find('`') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_keywords() {
        assert_eq!(PrimitiveType::Int32.to_string(), "int");
        assert_eq!(PrimitiveType::Object.to_string(), "object");
        assert_eq!(
            PrimitiveType::from_system_name("System", "Int64"),
            Some(PrimitiveType::Int64)
        );
        assert_eq!(PrimitiveType::from_system_name("Acme", "Int64"), None);
    }

    #[test]
    fn display_generic_array() {
        let mut list = TypeReference::local("System.Collections.Generic", "List`1");
        list.generic_args
            .push(TypeSig::Primitive(PrimitiveType::String));
        let sig = TypeSig::sz_array(TypeSig::Named(list));
        assert_eq!(sig.to_string(), "System.Collections.Generic.List`1<string>[]");

        let matrix = TypeSig::Array {
            element: Box::new(TypeSig::Primitive(PrimitiveType::Double)),
            rank: 2,
        };
        assert_eq!(matrix.to_string(), "double[,]");
    }

    #[test]
    fn invalid_reason_is_found_in_generic_args() {
        let mut list = TypeReference::local("Acme", "Bag`1");
        list.generic_args
            .push(TypeSig::Invalid("bad token".to_string()));
        let sig = TypeSig::ByRef(Box::new(TypeSig::Named(list)));
        assert_eq!(sig.invalid_reason(), Some("bad token"));
        assert_eq!(TypeSig::Primitive(PrimitiveType::Int32).invalid_reason(), None);
    }

    #[test]
    fn simple_name_strips_arity() {
        let bag = TypeReference::local("Acme", "Bag`1");
        assert_eq!(bag.simple_name(), "Bag");
        assert_eq!(bag.full_name(), "Acme.Bag`1");
        assert_eq!(strip_arity("Widget"), "Widget");
    }
}
