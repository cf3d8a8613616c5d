//! Type definitions of the assembly model.

use bitflags::bitflags;
use strum::Display;

use crate::metadata::{
    EventDefinition, FieldDefinition, FullTypeName, MethodDefinition, PropertyDefinition, TypeSig,
};

/// Bitmask for `VISIBILITY` extraction from `TypeAttributes` (§II.23.1.15)
pub const TYPE_VISIBILITY_MASK: u32 = 0x0007;
/// Bitmask for `MEMBER_ACCESS` extraction from method and field attributes
pub const MEMBER_ACCESS_MASK: u32 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Type modifiers, the non-visibility part of `TypeAttributes`
    pub struct TypeAttributes: u32 {
        /// Type is an interface
        const INTERFACE = 0x0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0080;
        /// Type cannot be derived from
        const SEALED = 0x0100;
        /// Name has special meaning
        const SPECIAL_NAME = 0x0400;
        /// Type is imported (COM)
        const IMPORT = 0x1000;
        /// Type can be serialized
        const SERIALIZABLE = 0x2000;
        /// Static constructor may run before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

impl TypeAttributes {
    /// Extract type modifiers from raw `TypeDef` flags
    #[must_use]
    pub fn from_type_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !TYPE_VISIBILITY_MASK)
    }
}

/// Declared accessibility of a type or member, spelled as in C#.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum Visibility {
    #[strum(to_string = "public")]
    Public,
    #[strum(to_string = "protected internal")]
    ProtectedInternal,
    #[strum(to_string = "protected")]
    Protected,
    #[default]
    #[strum(to_string = "internal")]
    Internal,
    #[strum(to_string = "private protected")]
    PrivateProtected,
    #[strum(to_string = "private")]
    Private,
}

impl Visibility {
    /// Decode type visibility from raw `TypeDef` flags.
    pub fn from_type_flags(flags: u32) -> Self {
        match flags & TYPE_VISIBILITY_MASK {
            0x1 | 0x2 => Visibility::Public,
            0x3 => Visibility::Private,
            0x4 => Visibility::Protected,
            0x6 => Visibility::PrivateProtected,
            0x7 => Visibility::ProtectedInternal,
            _ => Visibility::Internal,
        }
    }

    /// Decode member access from raw `MethodDef` or `Field` flags.
    pub fn from_member_flags(flags: u32) -> Self {
        match flags & MEMBER_ACCESS_MASK {
            0x2 => Visibility::PrivateProtected,
            0x3 => Visibility::Internal,
            0x4 => Visibility::Protected,
            0x5 => Visibility::ProtectedInternal,
            0x6 => Visibility::Public,
            _ => Visibility::Private,
        }
    }

    /// Returns true if the member is visible outside its assembly.
    pub fn is_exported(self) -> bool {
        matches!(
            self,
            Visibility::Public | Visibility::Protected | Visibility::ProtectedInternal
        )
    }
}

/// The C# category of a type definition.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
}

impl TypeKind {
    /// Classify a type from its interface flag and base type.
    pub fn classify(attributes: TypeAttributes, base_type: Option<&TypeSig>) -> Self {
        if attributes.contains(TypeAttributes::INTERFACE) {
            return TypeKind::Interface;
        }

        match base_type {
            Some(TypeSig::Named(base)) if base.is("System", "Enum") => TypeKind::Enum,
            Some(TypeSig::Named(base)) if base.is("System", "ValueType") => TypeKind::Struct,
            Some(TypeSig::Named(base)) if base.is("System", "MulticastDelegate") => {
                TypeKind::Delegate
            }
            _ => TypeKind::Class,
        }
    }
}

/// A type defined in the module, with its members and nested types.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    /// `TypeDef` token
    pub token: u32,
    /// Namespace, empty for nested types and the global namespace
    pub namespace: String,
    /// Metadata name, including a generic arity suffix
    pub name: String,
    /// C# category
    pub kind: TypeKind,
    /// Declared accessibility
    pub visibility: Visibility,
    /// Modifiers
    pub attributes: TypeAttributes,
    /// `extends` clause
    pub base_type: Option<TypeSig>,
    /// Implemented interfaces
    pub interfaces: Vec<TypeSig>,
    /// Names of the generic parameters declared by this type
    pub generic_parameters: Vec<String>,
    /// Fields, in metadata order
    pub fields: Vec<FieldDefinition>,
    /// Methods, in metadata order, including accessors and constructors
    pub methods: Vec<MethodDefinition>,
    /// Properties
    pub properties: Vec<PropertyDefinition>,
    /// Events
    pub events: Vec<EventDefinition>,
    /// Types declared inside this type
    pub nested_types: Vec<TypeDefinition>,
    /// Reflection name, set when the type is placed into a module
    pub full_name: FullTypeName,
}

impl TypeDefinition {
    /// Create an empty top-level class.
    pub fn new(token: u32, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        TypeDefinition {
            token,
            full_name: FullTypeName::new(namespace.clone(), name.clone()),
            namespace,
            name,
            kind: TypeKind::Class,
            visibility: Visibility::Internal,
            attributes: TypeAttributes::empty(),
            base_type: None,
            interfaces: Vec::new(),
            generic_parameters: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            nested_types: Vec::new(),
        }
    }

    /// Reflection-style full name of this type.
    pub fn full_type_name(&self) -> &FullTypeName {
        &self.full_name
    }

    /// Fix up the full names of this type and all nested types below `parent`.
    pub(crate) fn assign_full_names(&mut self, parent: Option<&FullTypeName>) {
        self.full_name = match parent {
            Some(parent) => parent.nested(self.name.clone()),
            None => FullTypeName::new(self.namespace.clone(), self.name.clone()),
        };
        let own = self.full_name.clone();
        for nested in &mut self.nested_types {
            nested.assign_full_names(Some(&own));
        }
    }

    /// Returns true for `abstract sealed` classes, which C# spells `static`.
    pub fn is_static_class(&self) -> bool {
        self.kind == TypeKind::Class
            && self
                .attributes
                .contains(TypeAttributes::ABSTRACT | TypeAttributes::SEALED)
    }

    /// Find a method by token.
    pub fn method(&self, token: u32) -> Option<&MethodDefinition> {
        self.methods.iter().find(|method| method.token == token)
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns true if `method` implements a property or event accessor of this type.
    pub fn is_accessor(&self, method: &MethodDefinition) -> bool {
        let token = Some(method.token);
        self.properties
            .iter()
            .any(|property| property.getter == token || property.setter == token)
            || self
                .events
                .iter()
                .any(|event| event.adder == token || event.remover == token)
    }
}
