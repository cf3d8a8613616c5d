//! Fields, methods, properties and events of the assembly model.

use std::fmt;

use bitflags::bitflags;

use crate::metadata::{TypeSig, Visibility};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Field modifiers, the non-access part of `FieldAttributes` (§II.23.1.5)
    pub struct FieldAttributes: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Value is compile time constant
        const LITERAL = 0x0040;
        /// Field does not have to be serialized
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// CLI provides 'special' behavior, depending upon the name of the field
        const RTSPECIAL_NAME = 0x0400;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

impl FieldAttributes {
    /// Extract field modifiers from raw `Field` flags
    #[must_use]
    pub fn from_field_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !0x0007)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Method modifiers, the non-access part of `MethodAttributes` (§II.23.1.10)
    pub struct MethodAttributes: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
    }
}

impl MethodAttributes {
    /// Extract method modifiers from raw `MethodDef` flags
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !0x0007)
    }
}

/// A compile-time constant attached to a field or parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `true` / `false`
    Boolean(bool),
    /// A UTF-16 code unit
    Char(char),
    /// Any signed integer
    Int(i64),
    /// An unsigned integer that does not fit `i64`
    UInt(u64),
    /// `float` value
    Single(f32),
    /// `double` value
    Double(f64),
    /// A string literal
    String(String),
    /// `null`
    Null,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Boolean(value) => write!(f, "{value}"),
            Constant::Char(value) => write!(f, "'{}'", value.escape_default()),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::UInt(value) => write!(f, "{value}"),
            Constant::Single(value) => write!(f, "{value}f"),
            Constant::Double(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{value:.1}")
                } else {
                    write!(f, "{value}")
                }
            }
            Constant::String(value) => write!(f, "\"{}\"", escape_string(value)),
            Constant::Null => write!(f, "null"),
        }
    }
}

/// Escape a string for use inside a C# string literal.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// A field of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// `Field` token
    pub token: u32,
    /// Field name
    pub name: String,
    /// Declared accessibility
    pub visibility: Visibility,
    /// Modifiers
    pub attributes: FieldAttributes,
    /// Declared type
    pub field_type: TypeSig,
    /// Value of a `const` field or enum member
    pub constant: Option<Constant>,
}

impl FieldDefinition {
    /// Create a private instance field.
    pub fn new(token: u32, name: impl Into<String>, field_type: TypeSig) -> Self {
        FieldDefinition {
            token,
            name: name.into(),
            visibility: Visibility::Private,
            attributes: FieldAttributes::empty(),
            field_type,
            constant: None,
        }
    }

    /// Returns true for fields the compiler generated (backing fields and similar).
    pub fn is_compiler_generated(&self) -> bool {
        self.name.contains('<')
    }

    /// Returns true for `static` fields.
    pub fn is_static(&self) -> bool {
        self.attributes.contains(FieldAttributes::STATIC)
    }
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    /// By value
    #[default]
    Value,
    /// `ref`
    Ref,
    /// `out`
    Out,
    /// `in`
    In,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    /// Parameter name, synthesized as `p{index}` when the metadata has none
    pub name: String,
    /// Declared type, without the by-ref wrapper
    pub parameter_type: TypeSig,
    /// Passing mode
    pub direction: ParameterDirection,
    /// Default value for optional parameters
    pub default: Option<Constant>,
}

impl ParameterDefinition {
    /// Create a by-value parameter.
    pub fn new(name: impl Into<String>, parameter_type: TypeSig) -> Self {
        ParameterDefinition {
            name: name.into(),
            parameter_type,
            direction: ParameterDirection::Value,
            default: None,
        }
    }
}

/// An operand of a decoded CIL instruction, with metadata references resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Integer immediate
    Int(i64),
    /// Floating-point immediate
    Float(f64),
    /// `ldstr` literal
    String(String),
    /// Branch target offset
    Branch(u32),
    /// `switch` target offsets
    Switch(Vec<u32>),
    /// Local variable index
    Local(u16),
    /// Argument index (0 is `this` for instance methods)
    Argument(u16),
    /// Type token operand
    Type(TypeSig),
    /// Method token operand
    Method(MethodReference),
    /// Field token operand
    Field(FieldReference),
    /// A token that could not be resolved
    Token(u32),
}

/// A resolved reference to a method used by an instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodReference {
    /// Type declaring the method
    pub declaring_type: TypeSig,
    /// Method name
    pub name: String,
    /// Instance method (takes `this`)
    pub has_this: bool,
    /// Parameter types
    pub parameters: Vec<TypeSig>,
    /// Return type
    pub return_type: TypeSig,
}

/// A resolved reference to a field used by an instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReference {
    /// Type declaring the field
    pub declaring_type: TypeSig,
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub field_type: TypeSig,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, "{value}"),
            Operand::Float(value) => write!(f, "{value}"),
            Operand::String(value) => write!(f, "\"{}\"", escape_string(value)),
            Operand::Branch(target) => write!(f, "IL_{target:04x}"),
            Operand::Switch(targets) => {
                let labels: Vec<String> = targets.iter().map(|t| format!("IL_{t:04x}")).collect();
                write!(f, "({})", labels.join(", "))
            }
            Operand::Local(index) => write!(f, "V_{index}"),
            Operand::Argument(index) => write!(f, "{index}"),
            Operand::Type(sig) => write!(f, "{sig}"),
            Operand::Method(method) => write!(f, "{}::{}", method.declaring_type, method.name),
            Operand::Field(field) => write!(f, "{}::{}", field.declaring_type, field.name),
            Operand::Token(token) => write!(f, "(0x{token:08X})"),
        }
    }
}

/// One decoded CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset from the start of the method's code
    pub offset: u32,
    /// Instruction mnemonic, e.g. `ldarg.0`
    pub opcode: String,
    /// Resolved operand
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction.
    pub fn new(offset: u32, opcode: impl Into<String>, operand: Operand) -> Self {
        Instruction {
            offset,
            opcode: opcode.into(),
            operand,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode)?;
        if self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}

/// The decoded body of a method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodBody {
    /// Maximum evaluation stack depth
    pub max_stack: u16,
    /// Types of the local variables, by index
    pub locals: Vec<TypeSig>,
    /// Instructions in offset order
    pub instructions: Vec<Instruction>,
}

/// A method of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// `MethodDef` token
    pub token: u32,
    /// Method name
    pub name: String,
    /// Declared accessibility
    pub visibility: Visibility,
    /// Modifiers
    pub attributes: MethodAttributes,
    /// Return type
    pub return_type: TypeSig,
    /// Parameters, excluding `this`
    pub parameters: Vec<ParameterDefinition>,
    /// Names of the generic parameters declared by this method
    pub generic_parameters: Vec<String>,
    /// Decoded body, absent for abstract, extern and runtime methods
    pub body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Create a public instance method without a body.
    pub fn new(token: u32, name: impl Into<String>, return_type: TypeSig) -> Self {
        MethodDefinition {
            token,
            name: name.into(),
            visibility: Visibility::Public,
            attributes: MethodAttributes::HIDE_BY_SIG,
            return_type,
            parameters: Vec::new(),
            generic_parameters: Vec::new(),
            body: None,
        }
    }

    /// Returns true for instance and static constructors.
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }

    /// Returns true for `static` methods.
    pub fn is_static(&self) -> bool {
        self.attributes.contains(MethodAttributes::STATIC)
    }

    /// Returns true for `abstract` methods.
    pub fn is_abstract(&self) -> bool {
        self.attributes.contains(MethodAttributes::ABSTRACT)
    }

    /// Returns true for methods the compiler generated (lambdas, local functions and similar).
    pub fn is_compiler_generated(&self) -> bool {
        self.name.contains('<')
    }

    /// The first decoding failure in the return type or any parameter.
    pub fn invalid_signature(&self) -> Option<&str> {
        self.return_type.invalid_reason().or_else(|| {
            self.parameters
                .iter()
                .find_map(|param| param.parameter_type.invalid_reason())
        })
    }
}

/// A property of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    /// `Property` token
    pub token: u32,
    /// Property name
    pub name: String,
    /// Declared type
    pub property_type: TypeSig,
    /// Index parameters, non-empty for indexers
    pub parameters: Vec<ParameterDefinition>,
    /// Token of the getter method
    pub getter: Option<u32>,
    /// Token of the setter method
    pub setter: Option<u32>,
}

/// An event of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    /// `Event` token
    pub token: u32,
    /// Event name
    pub name: String,
    /// Delegate type of the event
    pub event_type: TypeSig,
    /// Token of the `add` accessor
    pub adder: Option<u32>,
    /// Token of the `remove` accessor
    pub remover: Option<u32>,
}
