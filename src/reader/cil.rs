//! `dotscope`-backed [`AssemblyReader`].
//!
//! Loads the image with [`CilObject::from_mem_with_validation`] and walks the resolved type
//! registry once, copying everything the decompiler needs into the owned model. Tokens in
//! signatures and instruction operands are resolved here; a token that does not resolve
//! becomes [`TypeSig::Invalid`] instead of failing the whole read.

use std::{collections::HashMap, sync::Arc};

use dotscope::{
    assembly::{Immediate, Instruction as CilInstruction, Operand as CilOperand},
    metadata::{
        method::Method,
        signatures::{SignatureMethod, TypeSignature},
        tables::MemberRefSignature,
        token::Token,
        typesystem::{CilPrimitive, CilPrimitiveData, CilType, CilTypeRc, CilTypeReference},
    },
    CilObject,
};
use log::{debug, trace, warn};

use crate::{
    metadata::{
        AssemblyDefinition, AssemblyName, Constant, EventDefinition, FieldAttributes,
        FieldDefinition, FieldReference, Instruction, MethodAttributes, MethodBody,
        MethodDefinition, MethodReference, ModuleDefinition, Operand, ParameterDefinition,
        ParameterDirection, PrimitiveType, PropertyDefinition, TypeAttributes, TypeDefinition,
        TypeKind, TypeReference, TypeScope, TypeSig, Version, Visibility,
    },
    reader::{AssemblyReader, ReaderParameters},
    Error, Result,
};

const TABLE_TYPEREF: u8 = 0x01;
const TABLE_TYPEDEF: u8 = 0x02;
const TABLE_FIELD: u8 = 0x04;
const TABLE_METHODDEF: u8 = 0x06;
const TABLE_MEMBERREF: u8 = 0x0A;
const TABLE_TYPESPEC: u8 = 0x1B;
const TABLE_USERSTRING: u8 = 0x70;

const PARAM_IN: u32 = 0x0001;
const PARAM_OUT: u32 = 0x0002;
const PARAM_HAS_DEFAULT: u32 = 0x1000;

/// SHA-1, the hash algorithm public key tokens are derived with
const HASH_SHA1: u32 = 0x8004;

/// Reads assemblies with `dotscope`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CilReader;

impl AssemblyReader for CilReader {
    fn read(&self, data: Vec<u8>, parameters: &ReaderParameters) -> Result<AssemblyDefinition> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        debug!(
            "reading {} byte image with {} validation",
            data.len(),
            parameters.validation
        );
        let object = CilObject::from_mem_with_validation(data, parameters.validation.config())?;
        Converter::new(&object).assembly(parameters.resolver.clone())
    }
}

/// Generic parameter names in scope while converting a signature.
#[derive(Default)]
struct GenericContext<'a> {
    type_params: &'a [String],
    method_params: &'a [String],
}

struct Converter<'a> {
    object: &'a CilObject,
    /// Nested `TypeDef` token to its enclosing `TypeDef` token
    parents: HashMap<u32, u32>,
    /// `MethodDef` and `Field` token to the signature of the declaring type
    declaring: HashMap<u32, TypeSig>,
    /// `Field` token to the resolved field
    fields: HashMap<u32, FieldReference>,
}

impl<'a> Converter<'a> {
    fn new(object: &'a CilObject) -> Self {
        let mut converter = Converter {
            object,
            parents: HashMap::new(),
            declaring: HashMap::new(),
            fields: HashMap::new(),
        };

        let definitions = converter.definitions();
        for cil_type in &definitions {
            for (_, nested) in cil_type.nested_types.iter() {
                if let Some(nested) = nested.upgrade() {
                    converter
                        .parents
                        .insert(nested.token.value(), cil_type.token.value());
                }
            }
        }

        for cil_type in &definitions {
            let owner = TypeSig::Named(converter.reference(cil_type, false));
            let context = GenericContext::default();
            for (_, method) in cil_type.methods.iter() {
                if let Some(method) = method.upgrade() {
                    converter.declaring.insert(method.token.value(), owner.clone());
                }
            }
            for (_, field) in cil_type.fields.iter() {
                converter.declaring.insert(field.token.value(), owner.clone());
                let reference = FieldReference {
                    declaring_type: owner.clone(),
                    name: field.name.clone(),
                    field_type: converter.signature(&field.signature.base, &context),
                };
                converter.fields.insert(field.token.value(), reference);
            }
        }

        converter
    }

    /// All `TypeDef` rows, in token order.
    fn definitions(&self) -> Vec<CilTypeRc> {
        let mut definitions: Vec<CilTypeRc> = self
            .object
            .types()
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|cil_type| cil_type.token.table() == TABLE_TYPEDEF)
            .collect();
        definitions.sort_by_key(|cil_type| cil_type.token.value());
        definitions
    }

    fn assembly(&self, resolver: Arc<dyn crate::reader::AssemblyResolver>) -> Result<AssemblyDefinition> {
        let Some(assembly) = self.object.assembly() else {
            return Err(malformed_error!("Image has no Assembly row, netmodules are not supported"));
        };

        let name = AssemblyName {
            name: assembly.name.clone(),
            version: version(
                assembly.major_version,
                assembly.minor_version,
                assembly.build_number,
                assembly.revision_number,
            ),
            culture: assembly.culture.clone().filter(|c| !c.is_empty()),
            public_key_token: None,
        };

        let module_name = self
            .object
            .module()
            .map_or_else(|| format!("{}.dll", name.name), |module| module.name.clone());

        let references: Vec<AssemblyName> = self
            .object
            .refs_assembly()
            .iter()
            .map(|entry| {
                let aref = entry.value();
                AssemblyName {
                    name: aref.name.clone(),
                    version: version(
                        aref.major_version,
                        aref.minor_version,
                        aref.build_number,
                        aref.revision_number,
                    ),
                    culture: aref.culture.clone().filter(|c| !c.is_empty()),
                    public_key_token: aref
                        .identifier
                        .as_ref()
                        .and_then(|identity| identity.to_token(HASH_SHA1).ok())
                        .map(|token| token.to_le_bytes().to_vec()),
                }
            })
            .collect();

        let mut types = Vec::new();
        for cil_type in self.definitions() {
            if self.parents.contains_key(&cil_type.token.value()) {
                continue;
            }
            types.push(self.type_definition(&cil_type)?);
        }

        debug!(
            "{}: {} top-level types, {} assembly references",
            name,
            types.len(),
            references.len()
        );

        let module = ModuleDefinition::new(module_name, types, references, resolver);
        Ok(AssemblyDefinition::new(name, module))
    }

    fn type_definition(&self, cil_type: &CilType) -> Result<TypeDefinition> {
        let namespace = if self.parents.contains_key(&cil_type.token.value()) {
            String::new()
        } else {
            cil_type.namespace.clone()
        };

        let mut definition =
            TypeDefinition::new(cil_type.token.value(), namespace, cil_type.name.clone());
        trace!("converting type {}", cil_type.fullname());

        let mut generic: Vec<(u32, String)> = cil_type
            .generic_params
            .iter()
            .map(|(_, param)| (param.number, param.name.clone()))
            .collect();
        generic.sort_by_key(|(number, _)| *number);
        definition.generic_parameters = generic.into_iter().map(|(_, name)| name).collect();

        definition.attributes = TypeAttributes::from_type_flags(cil_type.flags);
        definition.visibility = Visibility::from_type_flags(cil_type.flags);
        definition.base_type = cil_type.base().map(|base| self.type_sig(&base));
        definition.kind = TypeKind::classify(definition.attributes, definition.base_type.as_ref());
        definition.interfaces = cil_type
            .interfaces
            .iter()
            .filter_map(|(_, interface)| interface.upgrade())
            .map(|interface| self.type_sig(&interface))
            .collect();

        let context = GenericContext {
            type_params: &definition.generic_parameters,
            method_params: &[],
        };

        definition.fields = cil_type
            .fields
            .iter()
            .map(|(_, field)| FieldDefinition {
                token: field.token.value(),
                name: field.name.clone(),
                visibility: Visibility::from_member_flags(field.flags),
                attributes: FieldAttributes::from_field_flags(field.flags),
                field_type: self.signature(&field.signature.base, &context),
                constant: field.default.get().map(constant),
            })
            .collect();

        for (_, method) in cil_type.methods.iter() {
            let Some(method) = method.upgrade() else {
                warn!("{}: dangling method reference", cil_type.fullname());
                continue;
            };
            definition
                .methods
                .push(self.method(&method, &definition.generic_parameters));
        }

        for (_, property) in cil_type.properties.iter() {
            let getter = property
                .fn_getter
                .get()
                .and_then(|method| method.upgrade())
                .map(|method| method.token.value());
            let setter = property
                .fn_setter
                .get()
                .and_then(|method| method.upgrade())
                .map(|method| method.token.value());

            let accessor = getter
                .or(setter)
                .and_then(|token| definition.method(token))
                .map(|method| method.parameters.clone())
                .unwrap_or_default();
            let parameters = property
                .signature
                .params
                .iter()
                .enumerate()
                .map(|(i, param)| {
                    let name = accessor
                        .get(i)
                        .map_or_else(|| format!("index{i}"), |p| p.name.clone());
                    ParameterDefinition::new(name, self.signature(&param.base, &context))
                })
                .collect();

            definition.properties.push(PropertyDefinition {
                token: property.token.value(),
                name: property.name.clone(),
                property_type: self.signature(&property.signature.base, &context),
                parameters,
                getter,
                setter,
            });
        }

        for (_, event) in cil_type.events.iter() {
            definition.events.push(EventDefinition {
                token: event.token.value(),
                name: event.name.clone(),
                event_type: event.event_type.upgrade().map_or_else(
                    || TypeSig::Invalid(format!("event '{}' has no type", event.name)),
                    |ty| self.type_sig(&ty),
                ),
                adder: event
                    .fn_on_add
                    .get()
                    .and_then(|method| method.upgrade())
                    .map(|method| method.token.value()),
                remover: event
                    .fn_on_remove
                    .get()
                    .and_then(|method| method.upgrade())
                    .map(|method| method.token.value()),
            });
        }

        for (_, nested) in cil_type.nested_types.iter() {
            if let Some(nested) = nested.upgrade() {
                definition.nested_types.push(self.type_definition(&nested)?);
            }
        }

        Ok(definition)
    }

    fn method(&self, method: &Method, type_params: &[String]) -> MethodDefinition {
        let mut generic: Vec<(u32, String)> = method
            .generic_params
            .iter()
            .map(|(_, param)| (param.number, param.name.clone()))
            .collect();
        generic.sort_by_key(|(number, _)| *number);
        let method_params: Vec<String> = generic.into_iter().map(|(_, name)| name).collect();

        let context = GenericContext {
            type_params,
            method_params: &method_params,
        };

        let mut definition = MethodDefinition::new(
            method.token.value(),
            method.name.clone(),
            self.signature(&method.signature.return_type.base, &context),
        );
        definition.visibility = Visibility::from_member_flags(method.flags_access.bits());
        definition.attributes = MethodAttributes::from_method_flags(
            method.flags_modifiers.bits() | method.flags_vtable.bits(),
        );

        for (i, param) in method.signature.params.iter().enumerate() {
            let sequence = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let row = method
                .params
                .iter()
                .map(|(_, row)| row)
                .find(|row| row.sequence == sequence);

            let flags = row.map_or(0, |row| row.flags);
            let direction = if !param.by_ref {
                ParameterDirection::Value
            } else if flags & PARAM_OUT != 0 {
                ParameterDirection::Out
            } else if flags & PARAM_IN != 0 {
                ParameterDirection::In
            } else {
                ParameterDirection::Ref
            };

            definition.parameters.push(ParameterDefinition {
                name: row
                    .and_then(|row| row.name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("p{i}")),
                parameter_type: self.signature(&param.base, &context),
                direction,
                default: row
                    .filter(|row| row.flags & PARAM_HAS_DEFAULT != 0)
                    .and_then(|row| row.default.get())
                    .map(constant),
            });
        }

        definition.generic_parameters = method_params.clone();
        definition.body = self.body(method, &context);
        definition
    }

    fn body(&self, method: &Method, context: &GenericContext<'_>) -> Option<MethodBody> {
        let body = method.body.get()?;
        let code_start = u64::from(method.rva.unwrap_or(0)) + body.size_header as u64;

        let locals = method
            .local_vars
            .iter()
            .map(|(_, local)| {
                let sig = local.base.upgrade().map_or_else(
                    || TypeSig::Invalid("unresolved local type".to_string()),
                    |ty| self.type_sig(&ty),
                );
                if local.is_byref {
                    TypeSig::ByRef(Box::new(sig))
                } else {
                    sig
                }
            })
            .collect();

        let instructions = method
            .instructions()
            .map(|instruction| self.instruction(instruction, code_start, context))
            .collect();

        Some(MethodBody {
            max_stack: u16::try_from(body.max_stack).unwrap_or(u16::MAX),
            locals,
            instructions,
        })
    }

    fn instruction(
        &self,
        instruction: &CilInstruction,
        code_start: u64,
        context: &GenericContext<'_>,
    ) -> Instruction {
        let relative = |rva: u64| u32::try_from(rva.saturating_sub(code_start)).unwrap_or(u32::MAX);

        let operand = match &instruction.operand {
            CilOperand::None => Operand::None,
            CilOperand::Immediate(immediate) => immediate_operand(immediate),
            CilOperand::Target(target) => Operand::Branch(
                instruction
                    .branch_targets
                    .first()
                    .map_or_else(|| relative(*target), |&rva| relative(rva)),
            ),
            CilOperand::Switch(_) => Operand::Switch(
                instruction
                    .branch_targets
                    .iter()
                    .map(|&rva| relative(rva))
                    .collect(),
            ),
            CilOperand::Local(index) => Operand::Local(*index),
            CilOperand::Argument(index) => Operand::Argument(*index),
            CilOperand::Token(token) => self.token_operand(*token, context),
        };

        Instruction::new(
            relative(instruction.rva),
            instruction.mnemonic.to_string(),
            operand,
        )
    }

    fn token_operand(&self, token: Token, context: &GenericContext<'_>) -> Operand {
        match token.table() {
            TABLE_USERSTRING => self
                .object
                .userstrings()
                .and_then(|us| us.get(token.row() as usize).ok())
                .map_or(Operand::Token(token.value()), |s| {
                    Operand::String(s.to_string_lossy())
                }),
            TABLE_METHODDEF => self
                .object
                .methods()
                .get(&token)
                .map_or(Operand::Token(token.value()), |entry| {
                    let method = entry.value();
                    let declaring_type = self
                        .declaring
                        .get(&token.value())
                        .cloned()
                        .unwrap_or_else(|| TypeSig::Invalid("method without owner".to_string()));
                    Operand::Method(self.method_reference(
                        declaring_type,
                        method.name.clone(),
                        &method.signature,
                        context,
                    ))
                }),
            TABLE_MEMBERREF => self
                .object
                .refs_members()
                .get(&token)
                .map_or(Operand::Token(token.value()), |entry| {
                    let member = entry.value();
                    let declaring_type = self.declared_by(&member.declaredby);
                    match &member.signature {
                        MemberRefSignature::Method(signature) => Operand::Method(
                            self.method_reference(
                                declaring_type,
                                member.name.clone(),
                                signature,
                                context,
                            ),
                        ),
                        MemberRefSignature::Field(signature) => Operand::Field(FieldReference {
                            declaring_type,
                            name: member.name.clone(),
                            field_type: self.signature(&signature.base, context),
                        }),
                    }
                }),
            TABLE_FIELD => self
                .fields
                .get(&token.value())
                .cloned()
                .map_or(Operand::Token(token.value()), Operand::Field),
            TABLE_TYPEREF | TABLE_TYPEDEF | TABLE_TYPESPEC => self
                .object
                .types()
                .get(&token)
                .map_or(Operand::Token(token.value()), |ty| {
                    Operand::Type(self.type_sig(&ty))
                }),
            _ => Operand::Token(token.value()),
        }
    }

    fn method_reference(
        &self,
        declaring_type: TypeSig,
        name: String,
        signature: &SignatureMethod,
        context: &GenericContext<'_>,
    ) -> MethodReference {
        MethodReference {
            declaring_type,
            name,
            has_this: signature.has_this,
            parameters: signature
                .params
                .iter()
                .map(|param| {
                    let sig = self.signature(&param.base, context);
                    if param.by_ref {
                        TypeSig::ByRef(Box::new(sig))
                    } else {
                        sig
                    }
                })
                .collect(),
            return_type: self.signature(&signature.return_type.base, context),
        }
    }

    fn declared_by(&self, declared_by: &CilTypeReference) -> TypeSig {
        match declared_by {
            CilTypeReference::TypeRef(reference)
            | CilTypeReference::TypeDef(reference)
            | CilTypeReference::TypeSpec(reference) => reference.upgrade().map_or_else(
                || TypeSig::Invalid("dangling member parent".to_string()),
                |ty| self.type_sig(&ty),
            ),
            _ => TypeSig::Invalid("unsupported member parent".to_string()),
        }
    }

    /// Convert a signature blob type.
    fn signature(&self, sig: &TypeSignature, context: &GenericContext<'_>) -> TypeSig {
        match sig {
            TypeSignature::Void => TypeSig::Primitive(PrimitiveType::Void),
            TypeSignature::Boolean => TypeSig::Primitive(PrimitiveType::Boolean),
            TypeSignature::Char => TypeSig::Primitive(PrimitiveType::Char),
            TypeSignature::I1 => TypeSig::Primitive(PrimitiveType::SByte),
            TypeSignature::U1 => TypeSig::Primitive(PrimitiveType::Byte),
            TypeSignature::I2 => TypeSig::Primitive(PrimitiveType::Int16),
            TypeSignature::U2 => TypeSig::Primitive(PrimitiveType::UInt16),
            TypeSignature::I4 => TypeSig::Primitive(PrimitiveType::Int32),
            TypeSignature::U4 => TypeSig::Primitive(PrimitiveType::UInt32),
            TypeSignature::I8 => TypeSig::Primitive(PrimitiveType::Int64),
            TypeSignature::U8 => TypeSig::Primitive(PrimitiveType::UInt64),
            TypeSignature::R4 => TypeSig::Primitive(PrimitiveType::Single),
            TypeSignature::R8 => TypeSig::Primitive(PrimitiveType::Double),
            TypeSignature::I => TypeSig::Primitive(PrimitiveType::IntPtr),
            TypeSignature::U => TypeSig::Primitive(PrimitiveType::UIntPtr),
            TypeSignature::String => TypeSig::Primitive(PrimitiveType::String),
            TypeSignature::Object => TypeSig::Primitive(PrimitiveType::Object),
            TypeSignature::TypedByRef => TypeSig::Primitive(PrimitiveType::TypedReference),
            TypeSignature::Class(token) => self.token_type(*token, false),
            TypeSignature::ValueType(token) => self.token_type(*token, true),
            TypeSignature::GenericParamType(index) => {
                generic_name(context.type_params, *index, "T")
            }
            TypeSignature::GenericParamMethod(index) => {
                generic_name(context.method_params, *index, "M")
            }
            TypeSignature::GenericInst(base, args) => match self.signature(base, context) {
                TypeSig::Named(mut reference) => {
                    reference.generic_args = args
                        .iter()
                        .map(|arg| self.signature(arg, context))
                        .collect();
                    TypeSig::Named(reference)
                }
                TypeSig::Invalid(reason) => TypeSig::Invalid(reason),
                other => TypeSig::Invalid(format!("generic instantiation of '{other}'")),
            },
            TypeSignature::SzArray(array) => TypeSig::sz_array(self.signature(&array.base, context)),
            TypeSignature::Array(array) => TypeSig::Array {
                element: Box::new(self.signature(&array.base, context)),
                rank: array.rank.max(1),
            },
            TypeSignature::Ptr(pointer) => {
                TypeSig::Pointer(Box::new(self.signature(&pointer.base, context)))
            }
            TypeSignature::ByRef(inner) => TypeSig::ByRef(Box::new(self.signature(inner, context))),
            TypeSignature::Pinned(inner) => self.signature(inner, context),
            TypeSignature::FnPtr(_) => {
                TypeSig::Pointer(Box::new(TypeSig::Primitive(PrimitiveType::Void)))
            }
            TypeSignature::Unknown => TypeSig::Invalid("unknown element type".to_string()),
            other => TypeSig::Invalid(format!("unsupported element type {other:?}")),
        }
    }

    fn token_type(&self, token: Token, is_value_type: bool) -> TypeSig {
        match self.object.types().get(&token) {
            Some(ty) => match self.type_sig(&ty) {
                TypeSig::Named(mut reference) => {
                    reference.is_value_type |= is_value_type;
                    TypeSig::Named(reference)
                }
                other => other,
            },
            None => TypeSig::Invalid(format!("unresolved type token 0x{:08X}", token.value())),
        }
    }

    /// Convert a resolved registry type, as found in base types, locals and operands.
    fn type_sig(&self, ty: &CilType) -> TypeSig {
        let name = ty.name.as_str();
        if let Some(element) = name.strip_suffix("[]") {
            return TypeSig::sz_array(self.named_like(ty, element));
        }
        if let Some(inner) = name.strip_suffix('*') {
            return TypeSig::Pointer(Box::new(self.named_like(ty, inner)));
        }
        if let Some(inner) = name.strip_suffix('&') {
            return TypeSig::ByRef(Box::new(self.named_like(ty, inner)));
        }

        TypeSig::Named(self.reference(ty, false))
    }

    fn named_like(&self, ty: &CilType, name: &str) -> TypeSig {
        match PrimitiveType::from_system_name(&ty.namespace, name) {
            Some(primitive) => TypeSig::Primitive(primitive),
            None => {
                let mut reference = self.reference(ty, false);
                reference.name = name.to_string();
                TypeSig::Named(reference)
            }
        }
    }

    fn reference(&self, ty: &CilType, is_value_type: bool) -> TypeReference {
        let token = ty.token.value();

        if ty.token.table() == TABLE_TYPEDEF {
            if let Some(parent) = self
                .parents
                .get(&token)
                .and_then(|parent| self.object.types().get(&Token::new(*parent)))
            {
                let mut reference = self.reference(&parent, false);
                reference.name = format!("{}.{}", reference.name, ty.name);
                reference.is_value_type = is_value_type;
                return reference;
            }

            let mut reference = TypeReference::local(ty.namespace.clone(), ty.name.clone());
            reference.is_value_type = is_value_type;
            return reference;
        }

        let mut reference = TypeReference {
            namespace: ty.namespace.clone(),
            name: ty.name.clone(),
            scope: TypeScope::Other,
            generic_args: Vec::new(),
            is_value_type,
        };

        match ty.get_external() {
            Some(CilTypeReference::AssemblyRef(aref)) => {
                reference.scope = TypeScope::Assembly(AssemblyName {
                    name: aref.name.clone(),
                    version: version(
                        aref.major_version,
                        aref.minor_version,
                        aref.build_number,
                        aref.revision_number,
                    ),
                    culture: aref.culture.clone().filter(|c| !c.is_empty()),
                    public_key_token: None,
                });
            }
            Some(CilTypeReference::TypeRef(parent)) => {
                if let Some(parent) = parent.upgrade() {
                    let outer = self.reference(&parent, false);
                    reference.namespace = outer.namespace;
                    reference.name = format!("{}.{}", outer.name, ty.name);
                    reference.scope = outer.scope;
                }
            }
            _ => {}
        }

        reference
    }
}

fn generic_name(names: &[String], index: u32, prefix: &str) -> TypeSig {
    let name = names
        .get(index as usize)
        .cloned()
        .unwrap_or_else(|| format!("{prefix}{index}"));
    TypeSig::GenericParam(name)
}

fn version(major: u32, minor: u32, build: u32, revision: u32) -> Version {
    let part = |value: u32| u16::try_from(value).unwrap_or(u16::MAX);
    Version::new(part(major), part(minor), part(build), part(revision))
}

fn immediate_operand(immediate: &Immediate) -> Operand {
    match immediate {
        Immediate::Int8(v) => Operand::Int(i64::from(*v)),
        Immediate::UInt8(v) => Operand::Int(i64::from(*v)),
        Immediate::Int16(v) => Operand::Int(i64::from(*v)),
        Immediate::UInt16(v) => Operand::Int(i64::from(*v)),
        Immediate::Int32(v) => Operand::Int(i64::from(*v)),
        Immediate::UInt32(v) => Operand::Int(i64::from(*v)),
        Immediate::Int64(v) => Operand::Int(*v),
        #[allow(clippy::cast_possible_wrap)]
        Immediate::UInt64(v) => Operand::Int(*v as i64),
        Immediate::Float32(v) => Operand::Float(f64::from(*v)),
        Immediate::Float64(v) => Operand::Float(*v),
    }
}

fn constant(value: &CilPrimitive) -> Constant {
    match &value.data {
        CilPrimitiveData::Boolean(v) => Constant::Boolean(*v),
        CilPrimitiveData::Char(v) => Constant::Char(*v),
        CilPrimitiveData::I1(v) => Constant::Int(i64::from(*v)),
        CilPrimitiveData::U1(v) => Constant::Int(i64::from(*v)),
        CilPrimitiveData::I2(v) => Constant::Int(i64::from(*v)),
        CilPrimitiveData::U2(v) => Constant::Int(i64::from(*v)),
        CilPrimitiveData::I4(v) => Constant::Int(i64::from(*v)),
        CilPrimitiveData::U4(v) => Constant::Int(i64::from(*v)),
        CilPrimitiveData::I8(v) => Constant::Int(*v),
        CilPrimitiveData::U8(v) => i64::try_from(*v).map_or(Constant::UInt(*v), Constant::Int),
        CilPrimitiveData::I(v) => Constant::Int(*v as i64),
        CilPrimitiveData::U(v) => Constant::UInt(*v as u64),
        CilPrimitiveData::R4(v) => Constant::Single(*v),
        CilPrimitiveData::R8(v) => Constant::Double(*v),
        CilPrimitiveData::String(v) => Constant::String(v.clone()),
        _ => Constant::Null,
    }
}
