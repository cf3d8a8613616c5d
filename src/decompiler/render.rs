//! C# declarations from type definitions.

use std::fmt::Write;

use crate::{
    decompiler::{
        body::{self, LiftedBody, Stmt},
        namer::TypeNamer,
        writer::CodeWriter,
        DecompilerSettings,
    },
    metadata::{
        strip_arity, Constant, EventDefinition, FieldAttributes, FieldDefinition, MethodAttributes,
        MethodDefinition, ModuleDefinition, ParameterDefinition, ParameterDirection,
        PrimitiveType, PropertyDefinition, TypeAttributes, TypeDefinition, TypeKind, TypeSig,
        Visibility,
        XmlDocumentation,
    },
    Error, Result,
};

enum Member<'t> {
    Field(&'t FieldDefinition),
    Event(&'t EventDefinition),
    Property(&'t PropertyDefinition),
    Method(&'t MethodDefinition),
    Nested(&'t TypeDefinition),
}

pub(crate) struct Renderer<'a> {
    settings: &'a DecompilerSettings,
    docs: Option<&'a XmlDocumentation>,
    namer: TypeNamer<'a>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        module: &'a ModuleDefinition,
        settings: &'a DecompilerSettings,
        docs: Option<&'a XmlDocumentation>,
    ) -> Self {
        Renderer {
            settings,
            docs,
            namer: TypeNamer::new(module),
        }
    }

    /// Render `ty` as a compilation unit: usings, namespace and the declaration.
    pub(crate) fn render(mut self, ty: &TypeDefinition) -> Result<String> {
        validate(ty, &ty.full_name.to_string())?;

        let namespace = ty.full_name.namespace.clone();
        let indentation = self.settings.formatting.indentation.clone();

        let mut body = CodeWriter::new(&indentation);
        if !namespace.is_empty() {
            body.indent();
        }
        self.declaration(&mut body, ty)?;
        let body = body.finish();

        let unresolved: Vec<String> = self.namer.unresolved().cloned().collect();
        if self.settings.throw_on_assembly_resolve_errors {
            if let Some(first) = unresolved.first() {
                return Err(Error::UnresolvedAssembly(first.clone()));
            }
        }

        let usings = self.namer.usings(&namespace);
        let mut head = CodeWriter::new(&indentation);
        for assembly in &unresolved {
            writeln!(head, "// Unresolved reference: {assembly}")?;
        }
        for using in &usings {
            writeln!(head, "using {using};")?;
        }
        if !unresolved.is_empty() || !usings.is_empty() {
            head.blank_line()?;
        }

        if namespace.is_empty() {
            let mut out = head.finish();
            out.push_str(&body);
            return Ok(out);
        }

        write!(head, "namespace {namespace}")?;
        head.open_block(self.settings.formatting.namespace_brace_style)?;
        let mut out = head.finish();
        out.push_str(&body);
        out.push_str("}\n");
        Ok(out)
    }

    fn summary(&self, w: &mut CodeWriter, text: Option<&str>) -> Result<()> {
        if !self.settings.show_xml_documentation {
            return Ok(());
        }
        if let Some(text) = text {
            writeln!(w, "/// <summary>")?;
            writeln!(w, "/// {text}")?;
            writeln!(w, "/// </summary>")?;
        }
        Ok(())
    }

    fn declaration(&mut self, w: &mut CodeWriter, ty: &TypeDefinition) -> Result<()> {
        self.summary(w, self.docs.and_then(|docs| docs.type_summary(ty)))?;

        if ty.kind == TypeKind::Delegate {
            return self.delegate(w, ty);
        }

        let mut modifiers = vec![ty.visibility.to_string()];
        if ty.kind == TypeKind::Class {
            if ty.is_static_class() {
                modifiers.push("static".to_string());
            } else if ty.attributes.contains(TypeAttributes::ABSTRACT) {
                modifiers.push("abstract".to_string());
            } else if ty.attributes.contains(TypeAttributes::SEALED) {
                modifiers.push("sealed".to_string());
            }
        }
        modifiers.push(ty.kind.to_string());

        write!(w, "{} {}", modifiers.join(" "), type_display_name(ty))?;

        let bases = self.bases(ty);
        if !bases.is_empty() {
            write!(w, " : {}", bases.join(", "))?;
        }
        w.open_block(self.settings.formatting.type_brace_style)?;

        if ty.kind == TypeKind::Enum {
            self.enum_members(w, ty)?;
        } else {
            self.members(w, ty)?;
        }

        w.close_block()?;
        Ok(())
    }

    fn bases(&mut self, ty: &TypeDefinition) -> Vec<String> {
        let mut bases = Vec::new();
        match ty.kind {
            TypeKind::Enum => {
                if let Some(underlying) = ty.field("value__") {
                    if underlying.field_type != TypeSig::Primitive(PrimitiveType::Int32) {
                        bases.push(self.namer.name(&underlying.field_type));
                    }
                }
                return bases;
            }
            TypeKind::Class => {
                if let Some(base) = ty.base_type.as_ref().filter(|base| !is_implicit_base(base)) {
                    bases.push(self.namer.name(base));
                }
            }
            _ => {}
        }

        for interface in &ty.interfaces {
            bases.push(self.namer.name(interface));
        }
        bases
    }

    fn delegate(&mut self, w: &mut CodeWriter, ty: &TypeDefinition) -> Result<()> {
        let invoke = ty.methods.iter().find(|method| method.name == "Invoke");
        let return_type = invoke.map_or_else(
            || "void".to_string(),
            |method| self.namer.name(&method.return_type),
        );
        let parameters = invoke.map_or_else(String::new, |method| self.parameters(&method.parameters));
        writeln!(
            w,
            "{} delegate {return_type} {}{}({parameters});",
            ty.visibility,
            type_display_name(ty),
            self.declaration_space()
        )?;
        Ok(())
    }

    fn enum_members(&mut self, w: &mut CodeWriter, ty: &TypeDefinition) -> Result<()> {
        let literals: Vec<&FieldDefinition> = ty
            .fields
            .iter()
            .filter(|field| field.attributes.contains(FieldAttributes::LITERAL))
            .collect();
        for (i, field) in literals.iter().enumerate() {
            let separator = if i + 1 < literals.len() { "," } else { "" };
            match &field.constant {
                Some(value) => writeln!(w, "{} = {value}{separator}", field.name)?,
                None => writeln!(w, "{}{separator}", field.name)?,
            }
        }
        Ok(())
    }

    fn members(&mut self, w: &mut CodeWriter, ty: &TypeDefinition) -> Result<()> {
        let fields: Vec<Member<'_>> = ty
            .fields
            .iter()
            .filter(|field| {
                !field.is_compiler_generated()
                    && !ty.events.iter().any(|event| event.name == field.name)
            })
            .map(Member::Field)
            .collect();
        let events: Vec<Member<'_>> = ty.events.iter().map(Member::Event).collect();
        let properties: Vec<Member<'_>> = ty.properties.iter().map(Member::Property).collect();
        let visible = |method: &&MethodDefinition| {
            !method.is_compiler_generated() && !ty.is_accessor(method)
        };
        let constructors: Vec<Member<'_>> = ty
            .methods
            .iter()
            .filter(|method| method.is_constructor())
            .filter(visible)
            .map(Member::Method)
            .collect();
        let methods: Vec<Member<'_>> = ty
            .methods
            .iter()
            .filter(|method| !method.is_constructor())
            .filter(visible)
            .map(Member::Method)
            .collect();
        let nested: Vec<Member<'_>> = ty
            .nested_types
            .iter()
            .filter(|nested| !nested.name.contains('<'))
            .map(Member::Nested)
            .collect();

        let mut first = true;
        for group in [fields, events, properties, constructors, methods, nested] {
            for (i, member) in group.iter().enumerate() {
                let separate = i == 0
                    || self.settings.expand_member_definitions
                    || matches!(member, Member::Nested(_));
                if !first && separate {
                    w.blank_line()?;
                }
                first = false;

                match member {
                    Member::Field(field) => self.field(w, ty, field)?,
                    Member::Event(event) => self.event(w, ty, event)?,
                    Member::Property(property) => self.property(w, ty, property)?,
                    Member::Method(method) => self.method(w, ty, method)?,
                    Member::Nested(nested) => self.declaration(w, nested)?,
                }
            }
        }
        Ok(())
    }

    fn field(&mut self, w: &mut CodeWriter, ty: &TypeDefinition, field: &FieldDefinition) -> Result<()> {
        self.summary(w, self.docs.and_then(|docs| docs.field_summary(ty, field)))?;

        let mut modifiers = Vec::new();
        if ty.kind != TypeKind::Interface {
            modifiers.push(field.visibility.to_string());
        }
        if field.attributes.contains(FieldAttributes::LITERAL) {
            modifiers.push("const".to_string());
        } else {
            if field.is_static() {
                modifiers.push("static".to_string());
            }
            if field.attributes.contains(FieldAttributes::INIT_ONLY) {
                modifiers.push("readonly".to_string());
            }
        }
        modifiers.push(self.namer.name(&field.field_type));
        modifiers.push(field.name.clone());

        let mut line = modifiers.join(" ");
        if let Some(value) = &field.constant {
            let value = match (value, &field.field_type) {
                (Constant::Int(0), TypeSig::Primitive(PrimitiveType::Boolean)) => {
                    "false".to_string()
                }
                (Constant::Int(1), TypeSig::Primitive(PrimitiveType::Boolean)) => {
                    "true".to_string()
                }
                (value, _) => value.to_string(),
            };
            line.push_str(" = ");
            line.push_str(&value);
        }
        writeln!(w, "{line};")?;
        Ok(())
    }

    fn event(&mut self, w: &mut CodeWriter, ty: &TypeDefinition, event: &EventDefinition) -> Result<()> {
        self.summary(w, self.docs.and_then(|docs| docs.member_summary('E', ty, &event.name)))?;

        let accessor = event.adder.and_then(|token| ty.method(token));
        let modifiers = match accessor {
            Some(method) if ty.kind != TypeKind::Interface => method_modifiers(method),
            _ => String::new(),
        };
        let event_type = self.namer.name(&event.event_type);
        writeln!(w, "{modifiers}event {event_type} {};", event.name)?;
        Ok(())
    }

    fn property(
        &mut self,
        w: &mut CodeWriter,
        ty: &TypeDefinition,
        property: &PropertyDefinition,
    ) -> Result<()> {
        self.summary(w, self.docs.and_then(|docs| docs.member_summary('P', ty, &property.name)))?;

        let getter = property.getter.and_then(|token| ty.method(token));
        let setter = property.setter.and_then(|token| ty.method(token));
        let primary = getter.or(setter);

        let visibility = most_visible(getter, setter);
        let modifiers = match primary {
            Some(method) if ty.kind != TypeKind::Interface => {
                let mut text = method_modifiers(method);
                if let Some(visibility) = visibility {
                    let own = method.visibility.to_string();
                    if text.starts_with(&own) {
                        text = format!("{visibility}{}", &text[own.len()..]);
                    }
                }
                text
            }
            _ => String::new(),
        };
        let accessor_visibility = |method: &MethodDefinition| match visibility {
            Some(visibility) if method.visibility != visibility && ty.kind != TypeKind::Interface => {
                format!("{} ", method.visibility)
            }
            _ => String::new(),
        };

        let property_type = self.namer.name(&property.property_type);
        let name = if property.parameters.is_empty() {
            property.name.clone()
        } else {
            format!("this[{}]", self.parameters(&property.parameters))
        };
        let header = format!("{modifiers}{property_type} {name}");

        let auto = ty
            .field(&format!("<{}>k__BackingField", property.name))
            .is_some();
        let abstract_accessor = primary.is_some_and(|method| method.is_abstract());
        let with_bodies = self.settings.decompile_member_bodies
            && ty.kind != TypeKind::Interface
            && !auto
            && !abstract_accessor;

        if !with_bodies {
            let mut accessors = Vec::new();
            if let Some(getter) = getter {
                accessors.push(format!("{}get;", accessor_visibility(getter)));
            }
            if let Some(setter) = setter {
                accessors.push(format!("{}set;", accessor_visibility(setter)));
            }
            writeln!(w, "{header} {{ {} }}", accessors.join(" "))?;
            return Ok(());
        }

        if let (Some(getter), None) = (getter, setter) {
            if self
                .settings
                .use_expression_body_for_calculated_getter_only_properties
            {
                let space = self.call_space();
                if let Ok(lifted) = body::lift(ty, getter, &mut self.namer, space) {
                    if let Some(expr) = lifted.single_return() {
                        writeln!(w, "{header} => {expr};")?;
                        return Ok(());
                    }
                }
            }
        }

        write!(w, "{header}")?;
        w.open_block(self.settings.formatting.property_brace_style)?;
        for (keyword, accessor) in [("get", getter), ("set", setter)] {
            let Some(accessor) = accessor else {
                continue;
            };
            write!(w, "{}{keyword}", accessor_visibility(accessor))?;
            w.open_block(self.settings.formatting.accessor_brace_style)?;
            self.method_body(w, ty, accessor)?;
            w.close_block()?;
        }
        w.close_block()?;
        Ok(())
    }

    fn method(&mut self, w: &mut CodeWriter, ty: &TypeDefinition, method: &MethodDefinition) -> Result<()> {
        self.summary(w, self.docs.and_then(|docs| docs.method_summary(ty, method)))?;

        let is_interface = ty.kind == TypeKind::Interface;
        let parameters = self.parameters(&method.parameters);

        let header = if method.is_constructor() {
            let modifiers = if method.is_static() {
                "static ".to_string()
            } else if is_interface {
                String::new()
            } else {
                format!("{} ", method.visibility)
            };
            format!(
                "{modifiers}{}{}({parameters})",
                strip_arity(&ty.name),
                self.constructor_space()
            )
        } else {
            let modifiers = if is_interface {
                String::new()
            } else {
                method_modifiers(method)
            };
            let return_type = self.namer.name(&method.return_type);
            let generics = if method.generic_parameters.is_empty() {
                String::new()
            } else {
                format!("<{}>", method.generic_parameters.join(", "))
            };
            format!(
                "{modifiers}{return_type} {}{generics}{}({parameters})",
                method_display_name(method),
                self.declaration_space()
            )
        };

        let has_body = self.settings.decompile_member_bodies
            && !is_interface
            && !method.is_abstract()
            && method.body.is_some();
        if !has_body {
            writeln!(w, "{header};")?;
            return Ok(());
        }

        let space = self.call_space();
        match body::lift(ty, method, &mut self.namer, space) {
            Ok(lifted) => {
                write!(w, "{header}")?;
                if let Some(initializer) = lifted.initializer.as_deref().filter(|i| !i.is_empty()) {
                    write!(w, " : {initializer}")?;
                }
                w.open_block(self.settings.formatting.method_brace_style)?;
                self.statements(w, &lifted.statements)?;
                w.close_block()?;
            }
            Err(_) => {
                write!(w, "{header}")?;
                w.open_block(self.settings.formatting.method_brace_style)?;
                for line in body::il_listing(method) {
                    writeln!(w, "{line}")?;
                }
                w.close_block()?;
            }
        }
        Ok(())
    }

    /// Statements of an accessor body, or its IL listing.
    fn method_body(&mut self, w: &mut CodeWriter, ty: &TypeDefinition, method: &MethodDefinition) -> Result<()> {
        let space = self.call_space();
        let lifted: Option<LiftedBody> = body::lift(ty, method, &mut self.namer, space).ok();
        match lifted {
            Some(lifted) => self.statements(w, &lifted.statements),
            None => {
                for line in body::il_listing(method) {
                    writeln!(w, "{line}")?;
                }
                Ok(())
            }
        }
    }

    fn statements(&mut self, w: &mut CodeWriter, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            match statement {
                Stmt::Line(text) => writeln!(w, "{text};")?,
                Stmt::Return(None) => writeln!(w, "return;")?,
                Stmt::Return(Some(value)) => writeln!(w, "return {value};")?,
                Stmt::If { condition, body } => {
                    write!(w, "if ({condition})")?;
                    let single = matches!(body.as_slice(), [Stmt::Line(_) | Stmt::Return(_)]);
                    if single && !self.settings.always_use_braces {
                        writeln!(w)?;
                        w.indent();
                        self.statements(w, body)?;
                        w.outdent();
                    } else {
                        w.open_block(self.settings.formatting.statement_brace_style)?;
                        self.statements(w, body)?;
                        w.close_block()?;
                    }
                }
            }
        }
        Ok(())
    }

    fn parameters(&mut self, parameters: &[ParameterDefinition]) -> String {
        parameters
            .iter()
            .map(|param| {
                let direction = match param.direction {
                    ParameterDirection::Value => "",
                    ParameterDirection::Ref => "ref ",
                    ParameterDirection::Out => "out ",
                    ParameterDirection::In => "in ",
                };
                let mut text = format!(
                    "{direction}{} {}",
                    self.namer.name(&param.parameter_type),
                    param.name
                );
                if let Some(default) = &param.default {
                    text.push_str(&format!(" = {default}"));
                }
                text
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn call_space(&self) -> bool {
        self.settings.formatting.space_before_method_call_parentheses
    }

    fn declaration_space(&self) -> &'static str {
        if self
            .settings
            .formatting
            .space_before_method_declaration_parentheses
        {
            " "
        } else {
            ""
        }
    }

    fn constructor_space(&self) -> &'static str {
        if self
            .settings
            .formatting
            .space_before_constructor_declaration_parentheses
        {
            " "
        } else {
            ""
        }
    }
}

/// Fail with [`Error::InvalidSignature`] on the first undecodable signature in `ty`.
fn validate(ty: &TypeDefinition, owner: &str) -> Result<()> {
    let invalid = |member: String, reason: &str| Error::InvalidSignature {
        member,
        reason: reason.to_string(),
    };

    for base in ty.base_type.iter().chain(&ty.interfaces) {
        if let Some(reason) = base.invalid_reason() {
            return Err(invalid(owner.to_string(), reason));
        }
    }
    for field in &ty.fields {
        if let Some(reason) = field.field_type.invalid_reason() {
            return Err(invalid(format!("{owner}.{}", field.name), reason));
        }
    }
    for method in &ty.methods {
        if let Some(reason) = method.invalid_signature() {
            return Err(invalid(format!("{owner}.{}", method.name), reason));
        }
    }
    for property in &ty.properties {
        let reason = property.property_type.invalid_reason().or_else(|| {
            property
                .parameters
                .iter()
                .find_map(|param| param.parameter_type.invalid_reason())
        });
        if let Some(reason) = reason {
            return Err(invalid(format!("{owner}.{}", property.name), reason));
        }
    }
    for event in &ty.events {
        if let Some(reason) = event.event_type.invalid_reason() {
            return Err(invalid(format!("{owner}.{}", event.name), reason));
        }
    }
    for nested in &ty.nested_types {
        validate(nested, &format!("{owner}+{}", nested.name))?;
    }
    Ok(())
}

fn is_implicit_base(base: &TypeSig) -> bool {
    match base {
        TypeSig::Primitive(PrimitiveType::Object) => true,
        TypeSig::Named(reference) => {
            reference.is("System", "Object")
                || reference.is("System", "ValueType")
                || reference.is("System", "Enum")
                || reference.is("System", "MulticastDelegate")
        }
        _ => false,
    }
}

/// Name with the generic parameters this type declares itself; nested types repeat the
/// parameters of their declaring types in metadata, only the trailing ones are their own.
fn type_display_name(ty: &TypeDefinition) -> String {
    let arity = ty
        .name
        .split_once('`')
        .and_then(|(_, arity)| arity.parse::<usize>().ok())
        .unwrap_or(0)
        .min(ty.generic_parameters.len());
    let own = &ty.generic_parameters[ty.generic_parameters.len() - arity..];

    let name = strip_arity(&ty.name);
    if own.is_empty() {
        name.to_string()
    } else {
        format!("{name}<{}>", own.join(", "))
    }
}

fn method_display_name(method: &MethodDefinition) -> String {
    match method.name.rsplit_once('.') {
        Some((interface, member)) => {
            let interface = interface.rsplit('.').next().unwrap_or(interface);
            format!("{}.{member}", strip_arity(interface))
        }
        None => method.name.clone(),
    }
}

fn most_visible(
    getter: Option<&MethodDefinition>,
    setter: Option<&MethodDefinition>,
) -> Option<Visibility> {
    let rank = |visibility: Visibility| match visibility {
        Visibility::Public => 5,
        Visibility::ProtectedInternal => 4,
        Visibility::Protected | Visibility::Internal => 3,
        Visibility::PrivateProtected => 2,
        Visibility::Private => 1,
    };
    getter
        .into_iter()
        .chain(setter)
        .map(|method| method.visibility)
        .max_by_key(|visibility| rank(*visibility))
}

/// Modifiers of a class or struct method, with a trailing space.
fn method_modifiers(method: &MethodDefinition) -> String {
    let attributes = method.attributes;
    let mut parts: Vec<&str> = Vec::new();

    let explicit = !method.is_constructor() && method.name.contains('.');
    let visibility = method.visibility.to_string();
    if !explicit {
        parts.push(&visibility);
    }
    if method.is_static() {
        parts.push("static");
    }

    if method.is_abstract() {
        parts.push("abstract");
    } else if attributes.contains(MethodAttributes::VIRTUAL) && !explicit {
        let new_slot = attributes.contains(MethodAttributes::NEW_SLOT);
        let sealed = attributes.contains(MethodAttributes::FINAL);
        match (new_slot, sealed) {
            (true, false) => parts.push("virtual"),
            (true, true) => {}
            (false, true) => parts.push("sealed override"),
            (false, false) => parts.push("override"),
        }
    }

    if attributes.contains(MethodAttributes::PINVOKE_IMPL)
        || (method.body.is_none() && !method.is_abstract())
    {
        parts.push("extern");
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("{} ", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MethodBody;

    #[test]
    fn nested_generic_display_names() {
        let mut bag = TypeDefinition::new(0x0200_0002, "Acme", "Bag`1");
        bag.generic_parameters = vec!["T".to_string()];
        assert_eq!(type_display_name(&bag), "Bag<T>");

        let mut enumerator = TypeDefinition::new(0x0200_0003, "", "Enumerator");
        enumerator.generic_parameters = vec!["T".to_string()];
        assert_eq!(type_display_name(&enumerator), "Enumerator");

        let mut pair = TypeDefinition::new(0x0200_0004, "", "Pair`1");
        pair.generic_parameters = vec!["T".to_string(), "U".to_string()];
        assert_eq!(type_display_name(&pair), "Pair<U>");
    }

    #[test]
    fn modifiers_from_attributes() {
        let mut method = MethodDefinition::new(0x0600_0001, "Run", TypeSig::Primitive(PrimitiveType::Void));
        method.body = Some(MethodBody::default());
        assert_eq!(method_modifiers(&method), "public ");

        method.attributes |= MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT;
        assert_eq!(method_modifiers(&method), "public virtual ");

        method.attributes.remove(MethodAttributes::NEW_SLOT);
        assert_eq!(method_modifiers(&method), "public override ");

        method.attributes = MethodAttributes::STATIC | MethodAttributes::PINVOKE_IMPL;
        method.body = None;
        assert_eq!(method_modifiers(&method), "public static extern ");

        let mut explicit = MethodDefinition::new(
            0x0600_0002,
            "System.IDisposable.Dispose",
            TypeSig::Primitive(PrimitiveType::Void),
        );
        explicit.visibility = Visibility::Private;
        explicit.attributes |= MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT | MethodAttributes::FINAL;
        explicit.body = Some(MethodBody::default());
        assert_eq!(method_modifiers(&explicit), "");
        assert_eq!(method_display_name(&explicit), "IDisposable.Dispose");
    }

    #[test]
    fn validate_reports_member() {
        let mut ty = TypeDefinition::new(0x0200_0002, "Acme", "Widget");
        ty.fields.push(FieldDefinition::new(
            0x0400_0001,
            "_broken",
            TypeSig::Invalid("unresolved type token 0x01000099".to_string()),
        ));
        let error = validate(&ty, "Acme.Widget").unwrap_err();
        assert_eq!(
            error,
            Error::InvalidSignature {
                member: "Acme.Widget._broken".to_string(),
                reason: "unresolved type token 0x01000099".to_string(),
            }
        );
    }
}
