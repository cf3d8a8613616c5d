//! Compiler-generated XML documentation files.
//!
//! A documentation file ships next to the assembly inside a package (`lib/net8.0/Acme.xml`
//! for `lib/net8.0/Acme.dll`) and maps documentation IDs to XML fragments:
//!
//! ```xml
//! <doc>
//!   <members>
//!     <member name="T:Acme.Widget"><summary>A widget.</summary></member>
//!     <member name="M:Acme.Widget.Add(System.Int32,System.Int32)">...</member>
//!   </members>
//! </doc>
//! ```
//!
//! Only the `<summary>` text is kept. `<see cref="..."/>` and `<paramref name="..."/>`
//! are flattened to the name they point at.

use std::collections::HashMap;

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{
    metadata::{
        FieldDefinition, FullTypeName, MethodDefinition, PrimitiveType, TypeDefinition, TypeSig,
    },
    Error, Result,
};

/// Parsed summaries of an XML documentation file, keyed by documentation ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlDocumentation {
    summaries: HashMap<String, String>,
}

impl XmlDocumentation {
    /// Parse a documentation file.
    ///
    /// # Errors
    /// Returns [`Error::Documentation`] if the XML is not well formed.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(false);

        let mut summaries = HashMap::new();
        let mut buf = Vec::new();
        let mut member: Option<String> = None;
        let mut in_summary = false;
        let mut text = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(element) => match element.name().as_ref() {
                    b"member" => member = attribute(&element, b"name")?,
                    b"summary" if member.is_some() => {
                        in_summary = true;
                        text.clear();
                    }
                    _ => {}
                },
                Event::Empty(element) if in_summary => {
                    if let Some(target) = reference_text(&element)? {
                        text.push_str(&target);
                    }
                }
                Event::Text(content) if in_summary => {
                    let content = content
                        .unescape()
                        .map_err(|e| Error::Documentation(e.to_string()))?;
                    text.push_str(&content);
                }
                Event::End(element) => match element.name().as_ref() {
                    b"summary" if in_summary => {
                        in_summary = false;
                        if let Some(id) = &member {
                            summaries.insert(id.clone(), normalize(&text));
                        }
                    }
                    b"member" => member = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(XmlDocumentation { summaries })
    }

    /// Number of documented members.
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// Returns true if nothing is documented.
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Summary text for a raw documentation ID such as `T:Acme.Widget`.
    pub fn summary(&self, id: &str) -> Option<&str> {
        self.summaries.get(id).map(String::as_str)
    }

    /// Summary of a type.
    pub fn type_summary(&self, ty: &TypeDefinition) -> Option<&str> {
        self.summary(&type_id(&ty.full_name))
    }

    /// Summary of a method declared by `owner`.
    pub fn method_summary(&self, owner: &TypeDefinition, method: &MethodDefinition) -> Option<&str> {
        self.summary(&method_id(owner, method))
    }

    /// Summary of a field, property or event named `name` declared by `owner`.
    pub fn member_summary(&self, prefix: char, owner: &TypeDefinition, name: &str) -> Option<&str> {
        self.summary(&format!("{prefix}:{}.{name}", doc_type_name(&owner.full_name)))
    }

    /// Summary of a field.
    pub fn field_summary(&self, owner: &TypeDefinition, field: &FieldDefinition) -> Option<&str> {
        self.member_summary('F', owner, &field.name)
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    let Some(attr) = element
        .try_get_attribute(name)
        .map_err(|e| Error::Documentation(e.to_string()))?
    else {
        return Ok(None);
    };

    let value = attr
        .unescape_value()
        .map_err(|e| Error::Documentation(e.to_string()))?;
    Ok(Some(value.into_owned()))
}

fn reference_text(element: &BytesStart<'_>) -> Result<Option<String>> {
    match element.name().as_ref() {
        b"see" | b"seealso" => Ok(attribute(element, b"cref")?.map(|cref| {
            let target = cref.split_once(':').map_or(cref.as_str(), |(_, rest)| rest);
            let target = target.split('(').next().unwrap_or(target);
            target.rsplit('.').next().unwrap_or(target).to_string()
        })),
        b"paramref" | b"typeparamref" => attribute(element, b"name"),
        _ => Ok(None),
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Type name in documentation ID form: nested types joined with `.`.
fn doc_type_name(name: &FullTypeName) -> String {
    let nested = name.names.join(".");
    if name.namespace.is_empty() {
        nested
    } else {
        format!("{}.{nested}", name.namespace)
    }
}

/// Documentation ID of a type, e.g. `T:Acme.Outer.Inner`.
pub fn type_id(name: &FullTypeName) -> String {
    format!("T:{}", doc_type_name(name))
}

/// Documentation ID of a method, e.g. `M:Acme.Widget.Add(System.Int32,System.Int32)`.
pub fn method_id(owner: &TypeDefinition, method: &MethodDefinition) -> String {
    let mut id = format!(
        "M:{}.{}",
        doc_type_name(&owner.full_name),
        method.name.replace('.', "#")
    );
    if !method.generic_parameters.is_empty() {
        id.push_str(&format!("``{}", method.generic_parameters.len()));
    }

    if !method.parameters.is_empty() {
        let params: Vec<String> = method
            .parameters
            .iter()
            .map(|param| {
                let mut text =
                    doc_sig(&param.parameter_type, &owner.generic_parameters, &method.generic_parameters);
                if param.direction != crate::metadata::ParameterDirection::Value {
                    text.push('@');
                }
                text
            })
            .collect();
        id.push('(');
        id.push_str(&params.join(","));
        id.push(')');
    }
    id
}

fn doc_sig(sig: &TypeSig, type_generics: &[String], method_generics: &[String]) -> String {
    match sig {
        TypeSig::Primitive(primitive) => match primitive {
            PrimitiveType::TypedReference => "System.TypedReference".to_string(),
            other => format!("System.{}", other.type_name()),
        },
        TypeSig::Named(reference) => {
            let base = crate::metadata::strip_arity(&reference.name);
            let mut text = if reference.namespace.is_empty() {
                base.to_string()
            } else {
                format!("{}.{base}", reference.namespace)
            };
            if reference.generic_args.is_empty() {
                if base.len() != reference.name.len() {
                    text.push_str(&reference.name[base.len()..]);
                }
            } else {
                let args: Vec<String> = reference
                    .generic_args
                    .iter()
                    .map(|arg| doc_sig(arg, type_generics, method_generics))
                    .collect();
                text.push('{');
                text.push_str(&args.join(","));
                text.push('}');
            }
            text
        }
        TypeSig::GenericParam(name) => {
            if let Some(index) = method_generics.iter().position(|p| p == name) {
                format!("``{index}")
            } else if let Some(index) = type_generics.iter().position(|p| p == name) {
                format!("`{index}")
            } else {
                name.clone()
            }
        }
        TypeSig::Array { element, rank } => {
            let element = doc_sig(element, type_generics, method_generics);
            if *rank <= 1 {
                format!("{element}[]")
            } else {
                let dims = vec!["0:"; *rank as usize].join(",");
                format!("{element}[{dims}]")
            }
        }
        TypeSig::Pointer(inner) => format!("{}*", doc_sig(inner, type_generics, method_generics)),
        TypeSig::ByRef(inner) => format!("{}@", doc_sig(inner, type_generics, method_generics)),
        TypeSig::Invalid(_) => "?".to_string(),
    }
}
