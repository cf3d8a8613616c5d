//! C# spelling of type signatures.
//!
//! The namer writes every type by its simple name and remembers which namespaces it used,
//! so the caller can emit the matching `using` directives. Referenced assemblies are resolved
//! through the module while naming; the ones that cannot be found are collected.

use std::collections::BTreeSet;

use crate::metadata::{
    strip_arity, ModuleDefinition, PrimitiveType, TypeReference, TypeScope, TypeSig,
};

pub(crate) struct TypeNamer<'a> {
    module: &'a ModuleDefinition,
    namespaces: BTreeSet<String>,
    unresolved: BTreeSet<String>,
}

impl<'a> TypeNamer<'a> {
    pub(crate) fn new(module: &'a ModuleDefinition) -> Self {
        TypeNamer {
            module,
            namespaces: BTreeSet::new(),
            unresolved: BTreeSet::new(),
        }
    }

    /// The C# spelling of `sig`. By-ref wrappers are dropped, callers write `ref`/`out`.
    pub(crate) fn name(&mut self, sig: &TypeSig) -> String {
        match sig {
            TypeSig::Primitive(primitive) => primitive.to_string(),
            TypeSig::Named(reference) => self.reference(reference),
            TypeSig::GenericParam(name) => name.clone(),
            TypeSig::Array { element, rank } => {
                let commas = ",".repeat(rank.saturating_sub(1) as usize);
                format!("{}[{commas}]", self.name(element))
            }
            TypeSig::Pointer(inner) => format!("{}*", self.name(inner)),
            TypeSig::ByRef(inner) => self.name(inner),
            TypeSig::Invalid(reason) => format!("/* {reason} */ object"),
        }
    }

    fn reference(&mut self, reference: &TypeReference) -> String {
        self.note_scope(&reference.scope);

        if reference.generic_args.is_empty() {
            if let Some(primitive) =
                PrimitiveType::from_system_name(&reference.namespace, &reference.name)
            {
                return primitive.to_string();
            }
        }

        if reference.is("System", "Nullable`1") && reference.generic_args.len() == 1 {
            return format!("{}?", self.name(&reference.generic_args[0]));
        }

        if !reference.namespace.is_empty() {
            self.namespaces.insert(reference.namespace.clone());
        }

        let mut text = reference
            .name
            .split('.')
            .map(strip_arity)
            .collect::<Vec<_>>()
            .join(".");

        if !reference.generic_args.is_empty() {
            let args: Vec<String> = reference
                .generic_args
                .iter()
                .map(|arg| self.name(arg))
                .collect();
            text.push('<');
            text.push_str(&args.join(", "));
            text.push('>');
        }
        text
    }

    fn note_scope(&mut self, scope: &TypeScope) {
        if let TypeScope::Assembly(assembly) = scope {
            if self.module.resolve(assembly).is_none() {
                self.unresolved.insert(assembly.to_string());
            }
        }
    }

    /// Namespaces to import for a type declared in `own`: everything used, minus `own` and
    /// its parent namespaces.
    pub(crate) fn usings(&self, own: &str) -> Vec<String> {
        self.namespaces
            .iter()
            .filter(|namespace| {
                !(own == namespace.as_str()
                    || own
                        .strip_prefix(namespace.as_str())
                        .is_some_and(|rest| rest.starts_with('.')))
            })
            .cloned()
            .collect()
    }

    /// Display names of the referenced assemblies the resolver could not find.
    pub(crate) fn unresolved(&self) -> impl Iterator<Item = &String> {
        self.unresolved.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::{AssemblyName, Version},
        reader::NullResolver,
    };

    fn module() -> ModuleDefinition {
        ModuleDefinition::new("Acme.dll", Vec::new(), Vec::new(), Arc::new(NullResolver))
    }

    #[test]
    fn keywords_and_generics() {
        let module = module();
        let mut namer = TypeNamer::new(&module);

        let int = TypeSig::Named(TypeReference::local("System", "Int32"));
        assert_eq!(namer.name(&int), "int");

        let mut dictionary = TypeReference::local("System.Collections.Generic", "Dictionary`2");
        dictionary.generic_args = vec![
            TypeSig::Primitive(PrimitiveType::String),
            TypeSig::sz_array(TypeSig::GenericParam("T".into())),
        ];
        assert_eq!(namer.name(&TypeSig::Named(dictionary)), "Dictionary<string, T[]>");

        let mut nullable = TypeReference::local("System", "Nullable`1");
        nullable.generic_args = vec![TypeSig::Primitive(PrimitiveType::Int32)];
        assert_eq!(namer.name(&TypeSig::Named(nullable)), "int?");

        let nested = TypeReference::local("Acme", "Bag`1.Enumerator");
        assert_eq!(namer.name(&TypeSig::Named(nested)), "Bag.Enumerator");
    }

    #[test]
    fn usings_skip_own_and_parent_namespaces() {
        let module = module();
        let mut namer = TypeNamer::new(&module);
        for (namespace, name) in [
            ("System.Text", "StringBuilder"),
            ("Acme", "Gadget"),
            ("Acme.Widgets", "Part"),
            ("AcmeExtra", "Tool"),
        ] {
            namer.name(&TypeSig::Named(TypeReference::local(namespace, name)));
        }

        assert_eq!(namer.usings("Acme.Widgets"), vec!["AcmeExtra", "System.Text"]);
    }

    #[test]
    fn unresolved_assemblies_are_collected() {
        let module = module();
        let mut namer = TypeNamer::new(&module);
        let runtime = AssemblyName::new("Vendor.Runtime", Version::new(1, 0, 0, 0));
        let sig = TypeSig::Named(TypeReference::external("Vendor", "Engine", runtime));

        assert_eq!(namer.name(&sig), "Engine");
        assert_eq!(
            namer.unresolved().cloned().collect::<Vec<_>>(),
            vec!["Vendor.Runtime, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null".to_string()]
        );
    }
}
