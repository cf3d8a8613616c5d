//! Reflection-style type names used to address types inside a module.
//!
//! A [`FullTypeName`] identifies a type definition by namespace and by the chain of enclosing
//! type names, using the same textual form as `System.Type.FullName`:
//!
//! - `Acme.Widgets.Widget` - top-level type
//! - `Acme.Widgets.Widget+Part` - `Part` nested inside `Widget`
//! - ``Acme.Collections.Bag`1`` - generic type, arity kept in the name
//!
//! Generic arity suffixes are part of the metadata name and are preserved as-is.

use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// Fully qualified name of a (possibly nested) type definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullTypeName {
    /// Namespace of the outermost type, empty for the global namespace
    pub namespace: String,
    /// Outermost type name first, followed by each nested type name
    pub names: Vec<String>,
}

impl FullTypeName {
    /// Create the name of a top-level type.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        FullTypeName {
            namespace: namespace.into(),
            names: vec![name.into()],
        }
    }

    /// Create the name of a type nested in `self`.
    #[must_use]
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        FullTypeName {
            namespace: self.namespace.clone(),
            names,
        }
    }

    /// Parse a reflection name such as `Acme.Widget+Part`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTypeName`] if the name is empty or contains an empty segment.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let mut parts = value.split('+');
        let outer = parts.next().unwrap_or_default();

        let (namespace, name) = match outer.rfind('.') {
            Some(pos) => (&outer[..pos], &outer[pos + 1..]),
            None => ("", outer),
        };

        if name.is_empty() {
            return Err(Error::InvalidTypeName(value.to_string()));
        }

        let mut names = vec![name.to_string()];
        for nested in parts {
            if nested.is_empty() {
                return Err(Error::InvalidTypeName(value.to_string()));
            }
            names.push(nested.to_string());
        }

        Ok(FullTypeName {
            namespace: namespace.to_string(),
            names,
        })
    }

    /// The innermost type name.
    pub fn name(&self) -> &str {
        self.names.last().map_or("", String::as_str)
    }

    /// Returns true if this names a nested type.
    pub fn is_nested(&self) -> bool {
        self.names.len() > 1
    }

    /// The name of the enclosing type, if this is a nested type.
    pub fn declaring(&self) -> Option<FullTypeName> {
        if !self.is_nested() {
            return None;
        }

        Some(FullTypeName {
            namespace: self.namespace.clone(),
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for FullTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }
        write!(f, "{}", self.names.join("+"))
    }
}

impl FromStr for FullTypeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FullTypeName::parse(s)
    }
}
