//! C#-like source text for the types of a module.
//!
//! A [`Decompiler`] wraps a [`ModuleDefinition`] and a set of [`DecompilerSettings`]. It renders
//! one type at a time: declarations come straight from metadata, and member bodies are lifted
//! from CIL where the instruction stream is simple enough, falling back to an IL listing
//! otherwise.
//!
//! # Architecture
//!
//! - [`DecompilerSettings`] / [`FormattingOptions`] - behaviour switches and text layout
//! - `render` - the type renderer, walking a `TypeDefinition` into declarations
//! - `body` - the body lifter, turning CIL into statements
//! - `namer` - C# spelling of signatures, `using` collection and reference resolution
//! - `writer` - indentation-aware output buffer
//!
//! # Examples
//!
//! ```rust,no_run
//! use nuscope::decompiler::{CodeView, Decompiler, DecompilerSettings};
//! use nuscope::metadata::FullTypeName;
//! # fn module() -> std::sync::Arc<nuscope::metadata::ModuleDefinition> { unimplemented!() }
//!
//! let decompiler = Decompiler::new(module(), DecompilerSettings::for_view(CodeView::Interface));
//! let name = FullTypeName::parse("Acme.Widget")?;
//! println!("{}", decompiler.decompile_type_as_string(&name)?);
//! # Ok::<(), nuscope::Error>(())
//! ```

mod body;
mod namer;
mod render;
mod settings;
mod writer;

use std::sync::Arc;

use log::debug;

use crate::{
    metadata::{FullTypeName, ModuleDefinition, XmlDocumentation},
    Error, Result,
};

pub use settings::{BraceStyle, CodeView, DecompilerSettings, FormattingOptions};

/// Renders types of one module with a fixed configuration.
///
/// Stateless beyond its configuration: every call to
/// [`Decompiler::decompile_type_as_string`] starts from scratch, so a single instance can be
/// shared between threads behind an `Arc`.
#[derive(Debug)]
pub struct Decompiler {
    module: Arc<ModuleDefinition>,
    settings: DecompilerSettings,
    documentation: Option<Arc<XmlDocumentation>>,
}

impl Decompiler {
    /// Create a decompiler over `module`.
    pub fn new(module: Arc<ModuleDefinition>, settings: DecompilerSettings) -> Self {
        Decompiler {
            module,
            settings,
            documentation: None,
        }
    }

    /// Attach the XML documentation used when [`DecompilerSettings::show_xml_documentation`]
    /// is set.
    #[must_use]
    pub fn with_documentation(mut self, documentation: Arc<XmlDocumentation>) -> Self {
        self.documentation = Some(documentation);
        self
    }

    /// The module this decompiler renders from.
    pub fn module(&self) -> &Arc<ModuleDefinition> {
        &self.module
    }

    /// The configuration in effect.
    pub fn settings(&self) -> &DecompilerSettings {
        &self.settings
    }

    /// Render the type `name` as a C# compilation unit.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeNotFound`] if the module defines no such type
    /// - [`Error::InvalidSignature`] if a signature of the type could not be decoded
    /// - [`Error::UnresolvedAssembly`] if a referenced assembly is missing and
    ///   [`DecompilerSettings::throw_on_assembly_resolve_errors`] is set
    pub fn decompile_type_as_string(&self, name: &FullTypeName) -> Result<String> {
        let ty = self
            .module
            .find_type(name)
            .ok_or_else(|| Error::TypeNotFound(name.to_string()))?;

        debug!("decompiling {name} from {}", self.module.name);
        render::Renderer::new(&self.module, &self.settings, self.documentation.as_deref())
            .render(ty)
    }
}
