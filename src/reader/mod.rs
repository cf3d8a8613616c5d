//! Turning assembly images into the owned metadata model.
//!
//! The [`AssemblyReader`] trait is the seam between the package layer and the metadata
//! library. [`CilReader`] is the production implementation on top of `dotscope`; tests plug in
//! their own readers to count invocations or to hand back prepared models.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nuscope::reader::{AssemblyReader, CilReader, NullResolver, ReaderParameters, ValidationLevel};
//! use std::sync::Arc;
//!
//! let data = std::fs::read("Acme.Widgets.dll")?;
//! let parameters = ReaderParameters::new(Arc::new(NullResolver)).with_validation(ValidationLevel::Minimal);
//! let assembly = CilReader.read(data, &parameters)?;
//! println!("{} defines {} types", assembly.name, assembly.main_module.all_types().len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cil;
mod resolver;

use std::{fmt, sync::Arc};

use dotscope::ValidationConfig;
use strum::{Display, EnumIter, EnumString};

use crate::{metadata::AssemblyDefinition, Result};

pub use cil::CilReader;
pub use resolver::{AssemblyCache, AssemblyResolver, NullResolver};

/// How thoroughly `dotscope` validates an image before it is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ValidationLevel {
    /// No validation
    Disabled,
    /// Only checks needed to load the image, lenient enough for arbitrary packages
    #[default]
    Minimal,
    /// The checks the runtime performs
    Production,
    /// Every structural and semantic check
    Comprehensive,
    /// Comprehensive, failing on any warning
    Strict,
}

impl ValidationLevel {
    /// The matching `dotscope` configuration.
    pub fn config(self) -> ValidationConfig {
        match self {
            ValidationLevel::Disabled => ValidationConfig::disabled(),
            ValidationLevel::Minimal => ValidationConfig::minimal(),
            ValidationLevel::Production => ValidationConfig::production(),
            ValidationLevel::Comprehensive => ValidationConfig::comprehensive(),
            ValidationLevel::Strict => ValidationConfig::strict(),
        }
    }
}

/// Options for a single read.
#[derive(Clone)]
pub struct ReaderParameters {
    /// Resolver handed to the resulting module
    pub resolver: Arc<dyn AssemblyResolver>,
    /// Image validation
    pub validation: ValidationLevel,
}

impl ReaderParameters {
    /// Parameters with the default validation level.
    pub fn new(resolver: Arc<dyn AssemblyResolver>) -> Self {
        ReaderParameters {
            resolver,
            validation: ValidationLevel::default(),
        }
    }

    /// Use a different validation level.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationLevel) -> Self {
        self.validation = validation;
        self
    }
}

impl fmt::Debug for ReaderParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderParameters")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

/// Parses an assembly image into the metadata model.
pub trait AssemblyReader: Send + Sync {
    /// Parse `data`, wiring `parameters.resolver` into the resulting module.
    ///
    /// # Errors
    /// Returns an error if the image is empty or is not a valid .NET assembly.
    fn read(&self, data: Vec<u8>, parameters: &ReaderParameters) -> Result<AssemblyDefinition>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn validation_level_names() {
        assert_eq!(ValidationLevel::default(), ValidationLevel::Minimal);
        assert_eq!(ValidationLevel::Comprehensive.to_string(), "comprehensive");
        assert_eq!(
            ValidationLevel::from_str("minimal").unwrap(),
            ValidationLevel::Minimal
        );
        assert!(ValidationLevel::from_str("paranoid").is_err());
        assert_eq!(ValidationLevel::iter().count(), 5);
    }

    #[test]
    fn parameters_builder() {
        let parameters = ReaderParameters::new(Arc::new(NullResolver))
            .with_validation(ValidationLevel::Strict);
        assert_eq!(parameters.validation, ValidationLevel::Strict);
        assert!(format!("{parameters:?}").contains("Strict"));
    }
}
