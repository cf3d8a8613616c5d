// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # nuscope
//!
//! Type metadata and decompiled C# views for the .NET assemblies inside NuGet packages.
//!
//! `nuscope` is the browsing layer between a package viewer and the `dotscope` metadata
//! library. Given an assembly entry of a `.nupkg`, it parses the assembly on first use, keeps
//! the resulting model in memory, and renders any of its types as C#-like source text, either
//! as bare declarations (the interface view) or with member bodies (the full view).
//!
//! ## Features
//!
//! - **Lazy and shared** - an entry is read and parsed at most once, decompilers are built at
//!   most once per view, and concurrent first accesses share a single result
//! - **Never fails a page** - per-type code retrieval turns every failure into an inline
//!   `/* ... */` comment
//! - **Off the executor** - decompilation runs on tokio's blocking pool
//! - **Pluggable** - the assembly reader and the reference resolver are traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nuscope::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> nuscope::Result<()> {
//! let archive = PackageArchive::from_path("acme.widgets.1.2.0.nupkg")?;
//! let file = archive.entry("lib/net8.0/Acme.Widgets.dll")?.expect("library entry");
//! let assembly = PackageAssembly::new(file, Arc::new(NullResolver));
//!
//! if let Some(definition) = assembly.definition()? {
//!     for ty in definition.main_module.all_types() {
//!         println!("{}", ty.full_type_name());
//!     }
//! }
//!
//! let widget = FullTypeName::parse("Acme.Widget")?;
//! println!("{}", assembly.type_interface_code(&widget).await);
//! println!("{}", assembly.type_code(&widget).await);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`package`] - zip archives, package files and the lazy [`package::PackageAssembly`]
//! - [`reader`] - the [`reader::AssemblyReader`] seam, its `dotscope` implementation and
//!   assembly resolution
//! - [`metadata`] - the owned, immutable assembly model
//! - [`decompiler`] - C# rendering of types with configurable layout
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! Failures to load an assembly surface from [`package::PackageAssembly::definition`] and are
//! cached; failures while rendering a type never leave the per-type operations:
//!
//! ```rust,no_run
//! use nuscope::{package::{PackageAssembly, PackageFile}, reader::NullResolver, Error};
//! use std::sync::Arc;
//!
//! let assembly = PackageAssembly::new(PackageFile::detached("lib/Broken.dll"), Arc::new(NullResolver));
//! match assembly.definition() {
//!     Ok(Some(_)) => println!("loaded"),
//!     Ok(None) => println!("no content"),
//!     Err(Error::Malformed { message, .. }) => println!("malformed: {message}"),
//!     Err(e) => println!("error: {e}"),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use nuscope::prelude::*;
/// use std::sync::Arc;
///
/// let archive = PackageArchive::from_path("acme.widgets.1.2.0.nupkg")?;
/// let assemblies = archive.assemblies(Arc::new(NullResolver))?;
/// println!("{} assemblies", assemblies.len());
/// # Ok::<(), nuscope::Error>(())
/// ```
pub mod prelude;

/// Rendering of types as C#-like source text.
///
/// # Key Types
///
/// - [`decompiler::Decompiler`] - renders the types of one module
/// - [`decompiler::DecompilerSettings`] - behaviour switches, with presets per
///   [`decompiler::CodeView`]
/// - [`decompiler::FormattingOptions`] - brace placement, indentation and spacing
pub mod decompiler;

/// The owned assembly model.
///
/// Everything a decompiler needs, copied out of the metadata tables once: types with their
/// members, resolved signatures, decoded method bodies and documentation.
pub mod metadata;

/// NuGet package archives and the lazily loaded assemblies inside them.
pub mod package;

/// Parsing assembly images and resolving assembly references.
pub mod reader;

/// `nuscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `nuscope` Error type
///
/// The main error type for all operations in this crate. Load failures are cached and returned
/// from [`package::PackageAssembly::definition`]; decompilation failures are rendered inline.
pub use error::Error;
