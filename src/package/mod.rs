//! NuGet packages and the assemblies inside them.
//!
//! A `.nupkg` is a zip archive. [`PackageArchive`] opens one from memory or disk and hands out
//! [`PackageFile`]s, the archive entries a package browser lists. Files holding an assembly are
//! wrapped in a [`PackageAssembly`], which loads metadata and builds decompilers on demand.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nuscope::{package::PackageArchive, reader::NullResolver};
//! use std::sync::Arc;
//!
//! # async fn run() -> nuscope::Result<()> {
//! let archive = PackageArchive::from_path("acme.widgets.1.2.0.nupkg")?;
//! for assembly in archive.assemblies(Arc::new(NullResolver))? {
//!     if assembly.file().is_build_asset() {
//!         continue;
//!     }
//!     let name = "Acme.Widget".parse()?;
//!     println!("{}", assembly.type_interface_code(&name).await);
//! }
//! # Ok(())
//! # }
//! ```

mod assembly;

use std::{
    fmt,
    io::{Cursor, Read},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, trace};
use zip::ZipArchive;

use crate::{metadata::XmlDocumentation, reader::AssemblyResolver, Error, Result};

pub use assembly::{PackageAssembly, NO_DECOMPILER};

/// File extensions of entries holding a .NET assembly.
const ASSEMBLY_EXTENSIONS: [&str; 3] = ["dll", "exe", "winmd"];

type Archive = ZipArchive<Cursor<Arc<[u8]>>>;

/// An opened package.
///
/// Cloning is cheap; clones share the underlying archive. Entries are decompressed one at a
/// time under a lock held only for the duration of that entry's read.
#[derive(Clone)]
pub struct PackageArchive {
    archive: Arc<Mutex<Archive>>,
}

impl PackageArchive {
    /// Open a package held in memory.
    ///
    /// # Errors
    /// Returns [`Error::Archive`] if `data` is not a zip archive.
    pub fn open(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data.into()))?;
        debug!("opened package with {} entries", archive.len());
        Ok(PackageArchive {
            archive: Arc::new(Mutex::new(archive)),
        })
    }

    /// Read and open a package from disk.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Archive`] if it is not a zip
    /// archive.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::open(data)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Archive>> {
        self.archive.lock().map_err(|_| Error::LockError)
    }

    /// All file entries, in archive order. Directory entries are skipped.
    ///
    /// # Errors
    /// Returns an error if the central directory cannot be read.
    pub fn entries(&self) -> Result<Vec<PackageFile>> {
        let mut archive = self.lock()?;
        let mut files = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            if file.is_dir() {
                continue;
            }
            files.push(PackageFile {
                full_name: file.name().to_string(),
                size: file.size(),
                entry: Some(ArchiveEntry {
                    archive: self.clone(),
                    index,
                }),
            });
        }
        Ok(files)
    }

    /// The entry named `name`, matched exactly first and case-insensitively second.
    ///
    /// # Errors
    /// Returns an error if the central directory cannot be read.
    pub fn entry(&self, name: &str) -> Result<Option<PackageFile>> {
        let entries = self.entries()?;
        if let Some(index) = entries.iter().position(|file| file.full_name == name) {
            return Ok(entries.into_iter().nth(index));
        }
        Ok(entries
            .into_iter()
            .find(|file| file.full_name.eq_ignore_ascii_case(name)))
    }

    /// A [`PackageAssembly`] for every `.dll`, `.exe` and `.winmd` entry, resolving references
    /// through `resolver`.
    ///
    /// # Errors
    /// Returns an error if the central directory cannot be read.
    pub fn assemblies(&self, resolver: Arc<dyn AssemblyResolver>) -> Result<Vec<PackageAssembly>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(PackageFile::is_assembly)
            .map(|file| PackageAssembly::new(file, resolver.clone()))
            .collect())
    }

    /// The XML documentation shipped next to `assembly` (same path, `.xml` extension).
    ///
    /// # Errors
    /// Returns an error if the documentation entry exists but cannot be read or parsed.
    pub fn documentation(&self, assembly: &PackageFile) -> Result<Option<Arc<XmlDocumentation>>> {
        let Some((stem, _)) = assembly.full_name.rsplit_once('.') else {
            return Ok(None);
        };
        let Some(file) = self.entry(&format!("{stem}.xml"))? else {
            return Ok(None);
        };
        let Some(data) = file.contents()? else {
            return Ok(None);
        };
        Ok(Some(Arc::new(XmlDocumentation::parse(&data)?)))
    }
}

impl fmt::Debug for PackageArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageArchive").finish_non_exhaustive()
    }
}

/// Location of a file inside an opened archive.
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    archive: PackageArchive,
    index: usize,
}

impl ArchiveEntry {
    /// Decompress the entry into memory.
    ///
    /// # Errors
    /// Returns [`Error::Archive`] or [`Error::Io`] if decompression fails, and
    /// [`Error::LockError`] if another reader panicked while holding the archive.
    pub fn read(&self) -> Result<Vec<u8>> {
        let mut archive = self.archive.lock()?;
        let mut file = archive.by_index(self.index)?;

        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)?;
        trace!("decompressed {} ({} bytes)", file.name(), data.len());
        Ok(data)
    }
}

/// A file listed in a package.
#[derive(Clone, Debug)]
pub struct PackageFile {
    full_name: String,
    size: u64,
    entry: Option<ArchiveEntry>,
}

impl PackageFile {
    /// A file whose content is unavailable. Everything derived from it is absent.
    pub fn detached(full_name: impl Into<String>) -> Self {
        PackageFile {
            full_name: full_name.into(),
            size: 0,
            entry: None,
        }
    }

    /// Path inside the package, e.g. `lib/net8.0/Acme.Widgets.dll`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Last path segment, e.g. `Acme.Widgets.dll`.
    pub fn file_name(&self) -> &str {
        self.full_name
            .rsplit_once('/')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns true for files under `build/`, which are consumed by MSBuild rather than
    /// referenced by the consuming project.
    pub fn is_build_asset(&self) -> bool {
        self.full_name.starts_with("build/")
    }

    /// Returns true if the extension marks a .NET assembly.
    pub fn is_assembly(&self) -> bool {
        self.file_name()
            .rsplit_once('.')
            .is_some_and(|(_, extension)| {
                ASSEMBLY_EXTENSIONS
                    .iter()
                    .any(|known| extension.eq_ignore_ascii_case(known))
            })
    }

    /// The archive entry backing this file, if any.
    pub fn entry(&self) -> Option<&ArchiveEntry> {
        self.entry.as_ref()
    }

    /// Decompressed content, or `None` for a detached file.
    pub(crate) fn contents(&self) -> Result<Option<Vec<u8>>> {
        self.entry.as_ref().map(ArchiveEntry::read).transpose()
    }
}
