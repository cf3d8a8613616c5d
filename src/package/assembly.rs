//! Lazy metadata and decompiled code for one assembly in a package.

use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::{
    decompiler::{CodeView, Decompiler, DecompilerSettings},
    metadata::{AssemblyDefinition, FullTypeName},
    package::PackageFile,
    reader::{AssemblyReader, AssemblyResolver, CilReader, ReaderParameters},
    Result,
};

/// Text returned for a type when the assembly has no content to decompile.
pub const NO_DECOMPILER: &str = "// No decompiler available";

type Lazy<T> = OnceLock<Result<Option<Arc<T>>>>;

/// An assembly entry of a package, parsed and decompiled on demand.
///
/// Three values are computed at most once and shared afterwards: the assembly definition, the
/// interface-view decompiler and the full-view decompiler. A file without content yields
/// `None` for all three. A load failure is cached as well, so every later access reports the
/// same error without reading the entry again.
///
/// A file has no content only when it is [`PackageFile::detached`] from any archive. A
/// zero-byte archive entry is read like any other and fails to parse with
/// [`crate::Error::Empty`].
///
/// Cloning is cheap and clones share the cached values.
#[derive(Clone)]
pub struct PackageAssembly {
    inner: Arc<Inner>,
}

struct Inner {
    file: PackageFile,
    reader: Arc<dyn AssemblyReader>,
    parameters: ReaderParameters,
    definition: Lazy<AssemblyDefinition>,
    interface: Lazy<Decompiler>,
    full: Lazy<Decompiler>,
}

impl PackageAssembly {
    /// Wrap `file`, reading it with [`CilReader`] and resolving references through `resolver`.
    pub fn new(file: PackageFile, resolver: Arc<dyn AssemblyResolver>) -> Self {
        Self::with_reader(file, Arc::new(CilReader), ReaderParameters::new(resolver))
    }

    /// Wrap `file`, reading it with `reader`.
    pub fn with_reader(
        file: PackageFile,
        reader: Arc<dyn AssemblyReader>,
        parameters: ReaderParameters,
    ) -> Self {
        PackageAssembly {
            inner: Arc::new(Inner {
                file,
                reader,
                parameters,
                definition: OnceLock::new(),
                interface: OnceLock::new(),
                full: OnceLock::new(),
            }),
        }
    }

    /// The package file this assembly is read from.
    pub fn file(&self) -> &PackageFile {
        &self.inner.file
    }

    /// The parsed assembly, or `None` if the file has no content.
    ///
    /// The first call reads and parses the entry; every call returns the same `Arc`.
    ///
    /// # Errors
    /// Returns the error of the first read or parse, on this and every later call.
    pub fn definition(&self) -> Result<Option<Arc<AssemblyDefinition>>> {
        self.inner
            .definition
            .get_or_init(|| self.inner.load())
            .clone()
    }

    /// The decompiler for `view` over the assembly's main module, or `None` if the file has no
    /// content.
    ///
    /// # Errors
    /// Returns the error of [`PackageAssembly::definition`].
    pub fn decompiler(&self, view: CodeView) -> Result<Option<Arc<Decompiler>>> {
        let cell = match view {
            CodeView::Interface => &self.inner.interface,
            CodeView::Full => &self.inner.full,
        };

        cell.get_or_init(|| {
            let Some(definition) = self.definition()? else {
                return Ok(None);
            };
            debug!("building {view} decompiler for {}", self.inner.file.full_name());
            Ok(Some(Arc::new(Decompiler::new(
                definition.main_module.clone(),
                DecompilerSettings::for_view(view),
            ))))
        })
        .clone()
    }

    /// Decompiled source of `name`, with member bodies.
    pub async fn type_code(&self, name: &FullTypeName) -> String {
        self.code(CodeView::Full, name).await
    }

    /// Declarations of `name`, without member bodies.
    pub async fn type_interface_code(&self, name: &FullTypeName) -> String {
        self.code(CodeView::Interface, name).await
    }

    /// Text of `name` in `view`.
    ///
    /// Runs on tokio's blocking pool and never fails: a missing assembly yields
    /// [`NO_DECOMPILER`], and any error, including a panic of the worker, is returned as a
    /// `/* ... */` comment holding its message.
    pub async fn code(&self, view: CodeView, name: &FullTypeName) -> String {
        let assembly = self.clone();
        let name = name.clone();

        let task = tokio::task::spawn_blocking(move || assembly.code_blocking(view, &name));
        match task.await {
            Ok(text) => text,
            Err(error) => {
                warn!("decompilation worker failed: {error}");
                comment(&error.to_string())
            }
        }
    }

    fn code_blocking(&self, view: CodeView, name: &FullTypeName) -> String {
        let decompiler = match self.decompiler(view) {
            Ok(Some(decompiler)) => decompiler,
            Ok(None) => return NO_DECOMPILER.to_string(),
            Err(error) => return comment(&error.to_string()),
        };

        match decompiler.decompile_type_as_string(name) {
            Ok(text) => text,
            Err(error) => {
                debug!("cannot decompile {name}: {error}");
                comment(&error.to_string())
            }
        }
    }
}

impl Inner {
    fn load(&self) -> Result<Option<Arc<AssemblyDefinition>>> {
        let Some(data) = self.file.contents()? else {
            debug!("{} has no content", self.file.full_name());
            return Ok(None);
        };

        debug!("reading {} ({} bytes)", self.file.full_name(), data.len());
        match self.reader.read(data, &self.parameters) {
            Ok(definition) => Ok(Some(Arc::new(definition))),
            Err(error) => {
                warn!("failed to read {}: {error}", self.file.full_name());
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for PackageAssembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageAssembly")
            .field("file", &self.inner.file)
            .field("loaded", &self.inner.definition.get().is_some())
            .finish_non_exhaustive()
    }
}

/// `message` as a block comment, with `*/` broken up so the comment stays closed.
fn comment(message: &str) -> String {
    format!("/* {} */", message.replace("*/", "* /"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        package::PackageArchive,
        reader::NullResolver,
        test::factories::{nupkg, widget_assembly},
        Error,
    };

    struct StubReader {
        reads: AtomicUsize,
        fail: bool,
    }

    impl AssemblyReader for StubReader {
        fn read(&self, _data: Vec<u8>, _parameters: &ReaderParameters) -> Result<AssemblyDefinition> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(malformed_error!("no metadata root */ here"));
            }
            Ok(widget_assembly())
        }
    }

    fn assembly(fail: bool) -> (PackageAssembly, Arc<StubReader>) {
        let archive = PackageArchive::open(nupkg(&[("lib/net8.0/Acme.Widgets.dll", b"MZ")])).unwrap();
        let file = archive.entry("lib/net8.0/Acme.Widgets.dll").unwrap().unwrap();
        let reader = Arc::new(StubReader {
            reads: AtomicUsize::new(0),
            fail,
        });
        let assembly = PackageAssembly::with_reader(
            file,
            reader.clone(),
            ReaderParameters::new(Arc::new(NullResolver)),
        );
        (assembly, reader)
    }

    #[test]
    fn comment_escapes_terminator() {
        assert_eq!(comment("a */ b"), "/* a * / b */");
    }

    #[test]
    fn definition_is_shared() {
        let (assembly, reader) = assembly(false);
        let first = assembly.definition().unwrap().unwrap();
        let second = assembly.definition().unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decompilers_per_view() {
        let (assembly, _) = assembly(false);
        let interface = assembly.decompiler(CodeView::Interface).unwrap().unwrap();
        let full = assembly.decompiler(CodeView::Full).unwrap().unwrap();

        assert!(!interface.settings().decompile_member_bodies);
        assert!(full.settings().decompile_member_bodies);
        assert!(Arc::ptr_eq(
            &interface,
            &assembly.decompiler(CodeView::Interface).unwrap().unwrap()
        ));
        assert!(Arc::ptr_eq(interface.module(), full.module()));
    }

    #[test]
    fn failure_is_cached() {
        let (assembly, reader) = assembly(true);
        let first = assembly.definition().unwrap_err();
        let second = assembly.definition().unwrap_err();

        assert_eq!(first, second);
        assert!(matches!(first, Error::Malformed { .. }));
        assert_eq!(assembly.decompiler(CodeView::Full).unwrap_err(), first);
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_becomes_comment() {
        let (assembly, _) = assembly(true);
        let text = assembly.code_blocking(CodeView::Full, &FullTypeName::new("Acme", "Widget"));

        assert!(text.starts_with("/* "));
        assert!(text.contains("no metadata root * / here"));
        assert!(text.ends_with(" */"));
    }

    #[test]
    fn detached_file() {
        let assembly = PackageAssembly::new(
            PackageFile::detached("lib/net8.0/Missing.dll"),
            Arc::new(NullResolver),
        );
        assert!(matches!(assembly.definition(), Ok(None)));
        assert!(matches!(assembly.decompiler(CodeView::Interface), Ok(None)));
        assert_eq!(
            assembly.code_blocking(CodeView::Interface, &FullTypeName::new("Acme", "Widget")),
            NO_DECOMPILER
        );
    }
}
