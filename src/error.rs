use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into two groups that are handled very differently by
/// [`crate::package::PackageAssembly`]:
///
/// ## Load Errors
/// - [`Error::Empty`] - The archive entry holds no bytes
/// - [`Error::Metadata`] - `dotscope` rejected the assembly image
/// - [`Error::Malformed`] - The image parsed but its metadata is inconsistent
/// - [`Error::Archive`] - The package (zip) container could not be read
/// - [`Error::Io`] - Reading from the archive or filesystem failed
///
/// These propagate out of the first access to the assembly definition and are cached, so every
/// later access observes the same error.
///
/// ## Decompilation Errors
/// - [`Error::TypeNotFound`] - The requested type does not exist in the main module
/// - [`Error::UnresolvedAssembly`] - A referenced assembly could not be resolved and resolution
///   errors are configured to be fatal
/// - [`Error::InvalidSignature`] - A member signature could not be decoded
/// - [`Error::Format`] - Writing the output text failed
///
/// These never reach the caller of the per-type code operations; they are rendered into an
/// inline `/* ... */` comment instead.
///
/// The enum is `Clone` because a failed lazy initialization is stored and handed out again on
/// every subsequent access.
///
/// # Examples
///
/// ```rust
/// use nuscope::{Error, package::{PackageAssembly, PackageFile}, reader::NullResolver};
/// use std::sync::Arc;
///
/// let assembly = PackageAssembly::new(PackageFile::detached("lib/net8.0/Missing.dll"), Arc::new(NullResolver));
/// match assembly.definition() {
///     Ok(None) => println!("entry has no content"),
///     Ok(Some(definition)) => println!("loaded {}", definition.name),
///     Err(Error::Metadata(message)) => eprintln!("not an assembly: {message}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Provided input was empty.
    ///
    /// The archive entry exists but decompressed to zero bytes.
    #[error("Provided input was empty")]
    Empty,

    /// The metadata library could not parse the assembly image.
    ///
    /// Wraps the message of a [`dotscope::Error`]; the original error is not `Clone`.
    #[error("{0}")]
    Metadata(String),

    /// The file is damaged and could not be converted into the assembly model.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The package archive could not be read.
    #[error("Archive error - {0}")]
    Archive(String),

    /// I/O error while reading an entry or a package file.
    #[error("{0}")]
    Io(String),

    /// A type name could not be parsed.
    #[error("Invalid type name - '{0}'")]
    InvalidTypeName(String),

    /// The requested type is not defined in the main module.
    #[error("Type '{0}' was not found")]
    TypeNotFound(String),

    /// A referenced assembly could not be located by the resolver.
    #[error("Failed to resolve assembly: '{0}'")]
    UnresolvedAssembly(String),

    /// A member signature could not be decoded.
    ///
    /// # Fields
    ///
    /// * `member` - The member whose signature is broken
    /// * `reason` - Why the signature could not be decoded
    #[error("Invalid signature on '{member}': {reason}")]
    InvalidSignature {
        /// Name of the member carrying the broken signature
        member: String,
        /// What went wrong while decoding it
        reason: String,
    },

    /// An XML documentation file could not be parsed.
    #[error("Invalid documentation file - {0}")]
    Documentation(String),

    /// Writing output text failed.
    #[error("Failed to format output")]
    Format,

    /// Failed to lock target.
    ///
    /// A thread panicked while holding the archive lock.
    #[error("Failed to lock target")]
    LockError,
}

impl From<dotscope::Error> for Error {
    fn from(error: dotscope::Error) -> Self {
        Error::Metadata(error.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(error: zip::result::ZipError) -> Self {
        Error::Archive(error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(_: std::fmt::Error) -> Self {
        Error::Format
    }
}

impl From<quick_xml::Error> for Error {
    fn from(error: quick_xml::Error) -> Self {
        Error::Documentation(error.to_string())
    }
}
