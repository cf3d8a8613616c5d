//! Factory methods for test data.

mod metadata;
mod package;

pub use metadata::*;
pub use package::*;
