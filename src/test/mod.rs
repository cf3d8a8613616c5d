//! Shared test fixtures.
//!
//! The factories build hand-made metadata models and in-memory packages, so the decompiler and
//! the adapter can be tested without shipping compiled assemblies.

pub mod factories;
