//! Common types and utilities shared across the package and document layers.

// Submodule declarations
pub mod error;
pub mod xml;

// Re-exports for convenience
pub use error::{Error, ErrorKind, Result};
