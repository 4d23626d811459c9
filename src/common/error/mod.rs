//! Unified error types for docsmith.
//!
//! Every public operation returns [`Result`]; the variants mirror the failure
//! taxonomy callers are expected to branch on (missing anchors, inconsistent
//! parts, bad passwords, invalid arguments, unwritable targets, failed PDF
//! conversion), plus the plumbing errors of the package layer.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, ErrorKind, Result};
