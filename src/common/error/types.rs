//! Error type shared by every layer above the OPC package.
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docsmith operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Anchor, header, marker, paragraph or part absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cross-part references disagree (e.g. footnote reference without content)
    #[error("Structural inconsistency: {0}")]
    StructuralInconsistency(String),

    /// Password mismatch, or mutation attempted on a protected document
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Argument out of range or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Target cannot be written; raised before any mutation is attempted
    #[error("Cannot write '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// External PDF conversion failed
    #[error("PDF conversion failed: {0}")]
    Conversion(String),

    /// OPC package error
    #[error("Package error: {0}")]
    Package(#[from] crate::ooxml::opc::error::OpcError),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Not a Word package, or a part has an unexpected shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`Error`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    StructuralInconsistency,
    Authentication,
    Validation,
    Write,
    Conversion,
    Package,
    Xml,
    InvalidFormat,
    Config,
    Io,
}

impl Error {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::StructuralInconsistency(_) => ErrorKind::StructuralInconsistency,
            Error::Authentication(_) => ErrorKind::Authentication,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Write { .. } => ErrorKind::Write,
            Error::Conversion(_) => ErrorKind::Conversion,
            Error::Package(_) => ErrorKind::Package,
            Error::Xml(_) => ErrorKind::Xml,
            Error::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for docsmith operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::write("/tmp/a.docx", "read-only").kind(),
            ErrorKind::Write
        );
    }

    #[test]
    fn test_write_error_message() {
        let err = Error::write("/tmp/a.docx", "read-only");
        assert_eq!(err.to_string(), "Cannot write '/tmp/a.docx': read-only");
    }
}
