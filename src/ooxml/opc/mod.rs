/// Open Packaging Conventions (OPC) implementation.
///
/// The ZIP container, content types and the relationships graph that hold
/// the parts of a WordprocessingML package:
///
/// - Package structure (parts, relationships)
/// - Content type discovery and re-emission
/// - ZIP-based physical packaging via the `zip` crate
pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::Part;
pub use rel::{Relationship, Relationships};
