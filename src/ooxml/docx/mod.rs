//! Word (.docx) document editing.
//!
//! The module is organized around these key types:
//! - [`DocxPackage`]: the package with its main document parsed
//! - [`LoadedPackage`]: a freshly loaded package, split by protection state
//! - [`Document`]: the body as an arena of blocks addressed by [`BlockId`]
//! - [`Paragraph`] and [`Table`]: body blocks
//! - [`AnchorResolver`]: text or index anchors to paragraph positions
//!
//! Mutations live in [`insert`], [`replace`], [`footnote`] and
//! [`protection`]; [`comment`] is read-only.
//!
//! # Example
//!
//! ```rust,no_run
//! use docsmith::ooxml::docx::{AnchorQuery, DocxPackage, Position, insert};
//!
//! let mut package = DocxPackage::open("report.docx")?;
//! let index = insert::insert_paragraph(
//!     &mut package,
//!     &AnchorQuery::text("Conclusion"),
//!     "One more thing.",
//!     None,
//!     Position::Before,
//! )?;
//! println!("inserted at paragraph {}", index);
//! std::fs::write("report.docx", package.to_bytes()?)?;
//! # Ok::<(), docsmith::Error>(())
//! ```

pub mod anchor;
pub mod comment;
pub mod document;
pub mod footnote;
pub mod format;
pub mod insert;
pub mod numbering;
pub mod package;
pub mod paragraph;
pub mod protection;
pub mod replace;
pub mod settings;
pub mod styles;
pub mod table;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use anchor::{Anchor, AnchorQuery, AnchorResolver, MatchOptions, Occurrence};
pub use comment::{CommentAnchor, CommentIndex, CommentRecord};
pub use document::{Block, BlockId, Document};
pub use footnote::{ConversionReport, NoteIdAllocator, NoteKind, NoteSummary};
pub use format::RunFormat;
pub use insert::Position;
pub use numbering::ListKind;
pub use package::{DocxPackage, LoadedPackage, ProtectedPackage};
pub use paragraph::Paragraph;
pub use protection::{ProtectionOptions, ProtectionStatus, SignatureReport, SignatureStatus};
pub use replace::ReplaceOutcome;
pub use settings::{EditRestriction, HashAlgorithm, ProtectionDescriptor};
pub use styles::Styles;
pub use table::{CellLocation, Table};
