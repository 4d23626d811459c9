//! Docsmith - anchor-based editing of Word (.docx) documents
//!
//! This library edits existing `.docx` packages in place: content is placed
//! relative to an anchor paragraph found by text or index, whole sections
//! are swapped out below a heading or between marker paragraphs, footnotes
//! and endnotes are added and converted, and documents are protected with a
//! password or fingerprinted with a content signature.
//!
//! # Features
//!
//! - **Anchor resolution**: first or all text matches, including table cells
//! - **Content insertion**: headings, paragraphs and lists before or after an anchor
//! - **Block replacement**: below a heading or between two markers
//! - **Notes**: footnotes and endnotes with consistent ids and relationships
//! - **Protection**: ECMA-376 password hashes, signatures over document text
//! - **Comments**: comments with their anchors, reply and resolved state
//!
//! Every mutation loads the whole package, edits the in-memory model and
//! writes the file back atomically; a failed operation never leaves a
//! half-written document behind.
//!
//! # Example - Inserting before an anchor
//!
//! ```no_run
//! use docsmith::ooxml::docx::{AnchorQuery, Position};
//! use docsmith::{Workspace, ops};
//!
//! # fn main() -> docsmith::Result<()> {
//! let ws = Workspace::open("documents");
//! let index = ops::insert_paragraph(
//!     &ws,
//!     "report",
//!     &AnchorQuery::text("Conclusion"),
//!     "One more finding.",
//!     None,
//!     Position::Before,
//! )?;
//! println!("inserted at paragraph {}", index);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reporting instead of failing
//!
//! ```no_run
//! use docsmith::{Workspace, ops};
//!
//! let ws = Workspace::open("documents");
//! let message = ops::report_display("add_footnote", ops::add_footnote(&ws, "report", 0, "See appendix."));
//! println!("{}", message);
//! ```

/// Document builders used for creating new packages
pub mod builder;

/// Common types shared by every layer
pub mod common;

/// Runtime configuration
pub mod config;

/// PDF conversion
pub mod convert;

/// OOXML (Office Open XML) packages and the Word document model
pub mod ooxml;

/// Operations exposed to callers
pub mod ops;

/// Working directory, locking and persistence
pub mod workspace;

pub use common::error::{Error, ErrorKind, Result};
pub use config::Config;
pub use workspace::Workspace;
