//! Operations on documents in a [`Workspace`](crate::workspace::Workspace).
//!
//! Each operation takes the workspace and a filename, runs one full load,
//! mutate and persist cycle (or a plain load for queries) and returns a
//! typed result. [`report`] turns those results into messages.

pub mod anchored;
pub mod comments;
pub mod document;
pub mod notes;
pub mod protection;
pub mod report;

pub use anchored::*;
pub use comments::*;
pub use document::*;
pub use notes::*;
pub use protection::*;
pub use report::{report, report_display, report_yaml};
