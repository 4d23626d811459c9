//! Footnote and endnote operations.

use crate::common::error::Result;
use crate::ooxml::docx::footnote::{self, ConversionReport, NoteKind, NoteSummary};
use crate::workspace::Workspace;
use serde::Serialize;

/// A note placed next to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacedNote {
    pub id: u32,
    pub paragraph_index: usize,
}

pub fn add_footnote(ws: &Workspace, filename: &str, paragraph_index: usize, text: &str) -> Result<u32> {
    log::info!("add_footnote {} paragraph {}", filename, paragraph_index);
    ws.edit(filename, |package| footnote::add_note(package, NoteKind::Footnote, paragraph_index, text))
}

pub fn add_endnote(ws: &Workspace, filename: &str, paragraph_index: usize, text: &str) -> Result<u32> {
    log::info!("add_endnote {} paragraph {}", filename, paragraph_index);
    ws.edit(filename, |package| footnote::add_note(package, NoteKind::Endnote, paragraph_index, text))
}

pub fn add_footnote_after_text(ws: &Workspace, filename: &str, search: &str, text: &str) -> Result<PlacedNote> {
    log::info!("add_footnote_after_text {} '{}'", filename, search);
    place(ws, filename, search, text, true)
}

pub fn add_footnote_before_text(ws: &Workspace, filename: &str, search: &str, text: &str) -> Result<PlacedNote> {
    log::info!("add_footnote_before_text {} '{}'", filename, search);
    place(ws, filename, search, text, false)
}

fn place(ws: &Workspace, filename: &str, search: &str, text: &str, after: bool) -> Result<PlacedNote> {
    ws.edit(filename, |package| {
        let (id, paragraph_index) = footnote::add_note_at_text(package, NoteKind::Footnote, search, text, after)?;
        Ok(PlacedNote { id, paragraph_index })
    })
}

pub fn convert_footnotes_to_endnotes(ws: &Workspace, filename: &str) -> Result<ConversionReport> {
    log::info!("convert_footnotes_to_endnotes {}", filename);
    ws.edit(filename, footnote::convert_footnotes_to_endnotes)
}

pub fn list_notes(ws: &Workspace, filename: &str, kind: NoteKind) -> Result<Vec<NoteSummary>> {
    log::info!("list_notes {} {:?}", filename, kind);
    ws.read(filename, |loaded| footnote::list_notes(loaded.view(), kind))
}
