//! Insertion and replacement relative to existing content.

use crate::common::error::Result;
use crate::ooxml::docx::anchor::AnchorQuery;
use crate::ooxml::docx::insert::{self, Position};
use crate::ooxml::docx::numbering::ListKind;
use crate::ooxml::docx::replace::{self, ReplaceOutcome};
use crate::workspace::Workspace;

pub fn insert_heading(
    ws: &Workspace,
    filename: &str,
    anchor: &AnchorQuery,
    text: &str,
    level: u8,
    position: Position,
) -> Result<usize> {
    log::info!("insert_heading {} {:?}", filename, position);
    ws.edit(filename, |package| insert::insert_heading(package, anchor, text, level, position))
}

pub fn insert_paragraph(
    ws: &Workspace,
    filename: &str,
    anchor: &AnchorQuery,
    text: &str,
    style: Option<&str>,
    position: Position,
) -> Result<usize> {
    log::info!("insert_paragraph {} {:?}", filename, position);
    ws.edit(filename, |package| insert::insert_paragraph(package, anchor, text, style, position))
}

pub fn insert_list(
    ws: &Workspace,
    filename: &str,
    anchor: &AnchorQuery,
    items: &[String],
    kind: ListKind,
    level: u8,
    position: Position,
) -> Result<usize> {
    log::info!("insert_list {} {} item(s)", filename, items.len());
    ws.edit(filename, |package| insert::insert_list(package, anchor, items, kind, level, position))
}

pub fn replace_below_header(
    ws: &Workspace,
    filename: &str,
    header: &str,
    paragraphs: &[String],
    style: Option<&str>,
) -> Result<ReplaceOutcome> {
    log::info!("replace_below_header {} '{}'", filename, header);
    ws.edit(filename, |package| replace::replace_below_header(package, header, paragraphs, style))
}

pub fn replace_between_markers(
    ws: &Workspace,
    filename: &str,
    start_marker: &str,
    end_marker: Option<&str>,
    paragraphs: &[String],
    style: Option<&str>,
) -> Result<ReplaceOutcome> {
    log::info!("replace_between_markers {} '{}'", filename, start_marker);
    ws.edit(filename, |package| {
        replace::replace_between_markers(package, start_marker, end_marker, paragraphs, style)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::document::{add_heading, add_paragraph, get_document_text};
    use crate::ooxml::docx::format::RunFormat;
    use crate::Error;

    fn workspace(paragraphs: &[&str]) -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path());
        ws.create("doc", None, None).unwrap();
        for text in paragraphs {
            add_paragraph(&ws, "doc", text, None, &RunFormat::default()).unwrap();
        }
        (dir, ws)
    }

    #[test]
    fn test_insert_before_text_anchor() {
        let (_dir, ws) = workspace(&["Intro", "Body", "Conclusion"]);
        let index = insert_paragraph(&ws, "doc", &AnchorQuery::text("Body"), "New", None, Position::Before).unwrap();
        assert_eq!(index, 1);
        assert_eq!(get_document_text(&ws, "doc").unwrap(), "Intro\nNew\nBody\nConclusion");
    }

    #[test]
    fn test_insert_list_after_index() {
        let (_dir, ws) = workspace(&["Intro", "End"]);
        let items = vec!["one".to_string(), "two".to_string()];
        let index = insert_list(&ws, "doc", &AnchorQuery::index(0), &items, ListKind::Number, 1, Position::After).unwrap();
        assert_eq!(index, 1);
        assert_eq!(get_document_text(&ws, "doc").unwrap(), "Intro\none\ntwo\nEnd");
    }

    #[test]
    fn test_missing_anchor_leaves_document() {
        let (_dir, ws) = workspace(&["Intro"]);
        let err = insert_heading(&ws, "doc", &AnchorQuery::text("Nope"), "H", 2, Position::After);
        assert!(matches!(err, Err(Error::NotFound(_))));
        assert_eq!(get_document_text(&ws, "doc").unwrap(), "Intro");
    }

    #[test]
    fn test_replacements() {
        let (_dir, ws) = workspace(&[]);
        add_heading(&ws, "doc", "Scope", 1, &RunFormat::default(), false).unwrap();
        add_paragraph(&ws, "doc", "old", None, &RunFormat::default()).unwrap();
        add_heading(&ws, "doc", "Next", 1, &RunFormat::default(), false).unwrap();
        add_paragraph(&ws, "doc", "[start]", None, &RunFormat::default()).unwrap();
        add_paragraph(&ws, "doc", "stale", None, &RunFormat::default()).unwrap();
        add_paragraph(&ws, "doc", "[end]", None, &RunFormat::default()).unwrap();

        let outcome = replace_below_header(&ws, "doc", "Scope", &["new".to_string()], None).unwrap();
        assert_eq!((outcome.removed, outcome.inserted), (1, 1));

        let outcome =
            replace_between_markers(&ws, "doc", "[start]", Some("[end]"), &["fresh".to_string()], None).unwrap();
        assert_eq!(outcome.removed, 1);
        assert_eq!(
            get_document_text(&ws, "doc").unwrap(),
            "Scope\nnew\nNext\n[start]\nfresh\n[end]"
        );
    }
}
