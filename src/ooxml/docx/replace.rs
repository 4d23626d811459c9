//! Block replacement: delete a span of body blocks and put new paragraphs
//! in its place.
//!
//! Spans are bounded either by a heading (everything up to the next heading
//! of the same or a higher level) or by a pair of marker paragraphs that are
//! themselves kept. The trailing section properties are never part of a span.

use crate::common::error::{Error, Result};
use crate::ooxml::docx::document::{Block, BlockId, Document};
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::paragraph::Paragraph;
use crate::ooxml::docx::styles::Styles;
use serde::Serialize;

/// Result of a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplaceOutcome {
    /// Blocks deleted from the span
    pub removed: usize,
    /// Paragraphs inserted
    pub inserted: usize,
    /// Paragraph index of the first inserted paragraph
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_index: Option<usize>,
}

/// Replace the content below the heading whose trimmed text equals
/// `header`, up to the next heading of equal or higher level.
pub fn replace_below_header(
    package: &mut DocxPackage,
    header: &str,
    paragraphs: &[String],
    style: Option<&str>,
) -> Result<ReplaceOutcome> {
    let wanted = header.trim();
    if wanted.is_empty() {
        return Err(Error::Validation("header text must not be empty".to_string()));
    }
    let mut styles = Styles::from_package(package)?;

    let doc = package.document();
    let mut heading: Option<(BlockId, u8)> = None;
    let mut span = Vec::new();
    for (id, block) in doc.iter() {
        let level = block
            .as_paragraph()
            .and_then(|p| styles.paragraph_heading_level(p));
        match heading {
            None => {
                if let (Some(level), Some(para)) = (level, block.as_paragraph())
                    && para.text().trim() == wanted
                {
                    heading = Some((id, level));
                }
            },
            Some((_, header_level)) => {
                if level.is_some_and(|l| l <= header_level) || doc.is_section_properties(id) {
                    break;
                }
                span.push(id);
            },
        }
    }
    let (header_id, _) = heading
        .ok_or_else(|| Error::NotFound(format!("heading '{}' not found", wanted)))?;

    let replacement = build_paragraphs(&mut styles, paragraphs, style)?;
    let outcome = splice(package.document_mut(), header_id, &span, replacement)?;
    styles.save_to(package)?;
    log::debug!("replaced {} block(s) below heading '{}'", outcome.removed, wanted);
    Ok(outcome)
}

/// Replace everything strictly between the first paragraph containing
/// `start_marker` and the first following paragraph containing
/// `end_marker`. Without an end marker the span runs to the end of the
/// document. Markers stay in place.
pub fn replace_between_markers(
    package: &mut DocxPackage,
    start_marker: &str,
    end_marker: Option<&str>,
    paragraphs: &[String],
    style: Option<&str>,
) -> Result<ReplaceOutcome> {
    let start_marker = start_marker.trim();
    let end_marker = end_marker.map(str::trim);
    if start_marker.is_empty() || end_marker.is_some_and(str::is_empty) {
        return Err(Error::Validation("markers must not be empty".to_string()));
    }
    let contains = |block: &Block, marker: &str| {
        block
            .as_paragraph()
            .is_some_and(|p| p.text().trim().contains(marker))
    };

    let doc = package.document();
    let mut start = None;
    let mut end_found = false;
    let mut span = Vec::new();
    for (id, block) in doc.iter() {
        if start.is_none() {
            if contains(block, start_marker) {
                start = Some(id);
            }
            continue;
        }
        if let Some(end) = end_marker
            && contains(block, end)
        {
            end_found = true;
            break;
        }
        if doc.is_section_properties(id) {
            break;
        }
        span.push(id);
    }
    let start_id =
        start.ok_or_else(|| Error::NotFound(format!("start marker '{}' not found", start_marker)))?;
    if let Some(end) = end_marker
        && !end_found
    {
        return Err(Error::NotFound(format!(
            "end marker '{}' not found after '{}'",
            end, start_marker
        )));
    }

    if span.is_empty() && paragraphs.is_empty() {
        return Ok(ReplaceOutcome {
            removed: 0,
            inserted: 0,
            first_index: None,
        });
    }

    let mut styles = Styles::from_package(package)?;
    let replacement = build_paragraphs(&mut styles, paragraphs, style)?;
    let outcome = splice(package.document_mut(), start_id, &span, replacement)?;
    styles.save_to(package)?;
    log::debug!("replaced {} block(s) after marker '{}'", outcome.removed, start_marker);
    Ok(outcome)
}

fn build_paragraphs(
    styles: &mut Styles,
    paragraphs: &[String],
    style: Option<&str>,
) -> Result<Vec<Block>> {
    let style_id = style.map(|s| styles.resolve_or_create(s)).transpose()?;
    Ok(paragraphs
        .iter()
        .map(|text| {
            let mut para = Paragraph::with_text(text);
            if let Some(id) = &style_id {
                para.set_style(id);
            }
            Block::Paragraph(para)
        })
        .collect())
}

/// Remove `span` and insert `replacement` right after `after`.
fn splice(
    doc: &mut Document,
    after: BlockId,
    span: &[BlockId],
    replacement: Vec<Block>,
) -> Result<ReplaceOutcome> {
    for id in span {
        doc.remove(*id);
    }
    let inserted = replacement.len();
    let ids = doc.insert_after(after, replacement)?;
    let first_index = ids.first().and_then(|id| doc.paragraph_index_of(*id));
    Ok(ReplaceOutcome {
        removed: span.len(),
        inserted,
        first_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::table::Table;
    use crate::ooxml::docx::testing::{package_with, texts};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_replace_below_header_stops_at_same_level() {
        let mut package = package_with(&[
            "# Intro", "old 1", "## Detail", "old 2", "# Next", "keep",
        ]);
        let outcome =
            replace_below_header(&mut package, " Intro ", &strings(&["fresh"]), None).unwrap();
        assert_eq!(outcome.removed, 3);
        assert_eq!(outcome.first_index, Some(1));
        assert_eq!(texts(&package), ["Intro", "fresh", "Next", "keep"]);
    }

    #[test]
    fn test_replace_below_header_to_end_keeps_section() {
        let mut package = package_with(&["# Only", "a", "b"]);
        let table = Table::new(1, 1, &[]).unwrap();
        package.document_mut().append(Block::Table(table));

        let outcome = replace_below_header(&mut package, "Only", &strings(&["x", "y"]), None).unwrap();
        assert_eq!(outcome.removed, 3);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(texts(&package), ["Only", "x", "y"]);
        let (last, _) = package.document().iter().last().unwrap();
        assert!(package.document().is_section_properties(last));
    }

    #[test]
    fn test_replace_below_missing_header() {
        let mut package = package_with(&["Intro"]);
        let err = replace_below_header(&mut package, "Intro", &[], None);
        assert!(matches!(err, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_replace_between_markers() {
        let mut package = package_with(&["a", "[START]", "old", "older", "[END]", "z"]);
        let outcome = replace_between_markers(
            &mut package,
            "[START]",
            Some("[END]"),
            &strings(&["new"]),
            None,
        )
        .unwrap();
        assert_eq!(outcome.removed, 2);
        assert_eq!(texts(&package), ["a", "[START]", "new", "[END]", "z"]);
    }

    #[test]
    fn test_markers_pair_first_start_with_following_end() {
        let mut package = package_with(&["[END]", "[S]", "x", "[END]", "[S]", "y", "[END]"]);
        replace_between_markers(&mut package, "[S]", Some("[END]"), &strings(&["n"]), None).unwrap();
        assert_eq!(texts(&package), ["[END]", "[S]", "n", "[END]", "[S]", "y", "[END]"]);
    }

    #[test]
    fn test_empty_span_is_noop() {
        let mut package = package_with(&["[S]", "[E]"]);
        let before = package.document().to_xml();
        let outcome = replace_between_markers(&mut package, "[S]", Some("[E]"), &[], None).unwrap();
        assert_eq!(outcome.removed + outcome.inserted, 0);
        assert_eq!(package.document().to_xml(), before);
    }

    #[test]
    fn test_marker_errors() {
        let mut package = package_with(&["[S]", "x"]);
        assert!(matches!(
            replace_between_markers(&mut package, "[S]", Some("[E]"), &[], None),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            replace_between_markers(&mut package, " ", None, &[], None),
            Err(Error::Validation(_))
        ));
        let outcome = replace_between_markers(&mut package, "[S]", None, &strings(&["tail"]), None).unwrap();
        assert_eq!(outcome.removed, 1);
        assert_eq!(texts(&package), ["[S]", "tail"]);
    }
}
