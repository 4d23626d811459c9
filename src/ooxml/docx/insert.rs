//! Content insertion relative to an anchor paragraph.
//!
//! `Before` puts new blocks at the anchor's former index and shifts the
//! anchor and everything after it; `After` puts them at `anchor + 1` and
//! leaves everything up to the anchor in place. Every insertion returns the
//! paragraph index of the first new block.

use crate::common::error::{Error, Result};
use crate::common::xml::XmlElement;
use crate::ooxml::docx::anchor::{AnchorQuery, AnchorResolver};
use crate::ooxml::docx::document::{Block, BlockId};
use crate::ooxml::docx::format::{PPR_ORDER, RunFormat, set_ordered};
use crate::ooxml::docx::numbering::{ListKind, Numbering, set_numbering};
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::paragraph::{Paragraph, make_run};
use crate::ooxml::docx::styles::Styles;
use std::str::FromStr;

/// Paragraph properties that never carry over to inserted content.
const NOT_INHERITED: &[&str] = &["numPr", "sectPr", "pPrChange"];

/// Where new content goes relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            _ => Err(Error::Validation(format!(
                "position must be 'before' or 'after', got '{}'",
                s
            ))),
        }
    }
}

/// Insert a heading of `level` near the anchor.
pub fn insert_heading(
    package: &mut DocxPackage,
    anchor: &AnchorQuery,
    text: &str,
    level: u8,
    position: Position,
) -> Result<usize> {
    let anchor_id = resolve(package, anchor)?;
    let mut styles = Styles::from_package(package)?;
    let style_id = styles.ensure_heading(level)?;

    let mut para = Paragraph::with_text(text);
    para.set_style(&style_id);

    let index = place(package, anchor_id, vec![para], position)?;
    styles.save_to(package)?;
    Ok(index)
}

/// Insert a paragraph near the anchor.
///
/// Without a style the paragraph takes the anchor's paragraph properties
/// and first-run formatting; a heading anchor lends everything but its
/// heading style.
pub fn insert_paragraph(
    package: &mut DocxPackage,
    anchor: &AnchorQuery,
    text: &str,
    style: Option<&str>,
    position: Position,
) -> Result<usize> {
    let anchor_id = resolve(package, anchor)?;
    let mut styles = Styles::from_package(package)?;

    let para = match style {
        Some(style) => {
            let style_id = styles.resolve_or_create(style)?;
            let mut para = Paragraph::with_text(text);
            para.set_style(&style_id);
            para
        },
        None => inherit_from(package, anchor_id, &styles, text)?,
    };

    let index = place(package, anchor_id, vec![para], position)?;
    styles.save_to(package)?;
    Ok(index)
}

/// Insert a list of `items` near the anchor. `level` is 1-based.
pub fn insert_list(
    package: &mut DocxPackage,
    anchor: &AnchorQuery,
    items: &[String],
    kind: ListKind,
    level: u8,
    position: Position,
) -> Result<usize> {
    if items.is_empty() {
        return Err(Error::Validation("list needs at least one item".to_string()));
    }
    let anchor_id = resolve(package, anchor)?;

    let mut numbering = Numbering::from_package(package)?;
    let (num_id, ilvl) = numbering.resolve_or_create(kind, level)?;
    let mut styles = Styles::from_package(package)?;
    let style_id = styles.ensure_list_paragraph();

    let paragraphs = items
        .iter()
        .map(|item| {
            let mut para = Paragraph::with_text(item);
            para.set_style(&style_id);
            set_numbering(para.properties_mut(), num_id, ilvl);
            para
        })
        .collect();

    let index = place(package, anchor_id, paragraphs, position)?;
    numbering.save_to(package)?;
    styles.save_to(package)?;
    Ok(index)
}

/// A heading paragraph with optional direct formatting and bottom border.
pub fn heading_paragraph(
    styles: &mut Styles,
    text: &str,
    level: u8,
    format: &RunFormat,
    border_bottom: bool,
) -> Result<Paragraph> {
    let style_id = styles.ensure_heading(level)?;
    let mut para = styled_paragraph(text, format)?;
    para.set_style(&style_id);
    if border_bottom {
        let border = XmlElement::new("w:pBdr").with_child(
            XmlElement::new("w:bottom")
                .with_attr("w:val", "single")
                .with_attr("w:sz", "6")
                .with_attr("w:space", "1")
                .with_attr("w:color", "auto"),
        );
        set_ordered(para.properties_mut(), border, PPR_ORDER);
    }
    Ok(para)
}

/// A single-run paragraph carrying `format`.
pub fn styled_paragraph(text: &str, format: &RunFormat) -> Result<Paragraph> {
    let mut para = Paragraph::new();
    if !text.is_empty() {
        let mut run = make_run(text, None);
        format.apply_to_run(&mut run)?;
        para.push_run(run);
    }
    Ok(para)
}

fn resolve(package: &DocxPackage, anchor: &AnchorQuery) -> Result<BlockId> {
    Ok(AnchorResolver::new(package.document()).resolve(anchor)?.id)
}

fn inherit_from(
    package: &DocxPackage,
    anchor_id: BlockId,
    styles: &Styles,
    text: &str,
) -> Result<Paragraph> {
    let anchor = package.document().paragraph_by_id(anchor_id).ok_or_else(|| {
        Error::StructuralInconsistency(format!("anchor {:?} is not a paragraph", anchor_id))
    })?;

    let mut para = Paragraph::with_text("");
    if let Some(ppr) = anchor.properties() {
        let mut ppr = ppr.clone();
        for local in NOT_INHERITED {
            ppr.remove_children(local);
        }
        if styles.paragraph_heading_level(anchor).is_some() {
            ppr.remove_children("pStyle");
            ppr.remove_children("outlineLvl");
        }
        if ppr.elements().next().is_some() {
            para.set_properties(ppr);
        }
    }
    if !text.is_empty() {
        para.push_run(make_run(text, anchor.first_run_properties()));
    }
    Ok(para)
}

fn place(
    package: &mut DocxPackage,
    anchor_id: BlockId,
    paragraphs: Vec<Paragraph>,
    position: Position,
) -> Result<usize> {
    let blocks = paragraphs.into_iter().map(Block::Paragraph).collect();
    let doc = package.document_mut();
    let ids = match position {
        Position::Before => doc.insert_before(anchor_id, blocks)?,
        Position::After => doc.insert_after(anchor_id, blocks)?,
    };
    let first = ids
        .first()
        .copied()
        .ok_or_else(|| Error::Validation("nothing to insert".to_string()))?;
    let index = doc.paragraph_index_of(first).ok_or_else(|| {
        Error::StructuralInconsistency("inserted paragraph is not in the body".to_string())
    })?;
    log::debug!("inserted {} block(s) {:?} anchor, first at index {}", ids.len(), position, index);
    Ok(index)
}
