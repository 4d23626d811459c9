/// Footnotes and endnotes: id allocation, reference runs and note entries.
///
/// Note parts are cross-checked against the main document before any
/// change: a relationship without its part, a part without its
/// relationship, or references and entries that do not pair up one to one
/// are reported as [`Error::StructuralInconsistency`] and never repaired.
/// Separator and continuation entries (any `w:type` other than `normal`)
/// take no part in the pairing and are never converted.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement};
use crate::ooxml::docx::anchor::{AnchorResolver, MatchOptions};
use crate::ooxml::docx::document::Document;
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::paragraph::make_t;
use crate::ooxml::docx::styles::Styles;
use crate::ooxml::docx::template::{default_endnotes_xml, default_footnotes_xml};
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use serde::Serialize;
use std::collections::BTreeMap;

/// Which note story a note lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    fn reltype(self) -> &'static str {
        match self {
            NoteKind::Footnote => rt::FOOTNOTES,
            NoteKind::Endnote => rt::ENDNOTES,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            NoteKind::Footnote => ct::WML_FOOTNOTES,
            NoteKind::Endnote => ct::WML_ENDNOTES,
        }
    }

    fn default_partname(self) -> &'static str {
        match self {
            NoteKind::Footnote => "/word/footnotes.xml",
            NoteKind::Endnote => "/word/endnotes.xml",
        }
    }

    fn template(self) -> &'static str {
        match self {
            NoteKind::Footnote => default_footnotes_xml(),
            NoteKind::Endnote => default_endnotes_xml(),
        }
    }

    /// Local name of one entry in the notes part.
    fn entry(self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnote",
            NoteKind::Endnote => "endnote",
        }
    }

    /// Local name of the reference element in the body.
    fn reference(self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnoteReference",
            NoteKind::Endnote => "endnoteReference",
        }
    }

    /// Local name of the number mark inside an entry.
    fn mark(self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnoteRef",
            NoteKind::Endnote => "endnoteRef",
        }
    }

    fn style_prefix(self) -> &'static str {
        match self {
            NoteKind::Footnote => "Footnote",
            NoteKind::Endnote => "Endnote",
        }
    }
}

/// Hands out note ids above the largest id already in use. Owned by a
/// single mutation; never shared between calls.
#[derive(Debug)]
pub struct NoteIdAllocator {
    next: u32,
}

impl NoteIdAllocator {
    pub fn from_max(max: Option<u32>) -> Self {
        Self {
            next: max.map_or(1, |m| m + 1),
        }
    }

    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// One footnote or endnote as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub id: u32,
    pub kind: NoteKind,
    pub text: String,
}

/// Outcome of converting footnotes into endnotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub converted: usize,
    /// `(footnote id, endnote id)` pairs in footnote order
    pub mapping: Vec<(u32, u32)>,
}

/// The `w:type` of a note entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteType {
    Normal,
    Separator,
    ContinuationSeparator,
    ContinuationNotice,
}

impl NoteType {
    fn of(entry: &XmlElement) -> Self {
        match entry.attr("w:type") {
            Some("separator") => Self::Separator,
            Some("continuationSeparator") => Self::ContinuationSeparator,
            Some("continuationNotice") => Self::ContinuationNotice,
            _ => Self::Normal,
        }
    }

    #[inline]
    fn is_normal(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Id of a content entry: a `normal` note with a positive id.
fn content_id(entry: &XmlElement) -> Option<u32> {
    if !NoteType::of(entry).is_normal() {
        return None;
    }
    note_id(entry)
        .filter(|id| *id > 0)
        .and_then(|id| u32::try_from(id).ok())
}

fn note_id(el: &XmlElement) -> Option<i64> {
    el.attr("w:id")
        .and_then(|v| atoi_simd::parse::<i64>(v.trim().as_bytes()).ok())
}

/// A parsed notes part, held in memory until saved.
#[derive(Debug, Clone)]
struct NotesPart {
    kind: NoteKind,
    partname: Option<PackURI>,
    xml: XmlDocument,
}

impl NotesPart {
    /// Load the notes part of `kind`, checking it against the document.
    fn load(package: &DocxPackage, kind: NoteKind) -> Result<Self> {
        let partname = package.related_partname(kind.reltype());
        let xml = match &partname {
            Some(_) => package.read_related_xml(kind.reltype())?.ok_or_else(|| {
                Error::StructuralInconsistency(format!("{} part vanished", kind.entry()))
            })?,
            None => {
                if let Some(orphan) = package
                    .opc()
                    .iter_parts()
                    .find(|part| part.content_type() == kind.content_type())
                {
                    return Err(Error::StructuralInconsistency(format!(
                        "part {} exists but the main document has no {} relationship",
                        orphan.partname(),
                        kind.entry()
                    )));
                }
                XmlDocument::parse(kind.template().as_bytes())?
            },
        };
        let part = Self { kind, partname, xml };
        part.check_pairing(package.document())?;
        Ok(part)
    }

    fn entries(&self) -> impl Iterator<Item = &XmlElement> {
        let entry = self.kind.entry();
        self.xml.root.elements().filter(move |el| el.is(entry))
    }

    /// Content entries by id; separators and notices are left out.
    fn content_entries(&self) -> BTreeMap<u32, &XmlElement> {
        self.entries()
            .filter_map(|el| Some((content_id(el)?, el)))
            .collect()
    }

    /// Largest positive id in the part, separators included, since ids are
    /// unique across every entry of the part.
    fn max_id(&self) -> Option<u32> {
        self.entries()
            .filter_map(note_id)
            .filter(|id| *id > 0)
            .max()
            .and_then(|id| u32::try_from(id).ok())
    }

    fn check_pairing(&self, doc: &Document) -> Result<()> {
        let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
        for id in reference_ids(doc, self.kind)? {
            *seen.entry(id).or_default() += 1;
        }

        let mut entry_counts: BTreeMap<u32, usize> = BTreeMap::new();
        for id in self.entries().filter_map(content_id) {
            *entry_counts.entry(id).or_default() += 1;
        }

        for (id, count) in &seen {
            match entry_counts.get(id) {
                None => {
                    return Err(Error::StructuralInconsistency(format!(
                        "{} reference {} has no matching entry",
                        self.kind.entry(),
                        id
                    )));
                },
                Some(1) if *count == 1 => {},
                Some(_) => {
                    return Err(Error::StructuralInconsistency(format!(
                        "{} {} is referenced {} time(s) and defined {} time(s)",
                        self.kind.entry(),
                        id,
                        count,
                        entry_counts[id]
                    )));
                },
            }
        }
        if let Some(id) = entry_counts.keys().find(|id| !seen.contains_key(id)) {
            return Err(Error::StructuralInconsistency(format!(
                "{} entry {} is never referenced",
                self.kind.entry(),
                id
            )));
        }
        Ok(())
    }

    fn push_entry(&mut self, id: u32, text: &str, text_style: &str, ref_style: &str) {
        let mut para = XmlElement::new("w:p")
            .with_child(
                XmlElement::new("w:pPr")
                    .with_child(XmlElement::new("w:pStyle").with_attr("w:val", text_style)),
            )
            .with_child(
                XmlElement::new("w:r")
                    .with_child(
                        XmlElement::new("w:rPr")
                            .with_child(XmlElement::new("w:rStyle").with_attr("w:val", ref_style)),
                    )
                    .with_child(XmlElement::new(format!("w:{}", self.kind.mark()))),
            );
        if !text.is_empty() {
            para.push(XmlElement::new("w:r").with_child(make_t(&format!(" {}", text))));
        }
        let entry = XmlElement::new(format!("w:{}", self.kind.entry()))
            .with_attr("w:id", id.to_string())
            .with_child(para);
        self.xml.root.push(entry);
    }

    fn save(&self, package: &mut DocxPackage) -> Result<()> {
        let partname = match &self.partname {
            Some(partname) => partname.clone(),
            None => package.ensure_related_part(
                self.kind.reltype(),
                self.kind.default_partname(),
                self.kind.content_type(),
                self.kind.template(),
            )?,
        };
        package.write_part_xml(&partname, &self.xml)
    }
}

/// Ids of every note reference of `kind` in the body, in document order.
fn reference_ids(doc: &Document, kind: NoteKind) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    let mut bad = None;
    for (_, block) in doc.iter() {
        let Some(el) = block.element() else { continue };
        el.walk(&mut |el| {
            if el.is(kind.reference()) {
                match note_id(el).filter(|id| *id > 0) {
                    Some(id) => ids.push(id as u32),
                    None => bad = Some(el.attr("w:id").unwrap_or_default().to_string()),
                }
            }
        });
    }
    if let Some(id) = bad {
        return Err(Error::StructuralInconsistency(format!(
            "{} with invalid id '{}'",
            kind.reference(),
            id
        )));
    }
    Ok(ids)
}

fn reference_run(kind: NoteKind, id: u32, ref_style: &str) -> XmlElement {
    XmlElement::new("w:r")
        .with_child(
            XmlElement::new("w:rPr").with_child(XmlElement::new("w:rStyle").with_attr("w:val", ref_style)),
        )
        .with_child(XmlElement::new(format!("w:{}", kind.reference())).with_attr("w:id", id.to_string()))
}

/// Append a note reference to the paragraph at `paragraph_index`.
/// Returns the new note id.
pub fn add_note(package: &mut DocxPackage, kind: NoteKind, paragraph_index: usize, text: &str) -> Result<u32> {
    package.document().paragraph_id(paragraph_index)?;
    let mut notes = NotesPart::load(package, kind)?;
    let mut ids = NoteIdAllocator::from_max(notes.max_id());
    let id = ids.allocate();
    log::debug!("allocated {} id {}", kind.entry(), id);

    let mut styles = Styles::from_package(package)?;
    let (text_style, ref_style) = styles.ensure_note_styles(kind.style_prefix());

    package
        .document_mut()
        .paragraph_mut(paragraph_index)?
        .push_run(reference_run(kind, id, &ref_style));
    notes.push_entry(id, text, &text_style, &ref_style);

    notes.save(package)?;
    styles.save_to(package)?;
    Ok(id)
}

/// Place a note reference right after (or before) the first occurrence of
/// `search`. Returns `(note id, paragraph index)`.
pub fn add_note_at_text(
    package: &mut DocxPackage,
    kind: NoteKind,
    search: &str,
    text: &str,
    after: bool,
) -> Result<(u32, usize)> {
    let anchor = AnchorResolver::new(package.document()).first_match(search, MatchOptions::default())?;
    let offset = anchor.offset.unwrap_or_default() + if after { anchor.len } else { 0 };

    let mut notes = NotesPart::load(package, kind)?;
    let id = NoteIdAllocator::from_max(notes.max_id()).allocate();
    log::debug!("allocated {} id {} at offset {}", kind.entry(), id, offset);

    let mut styles = Styles::from_package(package)?;
    let (text_style, ref_style) = styles.ensure_note_styles(kind.style_prefix());

    let para = package.document_mut().paragraph_by_id_mut(anchor.id).ok_or_else(|| {
        Error::StructuralInconsistency("anchor paragraph left the document".to_string())
    })?;
    if !para.insert_run_at(offset, reference_run(kind, id, &ref_style)) {
        return Err(Error::StructuralInconsistency(format!(
            "offset {} is outside paragraph {}",
            offset, anchor.paragraph_index
        )));
    }
    notes.push_entry(id, text, &text_style, &ref_style);

    notes.save(package)?;
    styles.save_to(package)?;
    Ok((id, anchor.paragraph_index))
}

/// Every note of `kind` with its text, by id.
pub fn list_notes(package: &DocxPackage, kind: NoteKind) -> Result<Vec<NoteSummary>> {
    let notes = NotesPart::load(package, kind)?;
    Ok(notes
        .content_entries()
        .into_iter()
        .map(|(id, el)| NoteSummary {
            id,
            kind,
            text: entry_text(el),
        })
        .collect())
}

fn entry_text(entry: &XmlElement) -> String {
    let mut paragraphs = Vec::new();
    for p in entry.find_all("p") {
        let mut text = String::new();
        p.walk(&mut |el| {
            if el.is("t") {
                text.push_str(&el.text());
            }
        });
        paragraphs.push(text.trim().to_string());
    }
    paragraphs.join("\n")
}

/// Move every footnote into the endnote story.
///
/// Footnote ids are remapped past the current endnote maximum in id order,
/// references are rewritten in place and the footnote entries removed. All
/// changes are staged and committed only once every step has succeeded.
pub fn convert_footnotes_to_endnotes(package: &mut DocxPackage) -> Result<ConversionReport> {
    let mut footnotes = NotesPart::load(package, NoteKind::Footnote)?;
    let mut endnotes = NotesPart::load(package, NoteKind::Endnote)?;

    let mut ids = NoteIdAllocator::from_max(endnotes.max_id());
    let mapping: BTreeMap<u32, u32> = footnotes
        .content_entries()
        .keys()
        .map(|old| (*old, ids.allocate()))
        .collect();
    if mapping.is_empty() {
        return Ok(ConversionReport::default());
    }

    let mut styles = Styles::from_package(package)?;
    let (foot_text, foot_ref) = styles.ensure_note_styles(NoteKind::Footnote.style_prefix());
    let (end_text, end_ref) = styles.ensure_note_styles(NoteKind::Endnote.style_prefix());
    let rename_style = |el: &mut XmlElement| {
        if el.is("pStyle") && el.attr("w:val") == Some(foot_text.as_str()) {
            el.set_attr("w:val", end_text.as_str());
        } else if el.is("rStyle") && el.attr("w:val") == Some(foot_ref.as_str()) {
            el.set_attr("w:val", end_ref.as_str());
        }
    };

    let mut staged = package.document().clone();
    let mut failed = None;
    for block in staged.blocks_mut() {
        let Some(el) = block.element_mut() else { continue };
        el.walk_mut(&mut |el| {
            if el.is("r") && el.child("footnoteReference").is_some() {
                el.walk_mut(&mut |inner| rename_style(inner));
            }
            if el.is("footnoteReference") {
                let remapped = note_id(el)
                    .and_then(|id| u32::try_from(id).ok())
                    .and_then(|id| mapping.get(&id));
                match remapped {
                    Some(new_id) => {
                        el.rename("w:endnoteReference");
                        el.set_attr("w:id", new_id.to_string());
                    },
                    None => failed = el.attr("w:id").map(str::to_string),
                }
            }
        });
    }
    if let Some(id) = failed {
        return Err(Error::StructuralInconsistency(format!(
            "footnote reference {} has no entry to convert",
            id
        )));
    }

    let converted: Vec<XmlElement> = footnotes
        .content_entries()
        .into_iter()
        .map(|(old, entry)| {
            let mut entry = entry.clone();
            entry.rename("w:endnote");
            entry.set_attr("w:id", mapping[&old].to_string());
            entry.walk_mut(&mut |el| {
                if el.is("footnoteRef") {
                    el.rename("w:endnoteRef");
                }
                rename_style(el);
            });
            entry
        })
        .collect();
    for entry in converted {
        endnotes.xml.root.push(entry);
    }
    footnotes.xml.root.children.retain(|node| {
        node.as_element()
            .is_none_or(|el| !el.is("footnote") || content_id(el).is_none())
    });

    *package.document_mut() = staged;
    footnotes.save(package)?;
    endnotes.save(package)?;
    styles.save_to(package)?;

    log::info!("converted {} footnote(s) to endnotes", mapping.len());
    Ok(ConversionReport {
        converted: mapping.len(),
        mapping: mapping.into_iter().collect(),
    })
}
