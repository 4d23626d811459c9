/// Numbering definitions for bulleted and numbered lists.
///
/// Lists are driven by `word/numbering.xml`: a paragraph's `w:numPr`
/// points at a `w:num`, which points at a `w:abstractNum` holding one
/// `w:lvl` per indentation level. List insertion reuses an existing
/// definition whose level has the requested kind and only creates a new
/// one when nothing matches.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement};
use crate::ooxml::docx::format::{PPR_ORDER, set_ordered};
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::template::default_numbering_xml;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use std::str::FromStr;

/// Indentation levels accepted by list insertion.
pub const MIN_LIST_LEVEL: u8 = 1;
pub const MAX_LIST_LEVEL: u8 = 5;

/// Levels in a generated abstract definition.
const LEVELS_PER_DEFINITION: u8 = 9;

const BULLET_CHARS: [&str; 3] = ["\u{2022}", "o", "\u{25AA}"];
const NUMBER_FORMATS: [(&str, &str); 3] = [("decimal", "."), ("lowerLetter", "."), ("lowerRoman", ".")];

/// Kind of list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
}

impl FromStr for ListKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullet" | "bullets" | "bulleted" => Ok(Self::Bullet),
            "number" | "numbers" | "numbered" | "decimal" => Ok(Self::Number),
            _ => Err(Error::Validation(format!(
                "unknown list type '{}' (expected bullet or number)",
                s
            ))),
        }
    }
}

impl ListKind {
    fn matches_format(self, num_fmt: &str) -> bool {
        match self {
            ListKind::Bullet => num_fmt == "bullet",
            ListKind::Number => num_fmt != "bullet" && num_fmt != "none",
        }
    }
}

/// Parsed `word/numbering.xml`.
#[derive(Debug, Clone)]
pub struct Numbering {
    partname: PackURI,
    xml: XmlDocument,
}

impl Numbering {
    /// Numbering of a package, creating an empty part when missing.
    pub fn from_package(package: &mut DocxPackage) -> Result<Self> {
        let partname = package.ensure_related_part(
            rt::NUMBERING,
            "/word/numbering.xml",
            ct::WML_NUMBERING,
            default_numbering_xml(),
        )?;
        let xml = package
            .read_related_xml(rt::NUMBERING)?
            .ok_or_else(|| Error::StructuralInconsistency("numbering part vanished".to_string()))?;
        Ok(Self { partname, xml })
    }

    pub fn save_to(&self, package: &mut DocxPackage) -> Result<()> {
        package.write_part_xml(&self.partname, &self.xml)
    }

    /// `(numId, ilvl)` for a list of `kind` at 1-based `level`.
    pub fn resolve_or_create(&mut self, kind: ListKind, level: u8) -> Result<(u32, u8)> {
        if !(MIN_LIST_LEVEL..=MAX_LIST_LEVEL).contains(&level) {
            return Err(Error::Validation(format!(
                "list level {} is outside {}..={}",
                level, MIN_LIST_LEVEL, MAX_LIST_LEVEL
            )));
        }
        let ilvl = level - 1;

        if let Some(num_id) = self.find_matching(kind, ilvl) {
            log::debug!("reusing numbering definition {} for {:?} level {}", num_id, kind, level);
            return Ok((num_id, ilvl));
        }

        let abstract_id = next_id(&self.xml.root, "abstractNum", "w:abstractNumId", 0);
        let num_id = next_id(&self.xml.root, "num", "w:numId", 1);
        self.xml
            .root
            .insert_ordered(abstract_definition(abstract_id, kind), &["numPicBullet", "abstractNum"]);
        let num = XmlElement::new("w:num")
            .with_attr("w:numId", num_id.to_string())
            .with_child(XmlElement::new("w:abstractNumId").with_attr("w:val", abstract_id.to_string()));
        self.xml
            .root
            .insert_ordered(num, &["numPicBullet", "abstractNum", "num"]);
        log::debug!("created numbering definition {} (abstract {}) for {:?}", num_id, abstract_id, kind);
        Ok((num_id, ilvl))
    }

    fn find_matching(&self, kind: ListKind, ilvl: u8) -> Option<u32> {
        let ilvl = ilvl.to_string();
        self.xml.root.elements().filter(|el| el.is("num")).find_map(|num| {
            let num_id = num.attr("w:numId").and_then(parse_id)?;
            let abstract_id = num.child("abstractNumId")?.attr("val")?;
            let definition = self.xml.root.elements().find(|el| {
                el.is("abstractNum") && el.attr("w:abstractNumId") == Some(abstract_id)
            })?;
            let lvl = definition
                .elements()
                .find(|el| el.is("lvl") && el.attr("w:ilvl") == Some(ilvl.as_str()))?;
            let num_fmt = lvl.child("numFmt")?.attr("val")?;
            kind.matches_format(num_fmt).then_some(num_id)
        })
    }

    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }
}

/// Set `w:numPr` on paragraph properties.
pub fn set_numbering(ppr: &mut XmlElement, num_id: u32, ilvl: u8) {
    let num_pr = XmlElement::new("w:numPr")
        .with_child(XmlElement::new("w:ilvl").with_attr("w:val", ilvl.to_string()))
        .with_child(XmlElement::new("w:numId").with_attr("w:val", num_id.to_string()));
    set_ordered(ppr, num_pr, PPR_ORDER);
}

fn parse_id(value: &str) -> Option<u32> {
    atoi_simd::parse::<u32>(value.trim().as_bytes()).ok()
}

fn next_id(root: &XmlElement, local: &str, attr: &str, first: u32) -> u32 {
    root.elements()
        .filter(|el| el.is(local))
        .filter_map(|el| el.attr(attr).and_then(parse_id))
        .max()
        .map(|max| max + 1)
        .unwrap_or(first)
}

fn abstract_definition(abstract_id: u32, kind: ListKind) -> XmlElement {
    let mut definition = XmlElement::new("w:abstractNum")
        .with_attr("w:abstractNumId", abstract_id.to_string())
        .with_child(XmlElement::new("w:multiLevelType").with_attr("w:val", "hybridMultilevel"));

    for i in 0..LEVELS_PER_DEFINITION {
        let (num_fmt, lvl_text) = match kind {
            ListKind::Bullet => ("bullet", BULLET_CHARS[usize::from(i) % BULLET_CHARS.len()].to_string()),
            ListKind::Number => {
                let (fmt, suffix) = NUMBER_FORMATS[usize::from(i) % NUMBER_FORMATS.len()];
                (fmt, format!("%{}{}", i + 1, suffix))
            },
        };
        let left = 720 * (u32::from(i) + 1);
        definition.push(
            XmlElement::new("w:lvl")
                .with_attr("w:ilvl", i.to_string())
                .with_child(XmlElement::new("w:start").with_attr("w:val", "1"))
                .with_child(XmlElement::new("w:numFmt").with_attr("w:val", num_fmt))
                .with_child(XmlElement::new("w:lvlText").with_attr("w:val", lvl_text))
                .with_child(XmlElement::new("w:lvlJc").with_attr("w:val", "left"))
                .with_child(
                    XmlElement::new("w:pPr").with_child(
                        XmlElement::new("w:ind")
                            .with_attr("w:left", left.to_string())
                            .with_attr("w:hanging", "360"),
                    ),
                ),
        );
    }
    definition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::testing::blank_docx;

    fn numbering() -> (DocxPackage, Numbering) {
        let mut package = DocxPackage::from_bytes(&blank_docx()).unwrap();
        let numbering = Numbering::from_package(&mut package).unwrap();
        (package, numbering)
    }

    #[test]
    fn test_create_then_reuse() {
        let (_, mut numbering) = numbering();
        let (bullet, ilvl) = numbering.resolve_or_create(ListKind::Bullet, 2).unwrap();
        assert_eq!((bullet, ilvl), (1, 1));
        assert_eq!(numbering.resolve_or_create(ListKind::Bullet, 1).unwrap(), (1, 0));

        let (number, _) = numbering.resolve_or_create(ListKind::Number, 1).unwrap();
        assert_eq!(number, 2);
        assert_eq!(numbering.resolve_or_create(ListKind::Number, 5).unwrap(), (2, 4));

        let root = &numbering.xml().root;
        assert_eq!(root.elements().filter(|e| e.is("abstractNum")).count(), 2);
        let names: Vec<_> = root.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["abstractNum", "abstractNum", "num", "num"]);
    }

    #[test]
    fn test_level_bounds() {
        let (_, mut numbering) = numbering();
        assert!(matches!(numbering.resolve_or_create(ListKind::Bullet, 0), Err(Error::Validation(_))));
        assert!(matches!(numbering.resolve_or_create(ListKind::Number, 6), Err(Error::Validation(_))));
    }

    #[test]
    fn test_saved_definitions_survive_reload() {
        let (mut package, mut numbering) = numbering();
        numbering.resolve_or_create(ListKind::Number, 1).unwrap();
        numbering.save_to(&mut package).unwrap();

        let mut reloaded = Numbering::from_package(&mut package).unwrap();
        assert_eq!(reloaded.resolve_or_create(ListKind::Number, 3).unwrap(), (1, 2));
    }

    #[test]
    fn test_list_kind_from_str() {
        assert_eq!("Bullet".parse::<ListKind>().unwrap(), ListKind::Bullet);
        assert_eq!("numbered".parse::<ListKind>().unwrap(), ListKind::Number);
        assert!("stars".parse::<ListKind>().is_err());
    }

    #[test]
    fn test_set_numbering_order() {
        let mut ppr = XmlElement::new("w:pPr")
            .with_child(XmlElement::new("w:pStyle").with_attr("w:val", "ListParagraph"))
            .with_child(XmlElement::new("w:jc").with_attr("w:val", "left"));
        set_numbering(&mut ppr, 3, 1);
        let names: Vec<_> = ppr.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["pStyle", "numPr", "jc"]);
    }
}
