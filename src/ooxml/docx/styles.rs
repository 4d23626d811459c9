/// Styles - document styles and formatting definitions.
///
/// Style arguments throughout the crate accept either a style id
/// (`Heading1`) or a display name (`Heading 1`, matched case-insensitively).
/// Heading, list and note styles the engine relies on are created on demand.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement};
use crate::ooxml::docx::format::RunFormat;
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::paragraph::Paragraph;
use crate::ooxml::docx::template::default_styles_xml;
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};

/// `basedOn` chains deeper than this are treated as cyclic.
const MAX_BASED_ON_DEPTH: usize = 16;

/// Half-point sizes for heading levels 1..=9.
const HEADING_SIZES: [u32; 9] = [32, 26, 24, 22, 22, 22, 21, 21, 21];

/// A style definition.
#[derive(Debug, Clone, Copy)]
pub struct Style<'a> {
    el: &'a XmlElement,
}

impl<'a> Style<'a> {
    pub fn style_id(&self) -> &'a str {
        self.el.attr("w:styleId").unwrap_or_default()
    }

    pub fn name(&self) -> Option<&'a str> {
        self.el.child("name")?.attr("val")
    }

    /// `paragraph`, `character`, `table` or `numbering`.
    pub fn style_type(&self) -> &'a str {
        self.el.attr("w:type").unwrap_or("paragraph")
    }

    pub fn based_on(&self) -> Option<&'a str> {
        self.el.child("basedOn")?.attr("val")
    }

    /// Outline level set by the style itself (0-based).
    pub fn outline_level(&self) -> Option<u8> {
        self.el
            .child("pPr")?
            .child("outlineLvl")?
            .attr("val")
            .and_then(|v| atoi_simd::parse::<u8>(v.as_bytes()).ok())
    }

    /// Heading level (1-based) implied by the id or name alone.
    fn builtin_heading_level(&self) -> Option<u8> {
        let from_id = self
            .style_id()
            .strip_prefix("Heading")
            .and_then(|n| n.parse::<u8>().ok());
        let from_name = || {
            self.name()?
                .to_ascii_lowercase()
                .strip_prefix("heading ")?
                .parse::<u8>()
                .ok()
        };
        from_id.or_else(from_name).filter(|level| (1..=9).contains(level))
    }
}

/// Parsed `word/styles.xml`.
#[derive(Debug, Clone)]
pub struct Styles {
    partname: Option<PackURI>,
    xml: XmlDocument,
}

impl Styles {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Ok(Self {
            partname: None,
            xml: XmlDocument::parse(xml)?,
        })
    }

    /// Styles of a package, creating the styles part from the template
    /// when the document has none.
    pub fn from_package(package: &mut DocxPackage) -> Result<Self> {
        let partname = package.ensure_related_part(
            rt::STYLES,
            "/word/styles.xml",
            ct::WML_STYLES,
            default_styles_xml(),
        )?;
        let xml = package
            .read_related_xml(rt::STYLES)?
            .ok_or_else(|| Error::StructuralInconsistency("styles part vanished".to_string()))?;
        Ok(Self {
            partname: Some(partname),
            xml,
        })
    }

    /// Styles of a package for reading; `None` when there is no styles part.
    pub fn read(package: &DocxPackage) -> Result<Option<Self>> {
        Ok(package.read_related_xml(rt::STYLES)?.map(|xml| Self {
            partname: package.related_partname(rt::STYLES),
            xml,
        }))
    }

    /// Write back into the part this was loaded from.
    pub fn save_to(&self, package: &mut DocxPackage) -> Result<()> {
        let partname = self
            .partname
            .as_ref()
            .ok_or_else(|| Error::StructuralInconsistency("styles were not loaded from a package".to_string()))?;
        package.write_part_xml(partname, &self.xml)
    }

    pub fn iter(&self) -> impl Iterator<Item = Style<'_>> {
        self.xml
            .root
            .elements()
            .filter(|el| el.is("style"))
            .map(|el| Style { el })
    }

    pub fn get_by_id(&self, style_id: &str) -> Option<Style<'_>> {
        self.iter().find(|s| s.style_id() == style_id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Style<'_>> {
        self.iter()
            .find(|s| s.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Look up by id first, then by name.
    pub fn find(&self, name_or_id: &str) -> Option<Style<'_>> {
        let key = name_or_id.trim();
        self.get_by_id(key).or_else(|| self.get_by_name(key))
    }

    /// Resolve a style argument to an existing style id.
    pub fn resolve(&self, name_or_id: &str) -> Result<String> {
        self.find(name_or_id)
            .map(|s| s.style_id().to_string())
            .ok_or_else(|| Error::NotFound(format!("style '{}' is not defined", name_or_id)))
    }

    /// Resolve a style argument, creating the built-in heading style when
    /// the argument names one (`Heading 3`, `heading3`) that is missing.
    pub fn resolve_or_create(&mut self, name_or_id: &str) -> Result<String> {
        if let Some(style) = self.find(name_or_id) {
            return Ok(style.style_id().to_string());
        }
        let compact: String = name_or_id
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.strip_prefix("heading").and_then(|n| n.parse::<u8>().ok()) {
            Some(level) if (1..=9).contains(&level) => self.ensure_heading(level),
            _ => Err(Error::NotFound(format!("style '{}' is not defined", name_or_id))),
        }
    }

    /// Heading level (1-based) of a style, following `basedOn`.
    pub fn heading_level(&self, style_id: &str) -> Option<u8> {
        let mut current = self.get_by_id(style_id);
        for _ in 0..MAX_BASED_ON_DEPTH {
            let style = current?;
            if let Some(level) = style.outline_level() {
                return (level < 9).then_some(level + 1);
            }
            if let Some(level) = style.builtin_heading_level() {
                return Some(level);
            }
            current = style.based_on().and_then(|base| self.get_by_id(base));
        }
        None
    }

    /// Heading level of a paragraph: its own outline level, else its style's.
    pub fn paragraph_heading_level(&self, para: &Paragraph) -> Option<u8> {
        if let Some(level) = para.outline_level() {
            return (level < 9).then_some(level + 1);
        }
        self.heading_level(para.style_id()?)
    }

    /// Id of the heading style for `level`, creating `HeadingN` if missing.
    pub fn ensure_heading(&mut self, level: u8) -> Result<String> {
        if !(1..=9).contains(&level) {
            return Err(Error::Validation(format!(
                "heading level {} is outside 1..=9",
                level
            )));
        }
        let id = format!("Heading{}", level);
        if let Some(style) = self
            .get_by_id(&id)
            .or_else(|| self.get_by_name(&format!("heading {}", level)))
        {
            return Ok(style.style_id().to_string());
        }

        let space_before = if level == 1 { "240" } else { "40" };
        let size = HEADING_SIZES[usize::from(level - 1)].to_string();
        let style = paragraph_style(&id, &format!("heading {}", level), Some("Normal"))
            .with_child(XmlElement::new("w:next").with_attr("w:val", "Normal"))
            .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "9"))
            .with_child(XmlElement::new("w:qFormat"))
            .with_child(
                XmlElement::new("w:pPr")
                    .with_child(XmlElement::new("w:keepNext"))
                    .with_child(XmlElement::new("w:keepLines"))
                    .with_child(
                        XmlElement::new("w:spacing")
                            .with_attr("w:before", space_before)
                            .with_attr("w:after", "0"),
                    )
                    .with_child(
                        XmlElement::new("w:outlineLvl").with_attr("w:val", (level - 1).to_string()),
                    ),
            )
            .with_child(
                XmlElement::new("w:rPr")
                    .with_child(XmlElement::new("w:b"))
                    .with_child(XmlElement::new("w:sz").with_attr("w:val", size.as_str()))
                    .with_child(XmlElement::new("w:szCs").with_attr("w:val", size.as_str())),
            );
        self.xml.root.push(style);
        log::debug!("created heading style {}", id);
        Ok(id)
    }

    /// Id of the list paragraph style, creating `ListParagraph` if missing.
    pub fn ensure_list_paragraph(&mut self) -> String {
        if let Some(style) = self.find("ListParagraph").or_else(|| self.find("List Paragraph")) {
            return style.style_id().to_string();
        }
        let style = paragraph_style("ListParagraph", "List Paragraph", Some("Normal"))
            .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "34"))
            .with_child(XmlElement::new("w:qFormat"))
            .with_child(
                XmlElement::new("w:pPr").with_child(
                    XmlElement::new("w:ind").with_attr("w:left", "720"),
                ),
            );
        self.xml.root.push(style);
        "ListParagraph".to_string()
    }

    /// Ensure the text and reference styles Word uses for notes. `prefix`
    /// is `Footnote` or `Endnote`. Returns `(text style, reference style)`.
    pub fn ensure_note_styles(&mut self, prefix: &str) -> (String, String) {
        let text_id = format!("{}Text", prefix);
        let ref_id = format!("{}Reference", prefix);
        let lower = prefix.to_ascii_lowercase();

        if self.get_by_id(&text_id).is_none() {
            let style = paragraph_style(&text_id, &format!("{} text", lower), Some("Normal"))
                .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "99"))
                .with_child(XmlElement::new("w:unhideWhenUsed"))
                .with_child(
                    XmlElement::new("w:pPr").with_child(
                        XmlElement::new("w:spacing")
                            .with_attr("w:after", "0")
                            .with_attr("w:line", "240")
                            .with_attr("w:lineRule", "auto"),
                    ),
                )
                .with_child(
                    XmlElement::new("w:rPr")
                        .with_child(XmlElement::new("w:sz").with_attr("w:val", "20"))
                        .with_child(XmlElement::new("w:szCs").with_attr("w:val", "20")),
                );
            self.xml.root.push(style);
        }
        if self.get_by_id(&ref_id).is_none() {
            let style = XmlElement::new("w:style")
                .with_attr("w:type", "character")
                .with_attr("w:styleId", ref_id.as_str())
                .with_child(XmlElement::new("w:name").with_attr("w:val", format!("{} reference", lower)))
                .with_child(XmlElement::new("w:basedOn").with_attr("w:val", "DefaultParagraphFont"))
                .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "99"))
                .with_child(XmlElement::new("w:unhideWhenUsed"))
                .with_child(
                    XmlElement::new("w:rPr").with_child(
                        XmlElement::new("w:vertAlign").with_attr("w:val", "superscript"),
                    ),
                );
            self.xml.root.push(style);
        }
        (text_id, ref_id)
    }

    /// Create a paragraph style named `name` carrying `format`.
    ///
    /// The id is the name with everything but ASCII alphanumerics removed.
    /// An existing style with that name or id is a validation error, and an
    /// unknown `base` is not found.
    pub fn create_custom_style(
        &mut self,
        name: &str,
        format: &RunFormat,
        base: Option<&str>,
    ) -> Result<String> {
        let name = name.trim();
        let id: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
        if id.is_empty() {
            return Err(Error::Validation(format!(
                "style name '{}' has no usable characters",
                name
            )));
        }
        if self.get_by_id(&id).is_some() || self.get_by_name(name).is_some() {
            return Err(Error::Validation(format!("style '{}' already exists", name)));
        }
        format.validate()?;
        let base_id = base.map(|b| self.resolve(b)).transpose()?;

        let mut style = paragraph_style(&id, name, base_id.as_deref())
            .with_child(XmlElement::new("w:qFormat"));
        if !format.is_empty() {
            let mut rpr = XmlElement::new("w:rPr");
            format.apply(&mut rpr)?;
            style.push(rpr);
        }
        self.xml.root.push(style);
        log::debug!("created custom style {} ({})", name, id);
        Ok(id)
    }

    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }
}

fn paragraph_style(id: &str, name: &str, based_on: Option<&str>) -> XmlElement {
    let mut style = XmlElement::new("w:style")
        .with_attr("w:type", "paragraph")
        .with_attr("w:styleId", id)
        .with_child(XmlElement::new("w:name").with_attr("w:val", name));
    if let Some(base) = based_on {
        style.push(XmlElement::new("w:basedOn").with_attr("w:val", base));
    }
    style
}
