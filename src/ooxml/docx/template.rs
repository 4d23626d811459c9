//! Document template module.
//!
//! Provides a minimal valid package for creating new Word documents: the
//! main document with one section, styles, settings, a font table and the
//! document properties.

use crate::common::error::Result;
use crate::ooxml::metadata::CoreProperties;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part};

/// Part name of the main document in packages this crate creates.
pub const DOCUMENT_URI: &str = "/word/document.xml";

/// Creates an empty document with a single section definition.
pub fn default_document_xml() -> &'static str {
    include_str!("../../../resources/document.xml")
}

/// Default styles.xml content: Normal, Title and the first two headings.
pub fn default_styles_xml() -> &'static str {
    include_str!("../../../resources/styles.xml")
}

/// Generate default settings.xml content
pub fn default_settings_xml() -> &'static str {
    include_str!("../../../resources/settings.xml")
}

pub fn default_font_table_xml() -> &'static str {
    include_str!("../../../resources/fontTable.xml")
}

/// Generate a minimal valid app.xml (extended properties) content.
pub fn default_app_props_xml() -> &'static str {
    include_str!("../../../resources/docProps/app.xml")
}

/// Empty footnotes part holding the two separator entries Word expects.
pub fn default_footnotes_xml() -> &'static str {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:footnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:footnote w:type="separator" w:id="-1"><w:p><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:r><w:separator/></w:r></w:p></w:footnote>"#,
        r#"<w:footnote w:type="continuationSeparator" w:id="0"><w:p><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:r><w:continuationSeparator/></w:r></w:p></w:footnote>"#,
        r#"</w:footnotes>"#
    )
}

/// Empty endnotes part holding the two separator entries.
pub fn default_endnotes_xml() -> &'static str {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:endnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:endnote w:type="separator" w:id="-1"><w:p><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:r><w:separator/></w:r></w:p></w:endnote>"#,
        r#"<w:endnote w:type="continuationSeparator" w:id="0"><w:p><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:r><w:continuationSeparator/></w:r></w:p></w:endnote>"#,
        r#"</w:endnotes>"#
    )
}

pub fn default_numbering_xml() -> &'static str {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#
    )
}

/// Build a blank package with the given core properties.
pub fn blank_package(core: &CoreProperties) -> Result<OpcPackage> {
    let mut package = OpcPackage::new();
    package.set_default_content_type("rels", ct::OPC_RELATIONSHIPS);
    package.set_default_content_type("xml", ct::XML);

    let document_uri = PackURI::new(DOCUMENT_URI)?;
    let mut document = Part::new(
        document_uri.clone(),
        ct::WML_DOCUMENT_MAIN,
        default_document_xml().as_bytes().to_vec(),
    );

    let word_parts = [
        ("/word/styles.xml", ct::WML_STYLES, rt::STYLES, default_styles_xml()),
        ("/word/settings.xml", ct::WML_SETTINGS, rt::SETTINGS, default_settings_xml()),
        ("/word/fontTable.xml", ct::WML_FONT_TABLE, rt::FONT_TABLE, default_font_table_xml()),
    ];
    for (name, content_type, reltype, xml) in word_parts {
        let partname = PackURI::new(name)?;
        document.relate_to(&partname, reltype);
        package.add_part(Part::new(partname, content_type, xml.as_bytes().to_vec()));
    }
    package.add_part(document);
    package.rels_mut().get_or_add(rt::OFFICE_DOCUMENT, &document_uri);

    let app_uri = PackURI::new("/docProps/app.xml")?;
    package.rels_mut().get_or_add(rt::EXTENDED_PROPERTIES, &app_uri);
    package.add_part(Part::new(
        app_uri,
        ct::OFC_EXTENDED_PROPERTIES,
        default_app_props_xml().as_bytes().to_vec(),
    ));

    core.save_to(&mut package)?;
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    #[test]
    fn test_templates_are_well_formed() {
        for xml in [
            default_document_xml(),
            default_styles_xml(),
            default_settings_xml(),
            default_font_table_xml(),
            default_app_props_xml(),
            default_footnotes_xml(),
            default_endnotes_xml(),
            default_numbering_xml(),
        ] {
            XmlDocument::parse(xml.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_blank_package_roundtrip() {
        let core = CoreProperties::new_document(Some("Memo"), Some("Kim"), chrono::Utc::now());
        let package = blank_package(&core).unwrap();
        let bytes = package.to_bytes().unwrap();

        let reopened = OpcPackage::from_bytes(&bytes).unwrap();
        assert_eq!(reopened.main_document_partname().unwrap().as_str(), DOCUMENT_URI);
        let main = reopened.part(&PackURI::new(DOCUMENT_URI).unwrap()).unwrap();
        assert_eq!(main.content_type(), ct::WML_DOCUMENT_MAIN);
        assert!(main.rels().part_with_reltype(rt::STYLES).is_ok());

        let props = CoreProperties::from_package(&reopened).unwrap().unwrap();
        assert_eq!(props.title.as_deref(), Some("Memo"));
    }
}
