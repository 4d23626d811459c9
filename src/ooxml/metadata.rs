/// OOXML core properties (`docProps/core.xml`).
///
/// Core properties follow the Dublin Core metadata standard with OPC
/// extensions: title, author, creation date and so on.
use crate::common::error::{Error, Result};
use crate::common::xml::{resolve_reference, unescape_xml};
use crate::ooxml::opc::constants::{content_type as ct, namespace, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::io::Cursor;

/// Default part name of the core properties.
pub const CORE_PROPERTIES_URI: &str = "/docProps/core.xml";

/// Document metadata from the core properties part.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoreProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl CoreProperties {
    /// Properties for a freshly created document.
    pub fn new_document(title: Option<&str>, author: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            title: title.map(str::to_string),
            author: author.map(str::to_string),
            last_modified_by: author.map(str::to_string),
            revision: Some("1".to_string()),
            created: Some(now),
            modified: Some(now),
            ..Default::default()
        }
    }

    /// Read the core properties of a package, if it has any.
    pub fn from_package(package: &OpcPackage) -> Result<Option<Self>> {
        let partname = match package.package_related_partname(rt::CORE_PROPERTIES) {
            Some(partname) => partname,
            None => return Ok(None),
        };
        match package.part(&partname) {
            Some(part) => Ok(Some(Self::from_xml(part.blob())?)),
            None => Ok(None),
        }
    }

    /// Write the core properties into a package, adding the part and its
    /// package relationship when missing.
    pub fn save_to(&self, package: &mut OpcPackage) -> Result<()> {
        let partname = match package.package_related_partname(rt::CORE_PROPERTIES) {
            Some(partname) => partname,
            None => {
                let partname = PackURI::new(CORE_PROPERTIES_URI)?;
                package.rels_mut().get_or_add(rt::CORE_PROPERTIES, &partname);
                partname
            },
        };
        let blob = self.to_xml()?.into_bytes();
        match package.part_mut(&partname) {
            Some(part) => part.set_blob(blob),
            None => package.add_part(Part::new(partname, ct::OPC_CORE_PROPERTIES, blob)),
        }
        Ok(())
    }

    /// Parse core properties XML.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);

        let mut props = Self::default();
        let mut current: Option<Vec<u8>> = None;
        let mut text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    current = Some(e.local_name().as_ref().to_vec());
                    text.clear();
                },
                Event::Text(e) => {
                    if current.is_some() {
                        text.push_str(&unescape_xml(std::str::from_utf8(e.as_ref())?));
                    }
                },
                Event::CData(e) => {
                    if current.is_some() {
                        text.push_str(std::str::from_utf8(e.as_ref())?);
                    }
                },
                Event::GeneralRef(e) => {
                    if current.is_some() {
                        let name = std::str::from_utf8(e.as_ref())?;
                        match resolve_reference(name) {
                            Some(resolved) => text.push_str(&resolved),
                            None => text.push_str(&format!("&{};", name)),
                        }
                    }
                },
                Event::End(_) => {
                    if let Some(name) = current.take() {
                        props.assign(&name, text.trim().to_string());
                        text.clear();
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        Ok(props)
    }

    fn assign(&mut self, local: &[u8], text: String) {
        if text.is_empty() {
            return;
        }
        match local {
            b"title" => self.title = Some(text),
            b"subject" => self.subject = Some(text),
            b"creator" => self.author = Some(text),
            b"keywords" => self.keywords = Some(text),
            b"description" => self.description = Some(text),
            b"lastModifiedBy" => self.last_modified_by = Some(text),
            b"revision" => self.revision = Some(text),
            b"created" => self.created = parse_datetime(&text).ok(),
            b"modified" => self.modified = parse_datetime(&text).ok(),
            _ => {},
        }
    }

    /// Serialize to `docProps/core.xml`.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let xml_err = |e: std::io::Error| Error::Xml(format!("core properties: {}", e));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;

        let mut root = BytesStart::new("cp:coreProperties");
        root.push_attribute(("xmlns:cp", namespace::OPC_CORE_PROPERTIES));
        root.push_attribute(("xmlns:dc", namespace::DC));
        root.push_attribute(("xmlns:dcterms", namespace::DCTERMS));
        root.push_attribute(("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"));
        root.push_attribute(("xmlns:xsi", namespace::XSI));
        writer.write_event(Event::Start(root)).map_err(xml_err)?;

        let fields = [
            ("dc:title", &self.title),
            ("dc:subject", &self.subject),
            ("dc:creator", &self.author),
            ("cp:keywords", &self.keywords),
            ("dc:description", &self.description),
            ("cp:lastModifiedBy", &self.last_modified_by),
            ("cp:revision", &self.revision),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                write_text_element(&mut writer, BytesStart::new(name), value).map_err(xml_err)?;
            }
        }
        for (name, value) in [("dcterms:created", self.created), ("dcterms:modified", self.modified)] {
            if let Some(value) = value {
                let mut start = BytesStart::new(name);
                start.push_attribute(("xsi:type", "dcterms:W3CDTF"));
                let stamp = value.to_rfc3339_opts(SecondsFormat::Secs, true);
                write_text_element(&mut writer, start, &stamp).map_err(xml_err)?;
            }
        }

        writer
            .write_event(Event::End(BytesEnd::new("cp:coreProperties")))
            .map_err(xml_err)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| Error::Xml(format!("Invalid UTF-8 in generated XML: {}", e)))
    }
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    start: BytesStart<'_>,
    text: &str,
) -> std::io::Result<()> {
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(end))
}

/// Parse an ISO 8601 datetime string into a `DateTime<Utc>`.
///
/// Supports formats like:
/// - 2023-10-10T14:30:00Z
/// - 2023-10-10T14:30:00.1234567Z
/// - 2023-10-10T14:30:00
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }
    Err(Error::InvalidFormat(format!("Invalid datetime format: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2023-10-10T14:30:00Z").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 10, 10));
        assert!(parse_datetime("2023-10-10T14:30:00.123456Z").is_ok());
        assert!(parse_datetime("2023-10-10T14:30:00").is_ok());
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_parse_core_properties_xml() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:dcterms="http://purl.org/dc/terms/"
                   xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>Q3 &amp; Q4 Report</dc:title>
    <dc:creator>Test Author</dc:creator>
    <cp:revision>5</cp:revision>
    <dcterms:created xsi:type="dcterms:W3CDTF">2023-10-10T14:30:00Z</dcterms:created>
</cp:coreProperties>"#;

        let props = CoreProperties::from_xml(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("Q3 & Q4 Report"));
        assert_eq!(props.author.as_deref(), Some("Test Author"));
        assert_eq!(props.revision.as_deref(), Some("5"));
        assert!(props.created.is_some());
        assert!(props.modified.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let props = CoreProperties::new_document(Some("Plan <draft>"), Some("Ana"), now);
        let xml = props.to_xml().unwrap();
        assert!(xml.contains("Plan &lt;draft&gt;"));

        let parsed = CoreProperties::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(parsed, props);
    }

    #[test]
    fn test_entities_keep_surrounding_spaces() {
        let xml = br#"<cp:coreProperties xmlns:cp="urn:cp" xmlns:dc="urn:dc">
    <dc:title>R &amp; D Plan</dc:title>
    <dc:creator>Smith &#38; Co</dc:creator>
    <cp:keywords> a&#x26;b <![CDATA[<raw>]]> </cp:keywords>
</cp:coreProperties>"#;

        let props = CoreProperties::from_xml(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("R & D Plan"));
        assert_eq!(props.author.as_deref(), Some("Smith & Co"));
        assert_eq!(props.keywords.as_deref(), Some("a&b <raw>"));
    }

    #[test]
    fn test_ampersand_title_round_trip() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let props = CoreProperties::new_document(Some("R & D Plan"), Some("Smith & Co"), now);
        let parsed = CoreProperties::from_xml(props.to_xml().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("R & D Plan"));
        assert_eq!(parsed.author.as_deref(), Some("Smith & Co"));
    }
}
