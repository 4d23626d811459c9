//! OOXML custom document properties.
//!
//! Custom properties are stored in the `docProps/custom.xml` part and attach
//! named, typed values to a document. The signature fingerprint lives here.
//!
//! # Supported Property Types
//!
//! - **String** (`lpwstr` in OOXML)
//! - **Integer** (`i4` in OOXML) - 32-bit signed integer
//! - **Boolean** (`bool` in OOXML)
//! - **DateTime** (`filetime` in OOXML)

use crate::common::error::{Error, Result};
use crate::common::xml::{resolve_reference, unescape_xml};
use crate::ooxml::opc::constants::{content_type as ct, namespace, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

/// Fixed GUID format ID for custom properties as per OOXML specification.
const FORMAT_ID: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";

/// Default part name of the custom properties.
pub const CUSTOM_PROPERTIES_URI: &str = "/docProps/custom.xml";

/// FILETIME is 100-nanosecond intervals since 1601-01-01.
const WINDOWS_EPOCH_OFFSET: i64 = 116_444_736_000_000_000;

/// A custom document property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// String value (lpwstr in OOXML)
    String(String),
    /// 32-bit signed integer (i4 in OOXML)
    Integer(i32),
    /// Boolean value (bool in OOXML)
    Boolean(bool),
    /// DateTime value (filetime in OOXML)
    DateTime(DateTime<Utc>),
}

impl PropertyValue {
    fn element_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "vt:lpwstr",
            PropertyValue::Integer(_) => "vt:i4",
            PropertyValue::Boolean(_) => "vt:bool",
            PropertyValue::DateTime(_) => "vt:filetime",
        }
    }

    fn to_xml_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::DateTime(dt) => {
                let unix_nanos = dt.timestamp_nanos_opt().unwrap_or(0);
                ((unix_nanos / 100) + WINDOWS_EPOCH_OFFSET).to_string()
            },
        }
    }

    /// Parse from the local name of the value element and its text.
    /// Unknown variant types yield `None`.
    fn from_xml_string(local: &str, text: &str) -> Result<Option<Self>> {
        let invalid = |kind: &str| Error::InvalidFormat(format!("Invalid {} value: {}", kind, text));
        let value = match local {
            "lpwstr" | "lpstr" | "bstr" => PropertyValue::String(text.to_string()),
            "i4" | "int" => PropertyValue::Integer(text.trim().parse().map_err(|_| invalid(local))?),
            "bool" => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => PropertyValue::Boolean(true),
                "false" | "0" => PropertyValue::Boolean(false),
                _ => return Err(invalid("bool")),
            },
            "filetime" => {
                let filetime: i64 = text.trim().parse().map_err(|_| invalid("filetime"))?;
                let unix_nanos = (filetime - WINDOWS_EPOCH_OFFSET) * 100;
                let dt = DateTime::from_timestamp(
                    unix_nanos.div_euclid(1_000_000_000),
                    unix_nanos.rem_euclid(1_000_000_000) as u32,
                )
                .ok_or_else(|| invalid("filetime"))?;
                PropertyValue::DateTime(dt)
            },
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// The string content, if this is a string property.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CustomProperty {
    name: String,
    value: PropertyValue,
    /// `pid` attribute
    pid: i32,
}

/// Collection of custom document properties, kept in `pid` order.
#[derive(Debug, Clone)]
pub struct CustomProperties {
    properties: Vec<CustomProperty>,
    next_pid: i32,
}

impl Default for CustomProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomProperties {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            // PIDs start at 2 per OOXML spec
            next_pid: 2,
        }
    }

    /// Set a property, keeping the existing `pid` when the name is taken.
    /// Returns the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        let name = name.into();
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == name) {
            return Some(std::mem::replace(&mut existing.value, value));
        }
        let pid = self.next_pid;
        self.next_pid += 1;
        self.properties.push(CustomProperty { name, value, pid });
        None
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        let pos = self.properties.iter().position(|p| p.name == name)?;
        Some(self.properties.remove(pos).value)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|p| (p.name.as_str(), &p.value))
    }

    /// Read the custom properties of a package; empty when the part is absent.
    pub fn from_package(package: &OpcPackage) -> Result<Self> {
        let part = package
            .package_related_partname(rt::CUSTOM_PROPERTIES)
            .and_then(|partname| package.part(&partname));
        match part {
            Some(part) => Self::from_xml(part.blob()),
            None => Ok(Self::new()),
        }
    }

    /// Write into a package, creating the part and package relationship
    /// when missing.
    pub fn save_to(&self, package: &mut OpcPackage) -> Result<()> {
        let partname = match package.package_related_partname(rt::CUSTOM_PROPERTIES) {
            Some(partname) => partname,
            None => {
                let partname = PackURI::new(CUSTOM_PROPERTIES_URI)?;
                package.rels_mut().get_or_add(rt::CUSTOM_PROPERTIES, &partname);
                partname
            },
        };
        let blob = self.to_xml()?.into_bytes();
        match package.part_mut(&partname) {
            Some(part) => part.set_blob(blob),
            None => package.add_part(Part::new(partname, ct::OFC_CUSTOM_PROPERTIES, blob)),
        }
        Ok(())
    }

    /// Generate `docProps/custom.xml`.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let xml_err = |e: std::io::Error| Error::Xml(format!("custom properties: {}", e));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;

        let mut root = BytesStart::new("Properties");
        root.push_attribute(("xmlns", namespace::OFC_CUSTOM_PROPERTIES));
        root.push_attribute(("xmlns:vt", namespace::OFC_DOC_PROPS_VTYPES));
        writer.write_event(Event::Start(root)).map_err(xml_err)?;

        for prop in &self.properties {
            let pid = prop.pid.to_string();
            let mut property = BytesStart::new("property");
            property.push_attribute(("fmtid", FORMAT_ID));
            property.push_attribute(("pid", pid.as_str()));
            property.push_attribute(("name", prop.name.as_str()));
            writer.write_event(Event::Start(property)).map_err(xml_err)?;

            let value_name = prop.value.element_name();
            let value_text = prop.value.to_xml_string();
            writer
                .write_event(Event::Start(BytesStart::new(value_name)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::Text(BytesText::new(&value_text)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(value_name)))
                .map_err(xml_err)?;

            writer
                .write_event(Event::End(BytesEnd::new("property")))
                .map_err(xml_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("Properties")))
            .map_err(xml_err)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| Error::Xml(format!("Invalid UTF-8 in generated XML: {}", e)))
    }

    /// Parse `docProps/custom.xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);

        let mut props = Self::new();
        let mut max_pid = 1;
        let mut current: Option<(String, i32)> = None;
        let mut value_type: Option<String> = None;
        let mut text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"property" => {
                        let mut name = None;
                        let mut pid = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.local_name().as_ref() {
                                b"name" => name = Some(attr.unescape_value()?.into_owned()),
                                b"pid" => pid = atoi_simd::parse::<i32>(&attr.value).ok(),
                                _ => {},
                            }
                        }
                        if let (Some(name), Some(pid)) = (name, pid) {
                            max_pid = max_pid.max(pid);
                            current = Some((name, pid));
                        }
                    },
                    local if current.is_some() => {
                        value_type = Some(String::from_utf8_lossy(local).into_owned());
                        text.clear();
                    },
                    _ => {},
                },
                Event::Text(e) => {
                    if value_type.is_some() {
                        text.push_str(&unescape_xml(std::str::from_utf8(e.as_ref())?));
                    }
                },
                Event::CData(e) => {
                    if value_type.is_some() {
                        text.push_str(std::str::from_utf8(e.as_ref())?);
                    }
                },
                Event::GeneralRef(e) => {
                    if value_type.is_some() {
                        let name = std::str::from_utf8(e.as_ref())?;
                        match resolve_reference(name) {
                            Some(resolved) => text.push_str(&resolved),
                            None => text.push_str(&format!("&{};", name)),
                        }
                    }
                },
                Event::End(e) => {
                    if e.local_name().as_ref() == b"property" {
                        current = None;
                    } else if let Some(local) = value_type.take()
                        && let Some((name, pid)) = &current
                        && let Some(value) = PropertyValue::from_xml_string(&local, text.trim())?
                    {
                        props.properties.push(CustomProperty {
                            name: name.clone(),
                            value,
                            pid: *pid,
                        });
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        props.properties.sort_by_key(|p| p.pid);
        props.next_pid = max_pid + 1;
        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_set_keeps_pid() {
        let mut props = CustomProperties::new();
        assert!(props.set("Signer", PropertyValue::String("Ana".into())).is_none());
        props.set("Count", PropertyValue::Integer(1));
        let old = props.set("Signer", PropertyValue::String("Bo".into()));
        assert_eq!(old, Some(PropertyValue::String("Ana".into())));

        let xml = props.to_xml().unwrap();
        assert!(xml.contains(r#"pid="2" name="Signer""#));
        assert!(xml.contains(r#"pid="3" name="Count""#));
    }

    #[test]
    fn test_xml_parsing() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="Client">
        <vt:lpwstr>Smith &amp; Co</vt:lpwstr>
    </property>
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="5" name="Approved">
        <vt:bool>true</vt:bool>
    </property>
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="3" name="Blob">
        <vt:blob>AAAA</vt:blob>
    </property>
</Properties>"#;

        let mut props = CustomProperties::from_xml(xml).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("Client").and_then(PropertyValue::as_str), Some("Smith & Co"));
        assert_eq!(props.get("Approved"), Some(&PropertyValue::Boolean(true)));

        props.set("New", PropertyValue::Integer(7));
        assert!(props.to_xml().unwrap().contains(r#"pid="6" name="New""#));
    }

    #[test]
    fn test_filetime_roundtrip() {
        let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut props = CustomProperties::new();
        props.set("SignedAt", PropertyValue::DateTime(when));
        let parsed = CustomProperties::from_xml(props.to_xml().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed.get("SignedAt"), Some(&PropertyValue::DateTime(when)));
    }

    #[test]
    fn test_entity_values_keep_inner_spaces() {
        let xml = br#"<Properties xmlns:vt="urn:vt">
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="Signer"><vt:lpwstr>Legal &#38; Compliance</vt:lpwstr></property>
    <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="3" name="Team"><vt:lpwstr> R &amp; D </vt:lpwstr></property>
</Properties>"#;

        let props = CustomProperties::from_xml(xml).unwrap();
        assert_eq!(
            props.get("Signer").and_then(PropertyValue::as_str),
            Some("Legal & Compliance")
        );
        assert_eq!(props.get("Team").and_then(PropertyValue::as_str), Some("R & D"));

        let mut written = CustomProperties::new();
        written.set("Signer", PropertyValue::String("Legal & Compliance".into()));
        let parsed = CustomProperties::from_xml(written.to_xml().unwrap().as_bytes()).unwrap();
        assert_eq!(
            parsed.get("Signer").and_then(PropertyValue::as_str),
            Some("Legal & Compliance")
        );
    }
}
