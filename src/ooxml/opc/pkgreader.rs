//! Deserialization of an OPC package into parts and relationships.
//!
//! Every ZIP member other than `[Content_Types].xml` and the `.rels` parts
//! becomes a [`Part`]; parts are kept even when nothing relates to them so a
//! rewritten package carries the same members as the original.

use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::Part;
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::rel::Relationships;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::{BTreeMap, HashMap};

/// Content type lookup by part name or extension.
///
/// Implements the OPC discovery order: an Override for the exact part name
/// wins, then a Default for the extension.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeMap {
    defaults: BTreeMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Parse `[Content_Types].xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let kind = match e.local_name().as_ref() {
                        b"Default" => Some(true),
                        b"Override" => Some(false),
                        _ => None,
                    };

                    if let Some(is_default) = kind {
                        // Extension for Default, PartName for Override
                        let mut key = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Extension" | b"PartName" => {
                                    key = Some(attr.unescape_value()?.into_owned())
                                },
                                b"ContentType" => content_type = Some(attr.unescape_value()?.into_owned()),
                                _ => {},
                            }
                        }

                        if let (Some(key), Some(content_type)) = (key, content_type) {
                            if is_default {
                                map.defaults.insert(key.to_ascii_lowercase(), content_type);
                            } else {
                                map.overrides.insert(key, content_type);
                            }
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Content type for a part name.
    pub fn get(&self, uri: &PackURI) -> Option<&str> {
        if let Some(found) = self.overrides.get(uri.as_str()) {
            return Some(found);
        }
        self.defaults
            .get(&uri.ext().to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Default (extension) mappings.
    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }
}

/// Parts and relationships read from a physical package.
pub struct PackageReader {
    /// Content types as declared by the package
    pub content_types: ContentTypeMap,
    /// Package-level relationships (`/_rels/.rels`)
    pub pkg_rels: Relationships,
    /// Every part in archive order
    pub parts: Vec<Part>,
}

impl PackageReader {
    /// Split a physical package into parts.
    pub fn from_phys_reader(mut phys: PhysPkgReader) -> Result<Self> {
        let ct_member = CONTENT_TYPES_URI.trim_start_matches('/');
        let ct_xml = phys
            .take(ct_member)
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()))?;
        let content_types = ContentTypeMap::from_xml(&ct_xml)?;

        let package_uri = PackURI::new(PACKAGE_URI)?;
        let pkg_rels = Self::load_rels(&mut phys, &package_uri)?;
        if pkg_rels.is_empty() {
            return Err(OpcError::PartNotFound(package_uri.rels_uri().to_string()));
        }

        let names: Vec<String> = phys
            .member_names()
            .iter()
            .filter(|name| name.as_str() != ct_member)
            .cloned()
            .collect();

        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            let partname = PackURI::from_membername(&name)?;
            if partname.is_rels() {
                continue;
            }
            let rels = Self::load_rels(&mut phys, &partname)?;
            let Some(blob) = phys.take(&name) else {
                continue;
            };
            let content_type = content_types.get(&partname).unwrap_or(ct::OCTET_STREAM).to_string();
            parts.push(Part::with_rels(partname, content_type, blob, rels));
        }

        Ok(Self {
            content_types,
            pkg_rels,
            parts,
        })
    }

    /// Relationships whose source is `source_uri`; empty when there is no
    /// `.rels` part for it.
    fn load_rels(phys: &mut PhysPkgReader, source_uri: &PackURI) -> Result<Relationships> {
        let rels_uri = source_uri.rels_uri();
        match phys.take(rels_uri.membername()) {
            Some(xml) => Relationships::from_xml(source_uri.base_uri(), &xml),
            None => Ok(Relationships::new(source_uri.base_uri())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_map() {
        let xml = br#"<?xml version="1.0"?>
            <Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Default Extension="XML" ContentType="application/xml"/>
                <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
                <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
            </Types>"#;

        let map = ContentTypeMap::from_xml(xml).unwrap();

        let uri = PackURI::new("/word/other.xml").unwrap();
        assert_eq!(map.get(&uri), Some("application/xml"));

        let uri = PackURI::new("/word/document.xml").unwrap();
        assert_eq!(map.get(&uri), Some(ct::WML_DOCUMENT_MAIN));

        let uri = PackURI::new("/media/image1.png").unwrap();
        assert_eq!(map.get(&uri), None);
    }
}
