//! Serialization of an in-memory OPC package back into a ZIP container.

use crate::common::xml::escape_xml;
use crate::common::xml::node::XML_DECLARATION;
use crate::ooxml::opc::constants::{content_type as ct, namespace};
use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::package::OpcPackage;
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgWriter;
use std::collections::BTreeMap;

/// Writes `[Content_Types].xml`, `_rels/.rels`, then every part followed by
/// its relationships part.
pub struct PackageWriter;

impl PackageWriter {
    /// Serialize an OPC package to bytes.
    pub fn to_bytes(package: &OpcPackage) -> Result<Vec<u8>> {
        let mut phys_writer = PhysPkgWriter::new();

        let cti = ContentTypesItem::from_package(package);
        phys_writer.write(&PackURI::new(CONTENT_TYPES_URI)?, cti.to_xml().as_bytes())?;

        let package_uri = PackURI::new(PACKAGE_URI)?;
        phys_writer.write(&package_uri.rels_uri(), package.rels().to_xml().as_bytes())?;

        for part in package.iter_parts() {
            phys_writer.write(part.partname(), part.blob())?;
            if !part.rels().is_empty() {
                let rels_xml = part.rels().to_xml();
                phys_writer.write(&part.partname().rels_uri(), rels_xml.as_bytes())?;
            }
        }

        phys_writer.finish()
    }
}

/// Builder for `[Content_Types].xml`.
struct ContentTypesItem {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypesItem {
    /// Start from the package's declared defaults so that members such as
    /// images keep their extension mapping.
    fn from_package(package: &OpcPackage) -> Self {
        let mut defaults = package.default_content_types().clone();
        defaults
            .entry("rels".to_string())
            .or_insert_with(|| ct::OPC_RELATIONSHIPS.to_string());
        defaults
            .entry("xml".to_string())
            .or_insert_with(|| ct::XML.to_string());

        let mut cti = Self {
            defaults,
            overrides: BTreeMap::new(),
        };
        for part in package.iter_parts() {
            cti.add_content_type(part.partname(), part.content_type());
        }
        cti
    }

    fn add_content_type(&mut self, partname: &PackURI, content_type: &str) {
        let ext = partname.ext().to_ascii_lowercase();
        if self.defaults.get(&ext).is_some_and(|default| default == content_type) {
            return;
        }
        self.overrides
            .insert(partname.to_string(), content_type.to_string());
    }

    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);
        xml.push_str(XML_DECLARATION);
        xml.push_str(r#"<Types xmlns=""#);
        xml.push_str(namespace::OPC_CONTENT_TYPES);
        xml.push_str(r#"">"#);

        for (ext, content_type) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            ));
        }
        for (partname, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            ));
        }

        xml.push_str("</Types>");
        xml
    }
}
