/// In-memory OPC package.
///
/// `OpcPackage` holds every part of a package together with the
/// package-level relationships, and writes the whole package back out.
use crate::ooxml::opc::constants::relationship_type;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::Part;
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::pkgreader::PackageReader;
use crate::ooxml::opc::pkgwriter::PackageWriter;
use crate::ooxml::opc::rel::Relationships;
use std::collections::BTreeMap;
use std::path::Path;

/// An Open Packaging Convention package held fully in memory.
#[derive(Debug, Clone)]
pub struct OpcPackage {
    rels: Relationships,
    parts: BTreeMap<PackURI, Part>,
    default_types: BTreeMap<String, String>,
}

impl OpcPackage {
    /// Create an empty package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI),
            parts: BTreeMap::new(),
            default_types: BTreeMap::new(),
        }
    }

    /// Open a package file.
    ///
    /// # Example
    /// ```no_run
    /// use docsmith::ooxml::opc::OpcPackage;
    ///
    /// let pkg = OpcPackage::open("report.docx")?;
    /// println!("{} parts", pkg.iter_parts().count());
    /// # Ok::<(), docsmith::ooxml::opc::error::OpcError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load a package from its serialized bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let phys = PhysPkgReader::from_bytes(data)?;
        let reader = PackageReader::from_phys_reader(phys)?;

        let mut package = Self::new();
        package.rels = reader.pkg_rels;
        package.default_types = reader.content_types.defaults().clone();
        for part in reader.parts {
            package.parts.insert(part.partname().clone(), part);
        }
        Ok(package)
    }

    /// Serialize the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }

    /// Package-level relationships.
    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Extension → content type defaults declared by the package.
    #[inline]
    pub fn default_content_types(&self) -> &BTreeMap<String, String> {
        &self.default_types
    }

    /// Declare an extension default.
    pub fn set_default_content_type(&mut self, ext: &str, content_type: &str) {
        self.default_types
            .insert(ext.to_ascii_lowercase(), content_type.to_string());
    }

    /// Look up a part by name.
    pub fn part(&self, partname: &PackURI) -> Option<&Part> {
        self.parts.get(partname)
    }

    pub fn part_mut(&mut self, partname: &PackURI) -> Option<&mut Part> {
        self.parts.get_mut(partname)
    }

    /// Look up a part, failing with `PartNotFound`.
    pub fn require_part(&self, partname: &PackURI) -> Result<&Part> {
        self.part(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    pub fn require_part_mut(&mut self, partname: &PackURI) -> Result<&mut Part> {
        self.parts
            .get_mut(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Whether a part exists.
    #[inline]
    pub fn contains(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname)
    }

    /// Add or replace a part.
    pub fn add_part(&mut self, part: Part) {
        self.parts.insert(part.partname().clone(), part);
    }

    /// Remove a part.
    pub fn remove_part(&mut self, partname: &PackURI) -> Option<Part> {
        self.parts.remove(partname)
    }

    /// Iterate over all parts, ordered by part name.
    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    /// Part name of the main document (target of the `officeDocument`
    /// package relationship).
    pub fn main_document_partname(&self) -> Result<PackURI> {
        let rel = self.rels.part_with_reltype(relationship_type::OFFICE_DOCUMENT)?;
        self.rels.target_partname(rel)
    }

    /// Part name of a package-level related part, if present.
    pub fn package_related_partname(&self, reltype: &str) -> Option<PackURI> {
        let rel = self.rels.all_with_reltype(reltype).next()?;
        self.rels.target_partname(rel).ok()
    }

    /// First unused part name for a `%d` template, e.g. `/word/media/image%d.png`.
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        for n in 1..=self.parts.len() + 1 {
            let candidate = PackURI::new(template.replacen("%d", &n.to_string(), 1))?;
            if !self.parts.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(OpcError::InvalidPackUri(template.to_string()))
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::content_type as ct;

    fn minimal() -> OpcPackage {
        let mut pkg = OpcPackage::new();
        let doc = PackURI::new("/word/document.xml").unwrap();
        pkg.rels_mut()
            .get_or_add(relationship_type::OFFICE_DOCUMENT, &doc);
        pkg.add_part(Part::new(doc, ct::WML_DOCUMENT_MAIN, b"<w:document/>".to_vec()));
        pkg.add_part(Part::new(
            PackURI::new("/media/image1.png").unwrap(),
            "image/png",
            vec![0x89, b'P', b'N', b'G'],
        ));
        pkg.set_default_content_type("png", "image/png");
        pkg
    }

    #[test]
    fn test_roundtrip_bytes() {
        let pkg = minimal();
        let bytes = pkg.to_bytes().unwrap();
        let loaded = OpcPackage::from_bytes(&bytes).unwrap();

        let main = loaded.main_document_partname().unwrap();
        assert_eq!(main.as_str(), "/word/document.xml");
        assert_eq!(loaded.require_part(&main).unwrap().content_type(), ct::WML_DOCUMENT_MAIN);

        let image = PackURI::new("/media/image1.png").unwrap();
        assert_eq!(loaded.require_part(&image).unwrap().content_type(), "image/png");
        assert_eq!(loaded.iter_parts().count(), 2);
    }

    #[test]
    fn test_next_partname() {
        let pkg = minimal();
        let next = pkg.next_partname("/media/image%d.png").unwrap();
        assert_eq!(next.as_str(), "/media/image2.png");
    }

    #[test]
    fn test_missing_content_types_is_error() {
        let mut writer = crate::ooxml::opc::phys_pkg::PhysPkgWriter::new();
        writer
            .write(&PackURI::new("/word/document.xml").unwrap(), b"<w:document/>")
            .unwrap();
        let bytes = writer.finish().unwrap();
        assert!(matches!(
            OpcPackage::from_bytes(&bytes),
            Err(OpcError::PartNotFound(_))
        ));
    }
}
