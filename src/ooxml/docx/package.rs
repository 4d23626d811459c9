/// Package implementation for Word documents.
///
/// [`DocxPackage`] wraps an OPC package together with the parsed main
/// document. Loading goes through [`LoadedPackage`], which splits packages
/// whose editing is restricted into a read-only [`ProtectedPackage`] so that
/// mutations can only be written against the editable variant.
use crate::common::error::{Error, Result};
use crate::common::xml::XmlDocument;
use crate::ooxml::docx::document::Document;
use crate::ooxml::docx::settings::{ProtectionDescriptor, Settings};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{OpcPackage, PackURI, Part};
use std::path::Path;

/// Content types accepted for the main document part.
const MAIN_CONTENT_TYPES: &[&str] = &[
    ct::WML_DOCUMENT_MAIN,
    ct::WML_TEMPLATE_MAIN,
    ct::WML_DOCUMENT_MACRO,
];

/// A Word (.docx) package with its main document parsed.
///
/// # Examples
///
/// ```rust,no_run
/// use docsmith::ooxml::docx::DocxPackage;
///
/// let pkg = DocxPackage::open("document.docx")?;
/// for para in pkg.document().paragraphs() {
///     println!("{}", para.text());
/// }
/// # Ok::<(), docsmith::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocxPackage {
    opc: OpcPackage,
    main: PackURI,
    document: Document,
}

impl DocxPackage {
    /// Open a .docx package from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load a package from its serialized bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_opc(OpcPackage::from_bytes(data)?)
    }

    /// Wrap an OPC package, verifying it is a Word document.
    pub fn from_opc(opc: OpcPackage) -> Result<Self> {
        let main = opc.main_document_partname()?;
        let part = opc.require_part(&main)?;

        let content_type = part.content_type();
        if !MAIN_CONTENT_TYPES.contains(&content_type) {
            return Err(Error::InvalidFormat(format!(
                "main part {} has content type {}, expected {}",
                main,
                content_type,
                ct::WML_DOCUMENT_MAIN
            )));
        }

        let document = Document::parse(part.blob())?;
        Ok(Self { opc, main, document })
    }

    /// Serialize the package, writing the document model back first.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush()?;
        Ok(self.opc.to_bytes()?)
    }

    /// Store the document model into the main part.
    pub fn flush(&mut self) -> Result<()> {
        let blob = self.document.to_xml().into_bytes();
        self.opc.require_part_mut(&self.main)?.set_blob(blob);
        Ok(())
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    #[inline]
    pub fn opc(&self) -> &OpcPackage {
        &self.opc
    }

    #[inline]
    pub fn opc_mut(&mut self) -> &mut OpcPackage {
        &mut self.opc
    }

    #[inline]
    pub fn main_partname(&self) -> &PackURI {
        &self.main
    }

    /// The main document part.
    pub fn main_part(&self) -> Result<&Part> {
        Ok(self.opc.require_part(&self.main)?)
    }

    /// Part name targeted by a relationship of the main part.
    pub fn related_partname(&self, reltype: &str) -> Option<PackURI> {
        let rels = self.opc.part(&self.main)?.rels();
        let rel = rels.all_with_reltype(reltype).next()?;
        rels.target_partname(rel).ok()
    }

    /// Parse the part targeted from the main part by `reltype`.
    ///
    /// `Ok(None)` when there is no such relationship. A relationship whose
    /// target is missing is a structural error.
    pub fn read_related_xml(&self, reltype: &str) -> Result<Option<XmlDocument>> {
        let Some(partname) = self.related_partname(reltype) else {
            return Ok(None);
        };
        let part = self.opc.part(&partname).ok_or_else(|| {
            Error::StructuralInconsistency(format!(
                "relationship {} points at missing part {}",
                reltype, partname
            ))
        })?;
        Ok(Some(XmlDocument::parse(part.blob())?))
    }

    /// Replace the content of an existing part with serialized XML.
    pub fn write_part_xml(&mut self, partname: &PackURI, xml: &XmlDocument) -> Result<()> {
        self.opc.require_part_mut(partname)?.set_blob(xml.to_bytes());
        Ok(())
    }

    /// Find the part related by `reltype`, creating it from `template` under
    /// `default_name` (and relating it to the main part) when neither the
    /// relationship nor a part of that name exist.
    pub fn ensure_related_part(
        &mut self,
        reltype: &str,
        default_name: &str,
        content_type: &str,
        template: &str,
    ) -> Result<PackURI> {
        if let Some(partname) = self.related_partname(reltype) {
            return Ok(partname);
        }
        let partname = PackURI::new(default_name)?;
        if !self.opc.contains(&partname) {
            self.opc.add_part(Part::new(
                partname.clone(),
                content_type,
                template.as_bytes().to_vec(),
            ));
        }
        self.opc
            .require_part_mut(&self.main)?
            .relate_to(&partname, reltype);
        Ok(partname)
    }

    /// Parsed `word/settings.xml`, if present.
    pub fn settings(&self) -> Result<Option<Settings>> {
        let Some(partname) = self.related_partname(rt::SETTINGS) else {
            return Ok(None);
        };
        match self.opc.part(&partname) {
            Some(part) => Ok(Some(Settings::parse(part.blob())?)),
            None => Ok(None),
        }
    }

    /// Write settings back, creating the settings part when missing.
    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let partname = self.ensure_related_part(
            rt::SETTINGS,
            "/word/settings.xml",
            ct::WML_SETTINGS,
            crate::ooxml::docx::template::default_settings_xml(),
        )?;
        self.write_part_xml(&partname, settings.xml())
    }

    /// Enforced protection descriptor, if any.
    pub fn enforced_protection(&self) -> Result<Option<ProtectionDescriptor>> {
        Ok(self
            .settings()?
            .map(|s| s.protection())
            .transpose()?
            .flatten()
            .filter(|p| p.enforced))
    }
}

/// A package whose editing is restricted.
///
/// Only read access is exposed; the protection module turns it back into an
/// editable package once the password has been verified.
#[derive(Debug, Clone)]
pub struct ProtectedPackage {
    pub(crate) inner: DocxPackage,
    pub(crate) descriptor: ProtectionDescriptor,
}

impl ProtectedPackage {
    #[inline]
    pub fn document(&self) -> &Document {
        self.inner.document()
    }

    #[inline]
    pub fn descriptor(&self) -> &ProtectionDescriptor {
        &self.descriptor
    }

    /// Read-only view of the whole package.
    #[inline]
    pub fn package(&self) -> &DocxPackage {
        &self.inner
    }
}

/// A loaded package, split by protection state.
#[derive(Debug, Clone)]
pub enum LoadedPackage {
    Editable(DocxPackage),
    Protected(ProtectedPackage),
}

impl LoadedPackage {
    /// Load and classify a package.
    pub fn load(data: &[u8]) -> Result<Self> {
        let package = DocxPackage::from_bytes(data)?;
        Ok(match package.enforced_protection()? {
            Some(descriptor) => LoadedPackage::Protected(ProtectedPackage {
                inner: package,
                descriptor,
            }),
            None => LoadedPackage::Editable(package),
        })
    }

    /// Read access regardless of protection.
    pub fn view(&self) -> &DocxPackage {
        match self {
            LoadedPackage::Editable(package) => package,
            LoadedPackage::Protected(protected) => &protected.inner,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, LoadedPackage::Protected(_))
    }

    /// The editable package; protected documents are refused.
    pub fn into_editable(self) -> Result<DocxPackage> {
        match self {
            LoadedPackage::Editable(package) => Ok(package),
            LoadedPackage::Protected(protected) => Err(Error::Authentication(format!(
                "document is protected ({}); remove the protection before editing",
                protected.descriptor.restriction.to_xml()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::settings::{EditRestriction, HashAlgorithm};
    use crate::ooxml::docx::testing::blank_docx;

    #[test]
    fn test_blank_package_is_editable() {
        let loaded = LoadedPackage::load(&blank_docx()).unwrap();
        assert!(!loaded.is_protected());
        let mut package = loaded.into_editable().unwrap();
        assert_eq!(package.document().paragraph_count(), 0);
        assert!(package.settings().unwrap().is_some());
        assert!(package.to_bytes().is_ok());
    }

    #[test]
    fn test_protected_package_refuses_mutation() {
        let mut package = DocxPackage::from_bytes(&blank_docx()).unwrap();
        let mut settings = package.settings().unwrap().unwrap();
        settings.set_protection(&ProtectionDescriptor {
            restriction: EditRestriction::ReadOnly,
            enforced: true,
            algorithm: Some(HashAlgorithm::Sha512),
            salt: Some(vec![0; 16]),
            hash: Some(vec![0; 64]),
            spin_count: 1,
            legacy: false,
        });
        package.save_settings(&settings).unwrap();
        let bytes = package.to_bytes().unwrap();

        let loaded = LoadedPackage::load(&bytes).unwrap();
        assert!(loaded.is_protected());
        assert_eq!(loaded.view().document().paragraph_count(), 0);
        assert!(matches!(loaded.into_editable(), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_ensure_related_part_creates_once() {
        let mut package = DocxPackage::from_bytes(&blank_docx()).unwrap();
        assert!(package.related_partname(rt::NUMBERING).is_none());
        let template = crate::ooxml::docx::template::default_numbering_xml();
        let first = package
            .ensure_related_part(rt::NUMBERING, "/word/numbering.xml", ct::WML_NUMBERING, template)
            .unwrap();
        let second = package
            .ensure_related_part(rt::NUMBERING, "/word/other.xml", ct::WML_NUMBERING, template)
            .unwrap();
        assert_eq!(first, second);
        assert!(package.read_related_xml(rt::NUMBERING).unwrap().is_some());
    }

    #[test]
    fn test_rejects_non_word_package() {
        let mut opc = OpcPackage::new();
        let partname = PackURI::new("/xl/workbook.xml").unwrap();
        opc.rels_mut().get_or_add(rt::OFFICE_DOCUMENT, &partname);
        opc.add_part(Part::new(partname, "application/vnd.ms-excel.main+xml", b"<workbook/>".to_vec()));
        assert!(matches!(DocxPackage::from_opc(opc), Err(Error::InvalidFormat(_))));
    }
}
