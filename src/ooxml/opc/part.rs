use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::Relationships;
/// Parts of an OPC package.
///
/// A part is a named blob with a content type and its outgoing
/// relationships. XML parts are parsed by their owners on demand and the
/// serialized result stored back with [`Part::set_blob`].
use memchr::memmem;

/// A single part within an OPC package.
#[derive(Debug, Clone)]
pub struct Part {
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
    rels: Relationships,
}

impl Part {
    /// Create a part with no relationships.
    pub fn new(partname: PackURI, content_type: impl Into<String>, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri());
        Self {
            partname,
            content_type: content_type.into(),
            blob,
            rels,
        }
    }

    /// Create a part with previously loaded relationships.
    pub fn with_rels(
        partname: PackURI,
        content_type: impl Into<String>,
        blob: Vec<u8>,
        rels: Relationships,
    ) -> Self {
        Self {
            partname,
            content_type: content_type.into(),
            blob,
            rels,
        }
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Replace the part content.
    #[inline]
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Add or get a relationship to another part, returning its rId.
    pub fn relate_to(&mut self, target: &PackURI, reltype: &str) -> String {
        self.rels.get_or_add(reltype, target)
    }

    /// Whether the blob contains `needle` as a byte sequence.
    pub fn contains_bytes(&self, needle: &[u8]) -> bool {
        memmem::find(&self.blob, needle).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;

    #[test]
    fn test_relate_to_uses_part_directory() {
        let mut part = Part::new(
            PackURI::new("/word/document.xml").unwrap(),
            "application/xml",
            b"<w:document/>".to_vec(),
        );
        let target = PackURI::new("/word/footnotes.xml").unwrap();
        let r_id = part.relate_to(&target, rt::FOOTNOTES);
        assert_eq!(part.rels().get(&r_id).unwrap().target_ref(), "footnotes.xml");
        assert!(part.contains_bytes(b"w:document"));
    }
}
