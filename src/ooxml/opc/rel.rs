use crate::common::xml::escape_xml;
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
/// Relationship-related objects for OPC packages.
///
/// A relationships part lists typed links from one source (a part or the
/// package itself) to other parts or to external URLs.
use quick_xml::Reader;
use quick_xml::events::Event;

/// A single relationship from a source to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    is_external: bool,
}

impl Relationship {
    /// Create a relationship.
    pub fn new(r_id: String, reltype: String, target_ref: String, is_external: bool) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            is_external,
        }
    }

    /// Relationship ID (e.g., "rId1").
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Relationship type URI.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target reference as written in the relationships part.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Whether the target is outside the package.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

/// Ordered collection of relationships from a single source.
///
/// Document order is kept so that a part round-trips unchanged when no
/// relationship was added or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationships {
    base_uri: String,
    rels: Vec<Relationship>,
}

impl Relationships {
    /// Create an empty collection whose relative targets resolve against
    /// `base_uri` (the source part's directory).
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: Vec::new(),
        }
    }

    /// Parse a `.rels` part.
    pub fn from_xml(base_uri: impl Into<String>, xml: &[u8]) -> Result<Self> {
        let mut rels = Self::new(base_uri);
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut is_external = false;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(attr.unescape_value()?.into_owned()),
                                b"Type" => reltype = Some(attr.unescape_value()?.into_owned()),
                                b"Target" => target_ref = Some(attr.unescape_value()?.into_owned()),
                                b"TargetMode" => {
                                    is_external = attr.unescape_value()? == target_mode::EXTERNAL
                                },
                                _ => {},
                            }
                        }

                        if let (Some(id), Some(rt), Some(tr)) = (r_id, reltype, target_ref) {
                            rels.rels.push(Relationship::new(id, rt, tr, is_external));
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Directory that relative targets resolve against.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Get a relationship by its ID.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// Resolved part name of an internal relationship.
    pub fn target_partname(&self, rel: &Relationship) -> Result<PackURI> {
        if rel.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} targets an external resource",
                rel.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &rel.target_ref)
    }

    /// Get or add an internal relationship to `target`, returning its ID.
    ///
    /// A new relationship takes the lowest free `rIdN`.
    pub fn get_or_add(&mut self, reltype: &str, target: &PackURI) -> String {
        let target_ref = target.relative_ref(&self.base_uri);
        if let Some(rel) = self.rels.iter().find(|rel| {
            !rel.is_external && rel.reltype == reltype && rel.target_ref == target_ref
        }) {
            return rel.r_id.clone();
        }

        let r_id = self.next_r_id();
        self.rels.push(Relationship::new(
            r_id.clone(),
            reltype.to_string(),
            target_ref,
            false,
        ));
        r_id
    }

    /// Lowest unused relationship ID in the form `rIdN`.
    fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|rel| {
                rel.r_id
                    .strip_prefix("rId")
                    .and_then(|n| atoi_simd::parse::<u32>(n.as_bytes()).ok())
            })
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for num in used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }
        format!("rId{}", next)
    }

    /// All relationships of a type.
    pub fn all_with_reltype<'a, 'r>(
        &'a self,
        reltype: &'r str,
    ) -> impl Iterator<Item = &'a Relationship> + use<'a, 'r> {
        self.rels.iter().filter(move |rel| rel.reltype == reltype)
    }

    /// The single relationship of a type.
    ///
    /// Returns an error if there is none, or more than one.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.all_with_reltype(reltype);
        let first = matching.next().ok_or_else(|| {
            OpcError::RelationshipNotFound(format!("no relationship of type '{}'", reltype))
        })?;
        if matching.next().is_some() {
            return Err(OpcError::InvalidRelationship(format!(
                "multiple relationships of type '{}'",
                reltype
            )));
        }
        Ok(first)
    }

    /// Iterate in document order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|rel| rel.r_id == r_id)?;
        Some(self.rels.remove(pos))
    }

    /// Serialize to `.rels` XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);
        xml.push_str(crate::common::xml::node::XML_DECLARATION);
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(namespace::OPC_RELATIONSHIPS);
        xml.push_str(r#"">"#);

        for rel in &self.rels {
            xml.push_str(r#"<Relationship Id=""#);
            xml.push_str(&escape_xml(&rel.r_id));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_xml(&rel.reltype));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_xml(&rel.target_ref));
            xml.push('"');
            if rel.is_external {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/")
    }
}
