//! Mutable XML element tree for in-place part editing.
//!
//! Parts are parsed with quick-xml's streaming reader into an owned tree that
//! keeps qualified names, attribute order, text, CDATA, comments and processing
//! instructions, so that a part serialized back out differs from the input
//! only where it was edited.

use super::escape::{escape_text, escape_xml, resolve_reference, unescape_xml};
use crate::common::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Standard declaration written at the top of every serialized part.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// A node inside an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// Child element
    Element(XmlElement),
    /// Character data, stored unescaped
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment content (without the `<!--`/`-->` delimiters)
    Comment(String),
    /// Processing instruction content (without `<?`/`?>`)
    Instruction(String),
}

/// An XML element with its qualified name, attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    name: String,
    attrs: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with a qualified name such as `w:p`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder-style text appender.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(&text.into());
        self
    }

    /// Qualified name, e.g. `w:p`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local name, e.g. `p` for `w:p`.
    #[inline]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Check the local name.
    #[inline]
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// All attributes in document order.
    #[inline]
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Look up an attribute.
    ///
    /// A prefixed key (`w:val`) matches exactly; an unprefixed key (`val`)
    /// matches any attribute with that local name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        let by_local = !key.contains(':');
        self.attrs
            .iter()
            .find(|(k, _)| k == key || (by_local && local_part(k) == key))
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute by qualified name.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Remove an attribute by qualified name.
    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k == key)?;
        Some(self.attrs.remove(pos).1)
    }

    /// Rename the element, keeping attributes and children.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Append a child element.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Append text, merging with a trailing text node.
    pub fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(local))
    }

    /// First child element with the given local name, mutably.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.is(local))
    }

    /// Get the child with `qname`'s local name, inserting an empty one in
    /// schema order when missing.
    ///
    /// `preceding` lists the local names allowed before the child.
    pub fn child_or_insert(&mut self, qname: &str, preceding: &[&str]) -> &mut XmlElement {
        let local = local_part(qname);
        let pos = match self.position_of(local) {
            Some(pos) => pos,
            None => self.insert_ordered(XmlElement::new(qname), preceding),
        };
        match &mut self.children[pos] {
            XmlNode::Element(el) => el,
            _ => unreachable!("position_of and insert_ordered only return element slots"),
        }
    }

    /// Replace the first child with `element`'s local name, or insert it in
    /// schema order. Returns the child position.
    pub fn replace_or_insert(&mut self, element: XmlElement, preceding: &[&str]) -> usize {
        match self.position_of(element.local_name()) {
            Some(pos) => {
                self.children[pos] = XmlNode::Element(element);
                pos
            },
            None => self.insert_ordered(element, preceding),
        }
    }

    /// Insert after the last child whose local name is in `preceding`.
    pub fn insert_ordered(&mut self, element: XmlElement, preceding: &[&str]) -> usize {
        let pos = self
            .children
            .iter()
            .rposition(|node| matches!(node, XmlNode::Element(el) if preceding.contains(&el.local_name())))
            .map(|p| p + 1)
            .unwrap_or(0);
        self.children.insert(pos, XmlNode::Element(element));
        pos
    }

    /// Remove every child element with the given local name.
    pub fn remove_children(&mut self, local: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(el) if el.is(local)));
        before - self.children.len()
    }

    /// Position of the first child element with the given local name.
    pub fn position_of(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.is(local)))
    }

    /// Visit this element and all descendant elements, pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a XmlElement)) {
        visit(self);
        for child in self.elements() {
            child.walk(visit);
        }
    }

    /// Visit this element and all descendant elements mutably, pre-order.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut XmlElement)) {
        visit(self);
        for child in self.elements_mut() {
            child.walk_mut(visit);
        }
    }

    /// All descendant elements (excluding self) with the given local name.
    pub fn find_all(&self, local: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        for child in self.elements() {
            child.walk(&mut |el| {
                if el.is(local) {
                    found.push(el);
                }
            });
        }
        found
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                XmlNode::Element(el) => el.collect_text(out),
                _ => {},
            }
        }
    }

    /// Serialize this element into `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            node.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Serialize this element to a string.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        self.write_to(&mut out);
        out
    }
}

impl XmlNode {
    /// Serialize this node into `out`.
    pub fn write_to(&self, out: &mut String) {
        match self {
            XmlNode::Element(el) => el.write_to(out),
            XmlNode::Text(t) => out.push_str(&escape_text(t)),
            XmlNode::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            },
            XmlNode::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            },
            XmlNode::Instruction(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            },
        }
    }

    /// The element inside this node, if any.
    #[inline]
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// The element inside this node, mutably.
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// A parsed XML part: the root element plus any comments or processing
/// instructions that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    prolog: Vec<XmlNode>,
    /// The document element
    pub root: XmlElement,
}

impl XmlDocument {
    /// Wrap a root element.
    pub fn new(root: XmlElement) -> Self {
        Self {
            prolog: Vec::new(),
            root,
        }
    }

    /// Parse a UTF-8 XML part.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::with_capacity(1024);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut prolog = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let el = element_from_start(&e)?;
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Element(el))?;
                },
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Element(el))?;
                },
                Event::Text(e) => {
                    if let Some(top) = stack.last_mut() {
                        let raw = std::str::from_utf8(e.as_ref())?;
                        top.push_text(&unescape_xml(raw));
                    }
                },
                Event::GeneralRef(e) => {
                    if let Some(top) = stack.last_mut() {
                        let name = std::str::from_utf8(e.as_ref())?;
                        match resolve_reference(name) {
                            Some(resolved) => top.push_text(&resolved),
                            None => top.push_text(&format!("&{};", name)),
                        }
                    }
                },
                Event::CData(e) => {
                    let text = std::str::from_utf8(e.as_ref())?.to_string();
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::CData(text))?;
                },
                Event::Comment(e) => {
                    let text = std::str::from_utf8(e.as_ref())?.to_string();
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Comment(text))?;
                },
                Event::PI(e) => {
                    let text = std::str::from_utf8(e.as_ref())?.to_string();
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Instruction(text))?;
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!(
                "unexpected end of document inside <{}>",
                stack.last().map(|el| el.name()).unwrap_or_default()
            )));
        }
        let root = root.ok_or_else(|| Error::Xml("document has no root element".to_string()))?;
        Ok(Self { prolog, root })
    }

    /// Serialize with the standard declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(XML_DECLARATION);
        for node in &self.prolog {
            node.write_to(&mut out);
        }
        self.root.write_to(&mut out);
        out
    }

    /// Serialize to UTF-8 bytes.
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

fn local_part(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut el = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("attribute '{}': {}", key, e)))?
            .into_owned();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    prolog: &mut Vec<XmlNode>,
    node: XmlNode,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(el) => {
            if root.is_some() {
                return Err(Error::Xml("multiple root elements".to_string()));
            }
            *root = Some(el);
        },
        // Trailing comments after the root are not kept
        other if root.is_none() => prolog.push(other),
        _ => {},
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_structure() {
        let xml = br#"<?xml version="1.0"?><w:document xmlns:w="urn:w"><w:body><w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve">Tom &amp; Jerry </w:t></w:r></w:p></w:body></w:document>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert_eq!(doc.root.name(), "w:document");
        let body = doc.root.child("body").unwrap();
        let p = body.child("p").unwrap();
        assert_eq!(p.attr("w:rsidR"), Some("00A1"));
        assert_eq!(p.attr("rsidR"), Some("00A1"));
        assert_eq!(p.text(), "Tom & Jerry ");

        let out = doc.to_xml();
        assert!(out.starts_with(XML_DECLARATION));
        assert!(out.contains(r#"<w:t xml:space="preserve">Tom &amp; Jerry </w:t>"#));
    }

    #[test]
    fn test_numeric_references() {
        let doc = XmlDocument::parse(b"<a>x&#65;&#x42;y</a>").unwrap();
        assert_eq!(doc.root.text(), "xABy");
    }

    #[test]
    fn test_insert_ordered() {
        let mut rpr = XmlElement::new("w:rPr")
            .with_child(XmlElement::new("w:b"))
            .with_child(XmlElement::new("w:sz"));
        rpr.insert_ordered(XmlElement::new("w:color"), &["rFonts", "b", "i"]);
        let names: Vec<_> = rpr.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["b", "color", "sz"]);

        rpr.insert_ordered(XmlElement::new("w:rStyle"), &[]);
        assert_eq!(rpr.elements().next().unwrap().local_name(), "rStyle");
    }

    #[test]
    fn test_child_or_insert_reuses_existing() {
        let mut ppr = XmlElement::new("w:pPr").with_child(XmlElement::new("w:pStyle"));
        ppr.child_or_insert("w:pStyle", &[]).set_attr("w:val", "Heading1");
        assert_eq!(ppr.elements().count(), 1);
        assert_eq!(ppr.child("pStyle").unwrap().attr("val"), Some("Heading1"));
    }

    #[test]
    fn test_unbalanced_is_error() {
        assert!(XmlDocument::parse(b"<a><b></a>").is_err());
        assert!(XmlDocument::parse(b"").is_err());
    }
}
