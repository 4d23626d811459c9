/// Document - the structural model of the main document part.
///
/// The body's children live in an arena addressed by [`BlockId`]; the body
/// order is a separate list of ids. Handles stay valid across insertions and
/// removals of other blocks, and positions are always derived from the
/// current order rather than stored.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement, XmlNode};
use crate::ooxml::docx::paragraph::Paragraph;
use crate::ooxml::docx::table::Table;
use smallvec::SmallVec;

/// Stable handle to a body-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

/// A body-level element.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    /// Anything else (section properties, content controls, bookmarks)
    Other(XmlNode),
}

impl Block {
    fn from_node(node: XmlNode) -> Self {
        match node {
            XmlNode::Element(el) if el.is("p") => Block::Paragraph(Paragraph::from_element(el)),
            XmlNode::Element(el) if el.is("tbl") => Block::Table(Table::from_element(el)),
            other => Block::Other(other),
        }
    }

    fn to_node(&self) -> XmlNode {
        match self {
            Block::Paragraph(p) => XmlNode::Element(p.element().clone()),
            Block::Table(t) => XmlNode::Element(t.element().clone()),
            Block::Other(node) => node.clone(),
        }
    }

    #[inline]
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The element behind this block; `None` for stray text nodes.
    pub fn element(&self) -> Option<&XmlElement> {
        match self {
            Block::Paragraph(p) => Some(p.element()),
            Block::Table(t) => Some(t.element()),
            Block::Other(node) => node.as_element(),
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            Block::Paragraph(p) => Some(p.element_mut()),
            Block::Table(t) => Some(t.element_mut()),
            Block::Other(node) => node.as_element_mut(),
        }
    }

    /// Whether this is the body's trailing `w:sectPr`.
    fn is_section_properties(&self) -> bool {
        matches!(self, Block::Other(XmlNode::Element(el)) if el.is("sectPr"))
    }
}

/// The main document: root element plus the body block arena.
#[derive(Debug, Clone)]
pub struct Document {
    /// `w:document` with an empty `w:body`
    xml: XmlDocument,
    arena: Vec<Option<Block>>,
    order: Vec<BlockId>,
}

impl Document {
    /// Parse `word/document.xml`.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut xml = XmlDocument::parse(xml)?;
        let body = xml
            .root
            .child_mut("body")
            .ok_or_else(|| Error::InvalidFormat("main document has no w:body".to_string()))?;

        let mut arena = Vec::with_capacity(body.children.len());
        let mut order = Vec::with_capacity(body.children.len());
        for node in std::mem::take(&mut body.children) {
            if let XmlNode::Text(text) = &node {
                if text.trim().is_empty() {
                    continue;
                }
            }
            order.push(BlockId(arena.len()));
            arena.push(Some(Block::from_node(node)));
        }

        Ok(Self { xml, arena, order })
    }

    /// Serialize back to `word/document.xml`.
    pub fn to_xml(&self) -> String {
        let mut xml = self.xml.clone();
        if let Some(body) = xml.root.child_mut("body") {
            body.children = self.iter().map(|(_, block)| block.to_node()).collect();
        }
        xml.to_xml()
    }

    /// The `w:document` element (body emptied).
    pub fn root(&self) -> &XmlElement {
        &self.xml.root
    }

    /// Mutable `w:document` element, e.g. for namespace declarations.
    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.xml.root
    }

    /// Blocks in body order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.order
            .iter()
            .filter_map(|id| self.arena[id.0].as_ref().map(|block| (*id, block)))
    }

    /// Mutable access to every block, in no particular order.
    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.arena.iter_mut().flatten()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.arena.get(id.0)?.as_ref()
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.arena.get_mut(id.0)?.as_mut()
    }

    /// Number of blocks in the body.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Body position of a block.
    pub fn position_of(&self, id: BlockId) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }

    /// Ids of the body paragraphs, in order. The position in this list is
    /// the paragraph index.
    pub fn paragraph_ids(&self) -> Vec<BlockId> {
        self.iter()
            .filter(|(_, block)| matches!(block, Block::Paragraph(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Body paragraphs in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.iter().filter_map(|(_, block)| block.as_paragraph())
    }

    /// Body tables in order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.iter().filter_map(|(_, block)| block.as_table())
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Id of the paragraph at `index`.
    pub fn paragraph_id(&self, index: usize) -> Result<BlockId> {
        self.paragraph_ids().get(index).copied().ok_or_else(|| {
            Error::NotFound(format!(
                "paragraph index {} is out of range (document has {} paragraphs)",
                index,
                self.paragraph_count()
            ))
        })
    }

    /// Paragraph at `index`.
    pub fn paragraph(&self, index: usize) -> Result<&Paragraph> {
        let id = self.paragraph_id(index)?;
        self.paragraph_by_id(id)
            .ok_or_else(|| Error::NotFound(format!("paragraph {}", index)))
    }

    /// Paragraph at `index`, mutably.
    pub fn paragraph_mut(&mut self, index: usize) -> Result<&mut Paragraph> {
        let id = self.paragraph_id(index)?;
        self.paragraph_by_id_mut(id)
            .ok_or_else(|| Error::NotFound(format!("paragraph {}", index)))
    }

    pub fn paragraph_by_id(&self, id: BlockId) -> Option<&Paragraph> {
        self.block(id)?.as_paragraph()
    }

    pub fn paragraph_by_id_mut(&mut self, id: BlockId) -> Option<&mut Paragraph> {
        match self.block_mut(id)? {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Paragraph index of a paragraph block.
    pub fn paragraph_index_of(&self, id: BlockId) -> Option<usize> {
        self.paragraph_ids().iter().position(|other| *other == id)
    }

    /// Paragraph index the next paragraph at or after body position `pos`
    /// would have.
    pub fn paragraph_index_at_position(&self, pos: usize) -> usize {
        self.order[..pos.min(self.order.len())]
            .iter()
            .filter(|id| matches!(self.block(**id), Some(Block::Paragraph(_))))
            .count()
    }

    /// Insert blocks at body position `pos`.
    pub fn insert_at(&mut self, pos: usize, blocks: Vec<Block>) -> SmallVec<[BlockId; 4]> {
        let pos = pos.min(self.order.len());
        let mut ids = SmallVec::new();
        for block in blocks {
            let id = BlockId(self.arena.len());
            self.arena.push(Some(block));
            ids.push(id);
        }
        self.order.splice(pos..pos, ids.iter().copied());
        ids
    }

    /// Insert blocks immediately before `anchor`.
    pub fn insert_before(&mut self, anchor: BlockId, blocks: Vec<Block>) -> Result<SmallVec<[BlockId; 4]>> {
        let pos = self.require_position(anchor)?;
        Ok(self.insert_at(pos, blocks))
    }

    /// Insert blocks immediately after `anchor`.
    pub fn insert_after(&mut self, anchor: BlockId, blocks: Vec<Block>) -> Result<SmallVec<[BlockId; 4]>> {
        let pos = self.require_position(anchor)?;
        Ok(self.insert_at(pos + 1, blocks))
    }

    /// Append a block at the end of the body, before the trailing section
    /// properties.
    pub fn append(&mut self, block: Block) -> BlockId {
        let pos = match self.order.last() {
            Some(last) if self.block(*last).is_some_and(Block::is_section_properties) => {
                self.order.len() - 1
            },
            _ => self.order.len(),
        };
        self.insert_at(pos, vec![block])[0]
    }

    /// Remove a block from the body.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let pos = self.position_of(id)?;
        self.order.remove(pos);
        self.arena.get_mut(id.0)?.take()
    }

    /// Whether the block at `id` is the trailing section properties.
    pub fn is_section_properties(&self, id: BlockId) -> bool {
        self.block(id).is_some_and(Block::is_section_properties)
    }

    fn require_position(&self, id: BlockId) -> Result<usize> {
        self.position_of(id).ok_or_else(|| {
            Error::StructuralInconsistency(format!("block {:?} is not in the document body", id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Intro</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Body</w:t></w:r></w:p>
<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>
</w:body></w:document>"#;

    fn texts(doc: &Document) -> Vec<String> {
        doc.paragraphs().map(Paragraph::text).collect()
    }

    #[test]
    fn test_parse_blocks() {
        let doc = Document::parse(XML.as_bytes()).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.paragraph_count(), 2);
        assert_eq!(doc.tables().count(), 1);
        assert_eq!(texts(&doc), ["Intro", "Body"]);
        assert!(matches!(doc.paragraph(2), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_ids_survive_insertion() {
        let mut doc = Document::parse(XML.as_bytes()).unwrap();
        let body = doc.paragraph_id(1).unwrap();
        doc.insert_before(body, vec![Block::Paragraph(Paragraph::with_text("New"))])
            .unwrap();
        assert_eq!(doc.paragraph_index_of(body), Some(2));
        assert_eq!(texts(&doc), ["Intro", "New", "Body"]);
    }

    #[test]
    fn test_append_before_section_properties() {
        let mut doc = Document::parse(XML.as_bytes()).unwrap();
        let id = doc.append(Block::Paragraph(Paragraph::with_text("End")));
        assert_eq!(doc.position_of(id), Some(3));
        let (last, _) = doc.iter().last().unwrap();
        assert!(doc.is_section_properties(last));
    }

    #[test]
    fn test_remove_and_serialize() {
        let mut doc = Document::parse(XML.as_bytes()).unwrap();
        let intro = doc.paragraph_id(0).unwrap();
        assert!(doc.remove(intro).is_some());
        assert!(doc.remove(intro).is_none());

        let xml = doc.to_xml();
        assert!(!xml.contains("Intro"));
        let reparsed = Document::parse(xml.as_bytes()).unwrap();
        assert_eq!(texts(&reparsed), ["Body"]);
        assert_eq!(reparsed.len(), 3);
    }

    #[test]
    fn test_missing_body() {
        let xml = br#"<w:document xmlns:w="urn:w"/>"#;
        assert!(matches!(Document::parse(xml), Err(Error::InvalidFormat(_))));
    }
}
