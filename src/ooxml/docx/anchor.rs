//! Anchor resolution: turning a text match or explicit paragraph index into
//! a position in the document.
//!
//! An explicit index always wins over text. Text search scans body
//! paragraphs in document order and the first hit is the anchor, so the same
//! query on an unchanged document always resolves to the same place.

use crate::common::error::{Error, Result};
use crate::ooxml::docx::document::{Block, BlockId, Document};
use crate::ooxml::docx::table::CellLocation;
use serde::{Deserialize, Serialize};

/// Text matching switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    #[serde(default)]
    pub match_case: bool,
    #[serde(default)]
    pub whole_word: bool,
}

/// What to anchor on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorQuery {
    pub target_text: Option<String>,
    pub paragraph_index: Option<usize>,
    pub options: MatchOptions,
}

impl AnchorQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            target_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn index(index: usize) -> Self {
        Self {
            paragraph_index: Some(index),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }
}

/// A resolved anchor paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub id: BlockId,
    pub paragraph_index: usize,
    /// Character offset of the text match, for text queries
    pub offset: Option<usize>,
    /// Match length in characters
    pub len: usize,
}

/// One hit reported by [`AnchorResolver::all_matches`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Body paragraph index, for hits outside tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
    /// Body table index, for hits inside a table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellLocation>,
    /// Character offset inside the paragraph
    pub offset: usize,
    /// Full text of the paragraph holding the hit
    pub context: String,
}

/// Resolves anchors against one document.
pub struct AnchorResolver<'d> {
    doc: &'d Document,
}

impl<'d> AnchorResolver<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self { doc }
    }

    /// Resolve a query to the anchor paragraph.
    pub fn resolve(&self, query: &AnchorQuery) -> Result<Anchor> {
        if let Some(index) = query.paragraph_index {
            let id = self.doc.paragraph_id(index)?;
            log::debug!("anchor resolved by index {}", index);
            return Ok(Anchor {
                id,
                paragraph_index: index,
                offset: None,
                len: 0,
            });
        }
        match query.target_text.as_deref() {
            Some(text) => self.first_match(text, query.options),
            None => Err(Error::Validation(
                "either target text or a paragraph index is required".to_string(),
            )),
        }
    }

    /// First body paragraph containing `text`.
    pub fn first_match(&self, text: &str, options: MatchOptions) -> Result<Anchor> {
        check_needle(text)?;
        let needle: Vec<char> = text.chars().collect();
        for (paragraph_index, id) in self.doc.paragraph_ids().into_iter().enumerate() {
            let Some(para) = self.doc.paragraph_by_id(id) else {
                continue;
            };
            let haystack: Vec<char> = para.text().chars().collect();
            if let Some(offset) = find_all(&haystack, &needle, options).into_iter().next() {
                log::debug!(
                    "anchor '{}' resolved to paragraph {} at offset {}",
                    text,
                    paragraph_index,
                    offset
                );
                return Ok(Anchor {
                    id,
                    paragraph_index,
                    offset: Some(offset),
                    len: needle.len(),
                });
            }
        }
        Err(Error::NotFound(format!("text '{}' not found in document", text)))
    }

    /// Every occurrence of `text`, body paragraphs and table cells, in
    /// document order.
    pub fn all_matches(&self, text: &str, options: MatchOptions) -> Result<Vec<Occurrence>> {
        check_needle(text)?;
        let needle: Vec<char> = text.chars().collect();
        let mut found = Vec::new();
        let mut paragraph_index = 0;
        let mut table_index = 0;

        for (_, block) in self.doc.iter() {
            match block {
                Block::Paragraph(para) => {
                    let context = para.text();
                    let haystack: Vec<char> = context.chars().collect();
                    for offset in find_all(&haystack, &needle, options) {
                        found.push(Occurrence {
                            paragraph_index: Some(paragraph_index),
                            table_index: None,
                            cell: None,
                            offset,
                            context: context.clone(),
                        });
                    }
                    paragraph_index += 1;
                },
                Block::Table(table) => {
                    for (cell, para) in table.cell_paragraphs() {
                        let context = para.text();
                        let haystack: Vec<char> = context.chars().collect();
                        for offset in find_all(&haystack, &needle, options) {
                            found.push(Occurrence {
                                paragraph_index: None,
                                table_index: Some(table_index),
                                cell: Some(cell),
                                offset,
                                context: context.clone(),
                            });
                        }
                    }
                    table_index += 1;
                },
                Block::Other(_) => {},
            }
        }
        Ok(found)
    }
}

fn check_needle(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(Error::Validation("search text must not be empty".to_string()));
    }
    Ok(())
}

fn chars_equal(a: char, b: char, match_case: bool) -> bool {
    a == b || (!match_case && a.to_lowercase().eq(b.to_lowercase()))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Non-overlapping match offsets, in characters.
pub fn find_all(haystack: &[char], needle: &[char], options: MatchOptions) -> Vec<usize> {
    let mut hits = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return hits;
    }
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        let window = &haystack[start..start + needle.len()];
        let equal = window
            .iter()
            .zip(needle)
            .all(|(a, b)| chars_equal(*a, *b, options.match_case));
        let bounded = !options.whole_word
            || ((start == 0 || !is_word_char(haystack[start - 1]))
                && haystack
                    .get(start + needle.len())
                    .is_none_or(|c| !is_word_char(*c)));
        if equal && bounded {
            hits.push(start);
            start += needle.len();
        } else {
            start += 1;
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::document::Block;
    use crate::ooxml::docx::table::Table;
    use crate::ooxml::docx::testing::package_with;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_find_all_options() {
        let hay = chars("Cat catalog cat");
        let needle = chars("cat");
        assert_eq!(find_all(&hay, &needle, MatchOptions::default()), [0, 4, 12]);
        let case = MatchOptions { match_case: true, ..Default::default() };
        assert_eq!(find_all(&hay, &needle, case), [4, 12]);
        let word = MatchOptions { whole_word: true, ..Default::default() };
        assert_eq!(find_all(&hay, &needle, word), [0, 12]);
        assert_eq!(find_all(&chars("aaaa"), &chars("aa"), MatchOptions::default()), [0, 2]);
    }

    #[test]
    fn test_index_takes_precedence() {
        let package = package_with(&["Intro", "Body", "Conclusion"]);
        let resolver = AnchorResolver::new(package.document());
        let query = AnchorQuery {
            target_text: Some("Conclusion".into()),
            paragraph_index: Some(1),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&query).unwrap().paragraph_index, 1);
    }

    #[test]
    fn test_text_resolution_is_first_match() {
        let package = package_with(&["Intro", "Body one", "Body two"]);
        let resolver = AnchorResolver::new(package.document());
        let a = resolver.resolve(&AnchorQuery::text("body")).unwrap();
        let b = resolver.resolve(&AnchorQuery::text("body")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.paragraph_index, 1);
        assert_eq!(a.offset, Some(0));

        let strict = AnchorQuery::text("body").with_options(MatchOptions {
            match_case: true,
            whole_word: false,
        });
        assert!(matches!(resolver.resolve(&strict), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_resolution_errors() {
        let package = package_with(&["Intro"]);
        let resolver = AnchorResolver::new(package.document());
        assert!(matches!(resolver.resolve(&AnchorQuery::default()), Err(Error::Validation(_))));
        assert!(matches!(resolver.resolve(&AnchorQuery::text("")), Err(Error::Validation(_))));
        assert!(matches!(resolver.resolve(&AnchorQuery::index(3)), Err(Error::NotFound(_))));
        assert!(matches!(resolver.resolve(&AnchorQuery::text("zzz")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_all_matches_reports_tables() {
        let mut package = package_with(&["total cost", "nothing"]);
        let table = Table::new(1, 2, &[vec!["unit".into(), "total".into()]]).unwrap();
        package.document_mut().append(Block::Table(table));

        let resolver = AnchorResolver::new(package.document());
        let hits = resolver.all_matches("total", MatchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].paragraph_index, Some(0));
        assert_eq!(hits[1].table_index, Some(0));
        assert_eq!(hits[1].cell, Some(CellLocation { row: 0, col: 1, paragraph: 0 }));
    }
}
