//! Comment index for Word documents.
//!
//! Comments come from `word/comments.xml`; their resolved/parent state from
//! `word/commentsExtended.xml`, linked through the `w14:paraId` of each
//! comment's last paragraph. Anchors are located through the
//! `commentRangeStart`/`commentRangeEnd`/`commentReference` markers in body
//! paragraphs.

use crate::common::error::{Error, Result};
use crate::common::xml::XmlElement;
use crate::ooxml::docx::document::Document;
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::metadata::parse_datetime;
use crate::ooxml::opc::constants::relationship_type as rt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Where a comment is anchored: a run span inside one body paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommentAnchor {
    pub paragraph_index: usize,
    /// First run covered, counted from 0 within the paragraph
    pub start_run: usize,
    /// Last run covered, inclusive
    pub end_run: usize,
}

/// A comment in a Word document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: u32,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<CommentAnchor>,
    /// The anchor could not be located in a body paragraph
    pub orphaned: bool,
    pub done: bool,
    /// Id of the comment this one replies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
}

/// Extended state of one comment paragraph.
#[derive(Debug, Default)]
struct CommentEx {
    done: bool,
    parent_para: Option<String>,
}

/// Every comment of a document, in `comments.xml` order.
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    records: Vec<CommentRecord>,
    paragraph_count: usize,
}

impl CommentIndex {
    /// Build the index for a package. A document without a comments part
    /// has an empty index.
    pub fn load(package: &DocxPackage) -> Result<Self> {
        let doc = package.document();
        let paragraph_count = doc.paragraph_count();
        let Some(comments) = package.read_related_xml(rt::COMMENTS)? else {
            return Ok(Self {
                records: Vec::new(),
                paragraph_count,
            });
        };
        let extended = match package.read_related_xml(rt::COMMENTS_EXTENDED)? {
            Some(xml) => parse_extended(&xml.root),
            None => HashMap::new(),
        };
        let anchors = locate_anchors(doc);

        let mut para_ids: HashMap<String, u32> = HashMap::new();
        let mut pending_parent: Vec<(usize, String)> = Vec::new();
        let mut records = Vec::new();

        for el in comments.root.elements().filter(|el| el.is("comment")) {
            let Some(id) = el
                .attr("w:id")
                .and_then(|v| atoi_simd::parse::<u32>(v.trim().as_bytes()).ok())
            else {
                log::warn!("skipping comment without a numeric id");
                continue;
            };
            let timestamp = el.attr("w:date").and_then(|d| parse_datetime(d).ok());
            let text = el
                .find_all("p")
                .iter()
                .map(|p| p.text())
                .collect::<Vec<_>>()
                .join("\n");

            let mut done = false;
            if let Some(para_id) = el.find_all("p").last().and_then(|p| p.attr("w14:paraId")) {
                para_ids.insert(para_id.to_string(), id);
                if let Some(ex) = extended.get(para_id) {
                    done = ex.done;
                    if let Some(parent) = &ex.parent_para {
                        pending_parent.push((records.len(), parent.clone()));
                    }
                }
            }

            let anchor = anchors.get(&id).copied();
            if anchor.is_none() {
                log::warn!("comment {} has no anchor in the document body", id);
            }
            records.push(CommentRecord {
                id,
                author: el.attr("w:author").unwrap_or_default().to_string(),
                initials: el.attr("w:initials").map(str::to_string),
                timestamp,
                text,
                anchor,
                orphaned: anchor.is_none(),
                done,
                parent: None,
            });
        }
        for (slot, parent_para) in pending_parent {
            records[slot].parent = para_ids.get(&parent_para).copied();
        }

        Ok(Self {
            records,
            paragraph_count,
        })
    }

    pub fn all(&self) -> &[CommentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Comments whose author equals `author`, ignoring case.
    pub fn by_author(&self, author: &str) -> Vec<&CommentRecord> {
        let wanted = author.trim().to_lowercase();
        self.records
            .iter()
            .filter(|c| c.author.to_lowercase() == wanted)
            .collect()
    }

    /// Comments anchored inside the paragraph at `index`.
    pub fn for_paragraph(&self, index: usize) -> Result<Vec<&CommentRecord>> {
        if index >= self.paragraph_count {
            return Err(Error::NotFound(format!(
                "paragraph index {} out of range (document has {} paragraphs)",
                index, self.paragraph_count
            )));
        }
        Ok(self
            .records
            .iter()
            .filter(|c| c.anchor.is_some_and(|a| a.paragraph_index == index))
            .collect())
    }
}

fn parse_extended(root: &XmlElement) -> HashMap<String, CommentEx> {
    root.elements()
        .filter(|el| el.is("commentEx"))
        .filter_map(|el| {
            let para_id = el.attr("paraId")?.to_string();
            let ex = CommentEx {
                done: matches!(el.attr("done"), Some("1" | "true")),
                parent_para: el.attr("paraIdParent").map(str::to_string),
            };
            Some((para_id, ex))
        })
        .collect()
}

#[derive(Debug, Default)]
struct Marks {
    start: Option<(usize, usize)>,
    end: Option<(usize, usize)>,
    reference: Option<(usize, usize)>,
}

/// Anchor of every comment id found in body paragraphs.
fn locate_anchors(doc: &Document) -> HashMap<u32, CommentAnchor> {
    let mut marks: HashMap<u32, Marks> = HashMap::new();
    for (paragraph_index, para) in doc.paragraphs().enumerate() {
        let mut runs = 0usize;
        scan(para.element(), paragraph_index, &mut runs, &mut marks);
    }

    marks
        .into_iter()
        .filter_map(|(id, m)| {
            let anchor = match (m.start, m.end, m.reference) {
                (Some((p, start)), end, _) => {
                    let end_run = match end {
                        Some((q, end)) if q == p => end.max(start),
                        _ => start,
                    };
                    CommentAnchor {
                        paragraph_index: p,
                        start_run: start,
                        end_run,
                    }
                },
                (None, _, Some((p, run))) => CommentAnchor {
                    paragraph_index: p,
                    start_run: run,
                    end_run: run,
                },
                _ => return None,
            };
            Some((id, anchor))
        })
        .collect()
}

fn marker_id(el: &XmlElement) -> Option<u32> {
    el.attr("w:id")
        .and_then(|v| atoi_simd::parse::<u32>(v.trim().as_bytes()).ok())
}

/// Walk paragraph content in order, counting runs and recording markers.
fn scan(el: &XmlElement, paragraph: usize, runs: &mut usize, marks: &mut HashMap<u32, Marks>) {
    for child in el.elements() {
        match child.local_name() {
            "commentRangeStart" => {
                if let Some(id) = marker_id(child) {
                    marks.entry(id).or_default().start = Some((paragraph, *runs));
                }
            },
            "commentRangeEnd" => {
                if let Some(id) = marker_id(child) {
                    marks.entry(id).or_default().end = Some((paragraph, runs.saturating_sub(1)));
                }
            },
            "r" => {
                if let Some(id) = child.child("commentReference").and_then(marker_id) {
                    marks.entry(id).or_default().reference = Some((paragraph, *runs));
                }
                *runs += 1;
            },
            _ => scan(child, paragraph, runs, marks),
        }
    }
}
