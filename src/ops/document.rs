//! Whole-document operations: creation, queries and appends.

use crate::common::error::{Error, Result};
use crate::convert::PdfConverter;
use crate::ooxml::docx::anchor::{AnchorResolver, MatchOptions, Occurrence};
use crate::ooxml::docx::document::{Block, Document};
use crate::ooxml::docx::format::RunFormat;
use crate::ooxml::docx::insert::{heading_paragraph, styled_paragraph};
use crate::ooxml::docx::styles::Styles;
use crate::ooxml::docx::table::Table;
use crate::ooxml::metadata::CoreProperties;
use crate::workspace::{DocumentEntry, Workspace};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    pub paragraphs: usize,
    pub tables: usize,
    pub words: usize,
    pub protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineParagraph {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineTable {
    pub index: usize,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub paragraphs: Vec<OutlineParagraph>,
    pub tables: Vec<OutlineTable>,
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn word_count(doc: &Document) -> usize {
    let mut words = 0;
    for (_, block) in doc.iter() {
        match block {
            Block::Paragraph(p) => words += p.text().split_whitespace().count(),
            Block::Table(t) => {
                words += t
                    .cell_paragraphs()
                    .iter()
                    .map(|(_, p)| p.text().split_whitespace().count())
                    .sum::<usize>();
            },
            Block::Other(_) => {},
        }
    }
    words
}

pub fn create_document(
    ws: &Workspace,
    filename: &str,
    title: Option<&str>,
    author: Option<&str>,
) -> Result<PathBuf> {
    ws.create(filename, title, author)
}

pub fn list_documents(ws: &Workspace, directory: Option<&str>) -> Result<Vec<DocumentEntry>> {
    log::info!("list_documents {}", directory.unwrap_or("."));
    ws.list_documents(directory)
}

pub fn get_document_info(ws: &Workspace, filename: &str) -> Result<DocumentInfo> {
    let path = ws.resolve(filename)?;
    log::info!("get_document_info {}", path.display());
    ws.read(filename, |loaded| {
        let package = loaded.view();
        let core = CoreProperties::from_package(package.opc())?.unwrap_or_default();
        let doc = package.document();
        Ok(DocumentInfo {
            path: path.clone(),
            title: core.title,
            author: core.author,
            subject: core.subject,
            last_modified_by: core.last_modified_by,
            revision: core.revision,
            created: core.created,
            modified: core.modified,
            paragraphs: doc.paragraph_count(),
            tables: doc.tables().count(),
            words: word_count(doc),
            protected: loaded.is_protected(),
        })
    })
}

pub fn get_document_outline(ws: &Workspace, filename: &str) -> Result<Outline> {
    log::info!("get_document_outline {}", filename);
    ws.read(filename, |loaded| {
        let package = loaded.view();
        let styles = Styles::read(package)?;
        let mut outline = Outline::default();
        for (index, para) in package.document().paragraphs().enumerate() {
            outline.paragraphs.push(OutlineParagraph {
                index,
                style: para.style_id().map(str::to_string),
                heading_level: styles.as_ref().and_then(|s| s.paragraph_heading_level(para)),
                preview: preview(&para.text()),
            });
        }
        for (index, table) in package.document().tables().enumerate() {
            let (rows, cols) = table.dimensions();
            outline.tables.push(OutlineTable { index, rows, cols });
        }
        Ok(outline)
    })
}

/// Paragraph texts, then each table as ` | `-separated rows.
pub fn get_document_text(ws: &Workspace, filename: &str) -> Result<String> {
    log::info!("get_document_text {}", filename);
    ws.read(filename, |loaded| {
        let mut lines = Vec::new();
        for (_, block) in loaded.view().document().iter() {
            match block {
                Block::Paragraph(p) => lines.push(p.text()),
                Block::Table(t) => {
                    for row in t.cell_texts() {
                        lines.push(row.join(" | "));
                    }
                },
                Block::Other(_) => {},
            }
        }
        Ok(lines.join("\n"))
    })
}

pub fn find_text(ws: &Workspace, filename: &str, text: &str, options: MatchOptions) -> Result<Vec<Occurrence>> {
    log::info!("find_text {} '{}'", filename, text);
    ws.read(filename, |loaded| AnchorResolver::new(loaded.view().document()).all_matches(text, options))
}

/// Replace run-local occurrences in paragraphs and table cells.
pub fn search_and_replace(ws: &Workspace, filename: &str, find: &str, replace: &str) -> Result<usize> {
    if find.is_empty() {
        return Err(Error::Validation("search text must not be empty".to_string()));
    }
    log::info!("search_and_replace {} '{}'", filename, find);
    ws.edit(filename, |package| {
        let mut count = 0;
        for block in package.document_mut().blocks_mut() {
            match block {
                Block::Paragraph(p) => count += p.replace_text(find, replace),
                Block::Table(t) => count += t.replace_text(find, replace),
                Block::Other(_) => {},
            }
        }
        Ok(count)
    })
}

/// Append a paragraph; returns its paragraph index.
pub fn add_paragraph(
    ws: &Workspace,
    filename: &str,
    text: &str,
    style: Option<&str>,
    format: &RunFormat,
) -> Result<usize> {
    log::info!("add_paragraph {}", filename);
    ws.edit(filename, |package| {
        let mut styles = Styles::from_package(package)?;
        let mut para = styled_paragraph(text, format)?;
        if let Some(style) = style {
            para.set_style(&styles.resolve_or_create(style)?);
        }
        styles.save_to(package)?;
        append_paragraph(package.document_mut(), Block::Paragraph(para))
    })
}

pub fn add_heading(
    ws: &Workspace,
    filename: &str,
    text: &str,
    level: u8,
    format: &RunFormat,
    border_bottom: bool,
) -> Result<usize> {
    log::info!("add_heading {} level {}", filename, level);
    ws.edit(filename, |package| {
        let mut styles = Styles::from_package(package)?;
        let para = heading_paragraph(&mut styles, text, level, format, border_bottom)?;
        styles.save_to(package)?;
        append_paragraph(package.document_mut(), Block::Paragraph(para))
    })
}

fn append_paragraph(doc: &mut Document, block: Block) -> Result<usize> {
    let id = doc.append(block);
    doc.paragraph_index_of(id)
        .ok_or_else(|| Error::StructuralInconsistency("appended paragraph is not in the body".to_string()))
}

/// Append a table; returns its table index.
pub fn add_table(ws: &Workspace, filename: &str, rows: usize, cols: usize, data: &[Vec<String>]) -> Result<usize> {
    log::info!("add_table {} {}x{}", filename, rows, cols);
    let table = Table::new(rows, cols, data)?;
    ws.edit(filename, |package| {
        let doc = package.document_mut();
        doc.append(Block::Table(table));
        Ok(doc.tables().count() - 1)
    })
}

/// Format `[start, end)` of one paragraph; returns the runs touched.
pub fn format_text(
    ws: &Workspace,
    filename: &str,
    paragraph_index: usize,
    start: usize,
    end: usize,
    format: &RunFormat,
) -> Result<usize> {
    log::info!("format_text {} paragraph {} [{}, {})", filename, paragraph_index, start, end);
    if format.is_empty() {
        return Err(Error::Validation("no formatting given".to_string()));
    }
    ws.edit(filename, |package| {
        package
            .document_mut()
            .paragraph_mut(paragraph_index)?
            .format_range(start, end, format)
    })
}

pub fn create_custom_style(
    ws: &Workspace,
    filename: &str,
    name: &str,
    format: &RunFormat,
    base_style: Option<&str>,
) -> Result<String> {
    log::info!("create_custom_style {} '{}'", filename, name);
    ws.edit(filename, |package| {
        let mut styles = Styles::from_package(package)?;
        let id = styles.create_custom_style(name, format, base_style)?;
        styles.save_to(package)?;
        Ok(id)
    })
}

/// Convert to PDF next to the document unless `output` is given.
pub fn convert_to_pdf(
    ws: &Workspace,
    converter: &dyn PdfConverter,
    filename: &str,
    output: Option<&str>,
) -> Result<PathBuf> {
    let input = ws.resolve(filename)?;
    if !input.is_file() {
        return Err(Error::NotFound(format!("document {} does not exist", input.display())));
    }
    let output = match output {
        Some(out) => {
            let out = PathBuf::from(out);
            if out.is_absolute() { out } else { ws.root().join(out) }
        },
        None => input.with_extension("pdf"),
    };
    log::info!("convert_to_pdf {} -> {}", input.display(), output.display());
    converter.convert(&input, &output)
}
