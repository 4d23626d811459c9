//! Building whole documents from structured content.
//!
//! Builders only ever produce new packages; editing an existing document
//! goes through the anchored operations instead.

use crate::common::error::{Error, Result};
use crate::ooxml::docx::document::Block;
use crate::ooxml::docx::insert::{heading_paragraph, styled_paragraph};
use crate::ooxml::docx::package::DocxPackage;
use crate::ooxml::docx::styles::Styles;
use crate::ooxml::docx::table::Table;
use crate::ooxml::docx::template::blank_package;
use crate::ooxml::docx::format::RunFormat;
use crate::ooxml::metadata::CoreProperties;
use serde::{Deserialize, Serialize};

/// One block of builder content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading {
        text: String,
        #[serde(default = "default_level")]
        level: u8,
    },
    Paragraph {
        text: String,
        #[serde(default)]
        style: Option<String>,
        #[serde(default)]
        format: RunFormat,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
}

fn default_level() -> u8 {
    1
}

/// Content handed to a [`DocumentBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl DocumentContent {
    /// Parse content from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| Error::Validation(format!("invalid document content: {}", e)))
    }
}

/// Produces serialized .docx packages.
pub trait DocumentBuilder {
    fn build(&self, content: &DocumentContent) -> Result<Vec<u8>>;
}

/// Builds on the blank built-in template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateBuilder;

impl DocumentBuilder for TemplateBuilder {
    fn build(&self, content: &DocumentContent) -> Result<Vec<u8>> {
        let core = CoreProperties::new_document(
            content.title.as_deref(),
            content.author.as_deref(),
            chrono::Utc::now(),
        );
        let mut package = DocxPackage::from_opc(blank_package(&core)?)?;
        let mut styles = Styles::from_package(&mut package)?;

        for block in &content.blocks {
            let block = match block {
                ContentBlock::Heading { text, level } => {
                    Block::Paragraph(heading_paragraph(&mut styles, text, *level, &RunFormat::default(), false)?)
                },
                ContentBlock::Paragraph { text, style, format } => {
                    let mut para = styled_paragraph(text, format)?;
                    if let Some(style) = style {
                        para.set_style(&styles.resolve_or_create(style)?);
                    }
                    Block::Paragraph(para)
                },
                ContentBlock::Table { rows } => {
                    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
                    Block::Table(Table::new(rows.len(), cols, rows)?)
                },
            };
            package.document_mut().append(block);
        }

        styles.save_to(&mut package)?;
        package.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_from_yaml() {
        let yaml = r#"
title: Report
blocks:
  - type: heading
    text: Summary
  - type: paragraph
    text: All good.
    format:
      bold: true
  - type: table
    rows:
      - [a, b]
      - [c]
"#;
        let content = DocumentContent::from_yaml(yaml).unwrap();
        let bytes = TemplateBuilder.build(&content).unwrap();
        let package = DocxPackage::from_bytes(&bytes).unwrap();

        let doc = package.document();
        assert_eq!(doc.paragraph_count(), 2);
        assert_eq!(doc.paragraph(0).unwrap().style_id(), Some("Heading1"));
        assert_eq!(doc.tables().next().unwrap().dimensions(), (2, 2));
        let core = CoreProperties::from_package(package.opc()).unwrap().unwrap();
        assert_eq!(core.title.as_deref(), Some("Report"));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let content = DocumentContent {
            blocks: vec![ContentBlock::Table { rows: vec![] }],
            ..Default::default()
        };
        assert!(matches!(TemplateBuilder.build(&content), Err(Error::Validation(_))));
    }
}
