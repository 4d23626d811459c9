//! Tables in the document body.

use crate::common::error::{Error, Result};
use crate::common::xml::XmlElement;
use crate::ooxml::docx::paragraph::Paragraph;

/// Usable width of a Letter page with 1" margins, in twentieths of a point.
const DEFAULT_TABLE_WIDTH: u32 = 9360;

/// A `<w:tbl>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    el: XmlElement,
}

/// Location of a paragraph inside a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CellLocation {
    pub row: usize,
    pub col: usize,
    /// Paragraph index within the cell
    pub paragraph: usize,
}

impl Table {
    /// Build a bordered `rows` × `cols` table, filling cells from `data`
    /// row by row. Missing entries stay empty; extra entries are rejected.
    pub fn new(rows: usize, cols: usize, data: &[Vec<String>]) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::Validation(format!(
                "table must have at least one row and column, got {}x{}",
                rows, cols
            )));
        }
        if data.len() > rows || data.iter().any(|row| row.len() > cols) {
            return Err(Error::Validation(format!(
                "table data does not fit in {}x{}",
                rows, cols
            )));
        }

        let col_width = DEFAULT_TABLE_WIDTH / cols as u32;
        let mut borders = XmlElement::new("w:tblBorders");
        for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            borders.push(
                XmlElement::new(edge)
                    .with_attr("w:val", "single")
                    .with_attr("w:sz", "4")
                    .with_attr("w:space", "0")
                    .with_attr("w:color", "auto"),
            );
        }
        let tbl_pr = XmlElement::new("w:tblPr")
            .with_child(
                XmlElement::new("w:tblW")
                    .with_attr("w:w", "0")
                    .with_attr("w:type", "auto"),
            )
            .with_child(borders)
            .with_child(XmlElement::new("w:tblLook").with_attr("w:val", "04A0"));

        let mut grid = XmlElement::new("w:tblGrid");
        for _ in 0..cols {
            grid.push(XmlElement::new("w:gridCol").with_attr("w:w", col_width.to_string()));
        }

        let mut tbl = XmlElement::new("w:tbl").with_child(tbl_pr).with_child(grid);
        for r in 0..rows {
            let mut tr = XmlElement::new("w:tr");
            for c in 0..cols {
                let text = data
                    .get(r)
                    .and_then(|row| row.get(c))
                    .map(String::as_str)
                    .unwrap_or("");
                let tc_pr = XmlElement::new("w:tcPr").with_child(
                    XmlElement::new("w:tcW")
                        .with_attr("w:w", col_width.to_string())
                        .with_attr("w:type", "dxa"),
                );
                tr.push(
                    XmlElement::new("w:tc")
                        .with_child(tc_pr)
                        .with_child(Paragraph::with_text(text).into_element()),
                );
            }
            tbl.push(tr);
        }
        Ok(Self { el: tbl })
    }

    pub fn from_element(el: XmlElement) -> Self {
        Self { el }
    }

    #[inline]
    pub fn element(&self) -> &XmlElement {
        &self.el
    }

    #[inline]
    pub fn element_mut(&mut self) -> &mut XmlElement {
        &mut self.el
    }

    #[inline]
    pub fn into_element(self) -> XmlElement {
        self.el
    }

    /// Cells by row.
    pub fn rows(&self) -> Vec<Vec<&XmlElement>> {
        self.el
            .elements()
            .filter(|el| el.is("tr"))
            .map(|tr| tr.elements().filter(|el| el.is("tc")).collect())
            .collect()
    }

    /// `(rows, widest row)`.
    pub fn dimensions(&self) -> (usize, usize) {
        let rows = self.rows();
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        (rows.len(), cols)
    }

    /// Paragraphs of every cell with their location.
    pub fn cell_paragraphs(&self) -> Vec<(CellLocation, Paragraph)> {
        let mut out = Vec::new();
        for (row, cells) in self.rows().into_iter().enumerate() {
            for (col, cell) in cells.into_iter().enumerate() {
                for (paragraph, p) in cell.elements().filter(|el| el.is("p")).enumerate() {
                    out.push((
                        CellLocation {
                            row,
                            col,
                            paragraph,
                        },
                        Paragraph::from_element(p.clone()),
                    ));
                }
            }
        }
        out
    }

    /// Text of each cell; paragraphs inside a cell are joined by `\n`.
    pub fn cell_texts(&self) -> Vec<Vec<String>> {
        self.rows()
            .into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .map(|cell| {
                        cell.elements()
                            .filter(|el| el.is("p"))
                            .map(|p| Paragraph::from_element(p.clone()).text())
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                    .collect()
            })
            .collect()
    }

    /// Run-local replacement in every cell paragraph.
    pub fn replace_text(&mut self, find: &str, replace: &str) -> usize {
        let mut count = 0;
        for tr in self.el.elements_mut().filter(|el| el.is("tr")) {
            for tc in tr.elements_mut().filter(|el| el.is("tc")) {
                for node in tc.children.iter_mut() {
                    let Some(p) = node.as_element_mut() else {
                        continue;
                    };
                    if !p.is("p") {
                        continue;
                    }
                    let mut para = Paragraph::from_element(std::mem::take(p));
                    count += para.replace_text(find, replace);
                    *p = para.into_element();
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_layout() {
        let data = vec![
            vec!["Name".to_string(), "Qty".to_string()],
            vec!["Apples".to_string()],
        ];
        let table = Table::new(3, 2, &data).unwrap();
        assert_eq!(table.dimensions(), (3, 2));

        let texts = table.cell_texts();
        assert_eq!(texts[0], ["Name", "Qty"]);
        assert_eq!(texts[1], ["Apples", ""]);
        assert_eq!(texts[2], ["", ""]);
        assert_eq!(table.element().child("tblGrid").unwrap().elements().count(), 2);
    }

    #[test]
    fn test_new_table_rejects_bad_shapes() {
        assert!(matches!(Table::new(0, 2, &[]), Err(Error::Validation(_))));
        let data = vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]];
        assert!(Table::new(1, 2, &data).is_err());
    }

    #[test]
    fn test_replace_in_cells() {
        let data = vec![vec!["old value".to_string(), "old".to_string()]];
        let mut table = Table::new(1, 2, &data).unwrap();
        assert_eq!(table.replace_text("old", "new"), 2);
        assert_eq!(table.cell_texts()[0], ["new value", "new"]);

        let locations: Vec<_> = table.cell_paragraphs().into_iter().map(|(loc, _)| loc).collect();
        assert_eq!(locations[1], CellLocation { row: 0, col: 1, paragraph: 0 });
    }
}
