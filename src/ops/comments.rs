//! Comment queries.

use crate::common::error::Result;
use crate::ooxml::docx::comment::{CommentIndex, CommentRecord};
use crate::workspace::Workspace;

fn with_index<T>(ws: &Workspace, filename: &str, f: impl FnOnce(&CommentIndex) -> Result<T>) -> Result<T> {
    ws.read(filename, |loaded| f(&CommentIndex::load(loaded.view())?))
}

pub fn get_all_comments(ws: &Workspace, filename: &str) -> Result<Vec<CommentRecord>> {
    log::info!("get_all_comments {}", filename);
    with_index(ws, filename, |index| Ok(index.all().to_vec()))
}

pub fn get_comments_by_author(ws: &Workspace, filename: &str, author: &str) -> Result<Vec<CommentRecord>> {
    log::info!("get_comments_by_author {} '{}'", filename, author);
    with_index(ws, filename, |index| Ok(index.by_author(author).into_iter().cloned().collect()))
}

pub fn get_comments_for_paragraph(ws: &Workspace, filename: &str, paragraph_index: usize) -> Result<Vec<CommentRecord>> {
    log::info!("get_comments_for_paragraph {} {}", filename, paragraph_index);
    with_index(ws, filename, |index| {
        Ok(index.for_paragraph(paragraph_index)?.into_iter().cloned().collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::ooxml::docx::format::RunFormat;
    use crate::ops::document::add_paragraph;

    #[test]
    fn test_document_without_comments() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path());
        ws.create("doc", None, None).unwrap();
        add_paragraph(&ws, "doc", "plain", None, &RunFormat::default()).unwrap();

        assert!(get_all_comments(&ws, "doc").unwrap().is_empty());
        assert!(get_comments_by_author(&ws, "doc", "Ana").unwrap().is_empty());
        assert!(get_comments_for_paragraph(&ws, "doc", 0).unwrap().is_empty());
        assert!(matches!(get_comments_for_paragraph(&ws, "doc", 3), Err(Error::NotFound(_))));
    }
}
