//! The document workspace: filename resolution and the load, mutate and
//! persist boundary every operation goes through.
//!
//! Mutations hold the per-path lock for the whole cycle, check the target is
//! writable before loading, and replace the file atomically only after the
//! in-memory edit succeeded. A failed edit leaves the file untouched.

pub mod lock;
pub mod persist;

use crate::builder::{DocumentBuilder, DocumentContent};
use crate::common::error::{Error, Result};
use crate::config::Config;
use crate::ooxml::docx::package::{DocxPackage, LoadedPackage};
use crate::ooxml::docx::template::blank_package;
use crate::ooxml::metadata::CoreProperties;
pub use lock::PathLocks;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A `.docx` file found by [`Workspace::list_documents`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEntry {
    pub name: String,
    pub size: u64,
}

/// Documents under one working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    config: Config,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// A workspace rooted at `dir` with default settings otherwise.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(Config {
            working_dir: dir.into(),
            ..Config::default()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.working_dir
    }

    /// Resolve a filename against the working directory, appending `.docx`
    /// unless the name already ends in it (in any case).
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(Error::Validation("filename must not be empty".to_string()));
        }
        let has_docx = Path::new(filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
        let path = if has_docx {
            PathBuf::from(filename)
        } else {
            PathBuf::from(format!("{}.docx", filename))
        };
        Ok(if path.is_absolute() {
            path
        } else {
            self.root().join(path)
        })
    }

    fn resolve_existing(&self, filename: &str) -> Result<PathBuf> {
        let path = self.resolve(filename)?;
        if !path.is_file() {
            return Err(Error::NotFound(format!("document {} does not exist", path.display())));
        }
        Ok(path)
    }

    /// `.docx` files directly inside `directory` (default: the working
    /// directory), sorted by name. Word's `~$` lock files are skipped.
    pub fn list_documents(&self, directory: Option<&str>) -> Result<Vec<DocumentEntry>> {
        let dir = match directory {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => self.root().join(dir),
            None => self.root().to_path_buf(),
        };
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("directory {} does not exist", dir.display())));
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_docx = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
            if is_docx && !name.starts_with("~$") && path.is_file() {
                found.push(DocumentEntry {
                    name,
                    size: entry.metadata()?.len(),
                });
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    /// Create a blank document. Existing files are never overwritten.
    pub fn create(&self, filename: &str, title: Option<&str>, author: Option<&str>) -> Result<PathBuf> {
        let core = CoreProperties::new_document(title, author, chrono::Utc::now());
        self.write_new(filename, || Ok(blank_package(&core)?.to_bytes()?))
    }

    /// Create a document with `builder`.
    pub fn create_with_builder(
        &self,
        filename: &str,
        builder: &dyn DocumentBuilder,
        content: &DocumentContent,
    ) -> Result<PathBuf> {
        self.write_new(filename, || {
            let bytes = builder.build(content)?;
            DocxPackage::from_bytes(&bytes)?;
            Ok(bytes)
        })
    }

    fn write_new(&self, filename: &str, bytes: impl FnOnce() -> Result<Vec<u8>>) -> Result<PathBuf> {
        let path = self.resolve(filename)?;
        log::info!("create_document {}", path.display());
        PathLocks::global().with(&path, || {
            if path.exists() {
                return Err(Error::Validation(format!("{} already exists", path.display())));
            }
            persist::check_writable(&path)?;
            persist::write_atomic(&path, &bytes()?)?;
            Ok(path.clone())
        })
    }

    /// Load a document for reading, whatever its protection state.
    pub fn read<T>(&self, filename: &str, f: impl FnOnce(&LoadedPackage) -> Result<T>) -> Result<T> {
        let path = self.resolve_existing(filename)?;
        log::debug!("reading {}", path.display());
        let loaded = LoadedPackage::load(&std::fs::read(&path)?)?;
        f(&loaded)
    }

    /// Load, mutate and persist an editable document. Protected documents
    /// are refused before `f` runs.
    pub fn edit<T>(&self, filename: &str, f: impl FnOnce(&mut DocxPackage) -> Result<T>) -> Result<T> {
        self.transform(filename, |loaded| {
            let mut package = loaded.into_editable()?;
            let value = f(&mut package)?;
            Ok((package, value))
        })
    }

    /// Load a document in either protection state and persist the package
    /// `f` hands back.
    pub fn transform<T>(
        &self,
        filename: &str,
        f: impl FnOnce(LoadedPackage) -> Result<(DocxPackage, T)>,
    ) -> Result<T> {
        let path = self.resolve_existing(filename)?;
        PathLocks::global().with(&path, || {
            persist::check_writable(&path)?;
            let loaded = LoadedPackage::load(&std::fs::read(&path)?)?;
            let (mut package, value) = f(loaded)?;
            persist::write_atomic(&path, &package.to_bytes()?)?;
            Ok(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::document::Block;
    use crate::ooxml::docx::paragraph::Paragraph;

    #[test]
    fn test_resolve_appends_extension() {
        let ws = Workspace::open("/tmp/docs");
        assert_eq!(ws.resolve("report").unwrap(), PathBuf::from("/tmp/docs/report.docx"));
        assert_eq!(ws.resolve("a.docx").unwrap(), PathBuf::from("/tmp/docs/a.docx"));
        assert_eq!(ws.resolve("/abs/x").unwrap(), PathBuf::from("/abs/x.docx"));
        assert_eq!(ws.resolve("report.v2").unwrap(), PathBuf::from("/tmp/docs/report.v2.docx"));
        assert_eq!(ws.resolve("Old.DOCX").unwrap(), PathBuf::from("/tmp/docs/Old.DOCX"));
        assert_eq!(ws.resolve("notes.txt").unwrap(), PathBuf::from("/tmp/docs/notes.txt.docx"));
        assert!(matches!(ws.resolve("  "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path());
        ws.create("b", Some("B"), None).unwrap();
        ws.create("a", None, None).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("~$a.docx"), b"x").unwrap();

        let names: Vec<_> = ws.list_documents(None).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a.docx", "b.docx"]);
        assert!(matches!(ws.create("a", None, None), Err(Error::Validation(_))));
    }

    #[test]
    fn test_failed_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path());
        let path = ws.create("doc", None, None).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = ws.edit("doc", |package| {
            package.document_mut().append(Block::Paragraph(Paragraph::with_text("x")));
            Err::<(), _>(Error::Validation("boom".to_string()))
        });
        assert!(err.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);

        ws.edit("doc", |package| {
            package.document_mut().append(Block::Paragraph(Paragraph::with_text("kept")));
            Ok(())
        })
        .unwrap();
        let count = ws.read("doc", |loaded| Ok(loaded.view().document().paragraph_count())).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path());
        assert!(matches!(ws.edit("nope", |_| Ok(())), Err(Error::NotFound(_))));
        assert!(matches!(ws.list_documents(Some("missing")), Err(Error::NotFound(_))));
    }
}
