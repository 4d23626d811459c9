//! Write-temp-then-rename persistence.

use crate::common::error::{Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Fail early when `path` cannot be replaced.
pub fn check_writable(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(Error::write(path, "parent directory does not exist"));
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(Error::write(path, "path is a directory")),
        Ok(meta) if meta.permissions().readonly() => Err(Error::write(path, "file is read-only")),
        _ => Ok(()),
    }
}

/// Atomically replace `path` with `data`. The temporary file lives next to
/// the target and is removed on every failure.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    check_writable(path)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| Error::write(path, e))?;
    temp.write_all(data).map_err(|e| Error::write(path, e))?;
    temp.flush().map_err(|e| Error::write(path, e))?;
    temp.as_file().sync_all().map_err(|e| Error::write(path, e))?;
    temp.persist(path).map_err(|e| Error::write(path, e.error))?;
    log::debug!("wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        std::fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(entries(dir.path()), 1);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("doc.docx");
        assert!(matches!(write_atomic(&path, b"x"), Err(Error::Write { .. })));
    }

    #[test]
    fn test_directory_target_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sub");
        std::fs::create_dir(&target).unwrap();
        assert!(matches!(write_atomic(&target, b"x"), Err(Error::Write { .. })));
        assert_eq!(entries(dir.path()), 1);
    }
}
