//! Per-path mutual exclusion.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static GLOBAL: Lazy<PathLocks> = Lazy::new(PathLocks::default);

/// Registry of one mutex per document path.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    /// The process-wide registry.
    pub fn global() -> &'static PathLocks {
        &GLOBAL
    }

    /// Run `f` while holding the lock for `path`.
    pub fn with<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let key = lock_key(path);
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(key.clone()).or_default().clone()
        };
        let _release = Release {
            locks: self,
            key,
            lock: lock.clone(),
        };
        let _guard = lock.lock();
        f()
    }

    /// Number of paths currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drops the registry entry once no other caller holds or awaits it.
struct Release<'a> {
    locks: &'a PathLocks,
    key: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.locks.lock();
        // The map, this guard and the caller's handle.
        if Arc::strong_count(&self.lock) == 3 {
            locks.remove(&self.key);
        }
    }
}

/// Canonical form of `path`; a file that does not exist yet is keyed by
/// its canonical parent.
fn lock_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_same_file_shares_lock() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.docx"), b"x").unwrap();
        assert_eq!(
            lock_key(&dir.path().join("a.docx")),
            lock_key(&dir.path().join(".").join("a.docx"))
        );

        let locks = PathLocks::default();
        locks.with(&dir.path().join("a.docx"), || {
            assert_eq!(locks.len(), 1);
            locks.with(&dir.path().join("b.docx"), || assert_eq!(locks.len(), 2));
            assert_eq!(locks.len(), 1);
        });
    }

    #[test]
    fn test_entries_are_released() {
        let dir = tempfile::tempdir().unwrap();
        let locks = PathLocks::default();
        for i in 0..50 {
            locks.with(&dir.path().join(format!("doc{}.docx", i)), || {});
        }
        assert!(locks.is_empty());

        let path = dir.path().join("boom.docx");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with(&path, || -> u8 { panic!("edit failed") })
        }));
        assert!(result.is_err());
        assert!(locks.is_empty());
    }

    #[test]
    fn test_serializes_callers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let locks = Arc::new(PathLocks::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (locks, inside, max_seen, path) =
                    (locks.clone(), inside.clone(), max_seen.clone(), path.clone());
                std::thread::spawn(move || {
                    locks.with(&path, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
