//! File-based document backend for persistent storage.

use crate::backend::DocumentBackend;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lock file name within the store directory.
const LOCK_FILE: &str = "LOCK";
/// Extension used for document files.
const DOC_EXT: &str = "json";

/// A file-based document backend.
///
/// Each document is stored as one file (`<id>.json`) inside the store
/// directory. Writes go through a temporary file followed by a rename, so
/// a single-document write is atomic: a crash mid-write leaves the
/// previous version intact.
///
/// An exclusive `LOCK` file prevents two processes from opening the same
/// store directory concurrently.
///
/// # Example
///
/// ```no_run
/// use taskdb_store::{DocumentBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("tasks-demo")).unwrap();
/// backend.put("a1b2", br#"{"summary":"buy milk"}"#).unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    // Serializes temp-file creation within this process. Cross-process
    // exclusion is handled by the LOCK file.
    write_gate: Mutex<()>,
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a document store directory at the given path.
    ///
    /// Opening an existing directory reuses its documents; it is never
    /// recreated.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another process holds the lock,
    /// or an I/O error if the directory cannot be created or opened.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            write_gate: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn doc_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{DOC_EXT}"))
    }
}

impl DocumentBackend for FileBackend {
    fn put(&self, id: &str, payload: &[u8]) -> StoreResult<()> {
        let _gate = self.write_gate.lock();

        let tmp_path = self.dir.join(format!("{id}.tmp"));
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(payload)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, self.doc_path(id))?;
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.doc_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        match fs::remove_file(self.doc_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let mut documents = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            documents.push((id.to_string(), fs::read(&path)?));
        }
        // Deterministic ordering matches the in-memory backend
        documents.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(documents)
    }

    fn flush(&self) -> StoreResult<()> {
        // Every put syncs its own file before the rename
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("tasks-alice");
        let _backend = FileBackend::open(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn put_get_roundtrip() {
        let temp = tempdir().unwrap();
        let backend = FileBackend::open(temp.path()).unwrap();

        backend.put("doc1", b"payload").unwrap();
        assert_eq!(backend.get("doc1").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn get_missing_returns_none() {
        let temp = tempdir().unwrap();
        let backend = FileBackend::open(temp.path()).unwrap();
        assert!(backend.get("nope").unwrap().is_none());
    }

    #[test]
    fn delete_document() {
        let temp = tempdir().unwrap();
        let backend = FileBackend::open(temp.path()).unwrap();

        backend.put("doc1", b"x").unwrap();
        assert!(backend.delete("doc1").unwrap());
        assert!(!backend.delete("doc1").unwrap());
    }

    #[test]
    fn list_skips_lock_file() {
        let temp = tempdir().unwrap();
        let backend = FileBackend::open(temp.path()).unwrap();

        backend.put("b", b"2").unwrap();
        backend.put("a", b"1").unwrap();

        let ids: Vec<String> = backend
            .list()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn documents_survive_reopen() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("tasks-alice");

        {
            let backend = FileBackend::open(&dir).unwrap();
            backend.put("doc1", b"persisted").unwrap();
        }

        let backend = FileBackend::open(&dir).unwrap();
        assert_eq!(backend.get("doc1").unwrap(), Some(b"persisted".to_vec()));
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("tasks-alice");

        let _first = FileBackend::open(&dir).unwrap();
        let second = FileBackend::open(&dir);
        assert!(matches!(second, Err(StoreError::Locked)));
    }
}
