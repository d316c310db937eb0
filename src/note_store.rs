//! Durable note collection, keyed by note id.
//!
//! The unit of durability is the whole collection: every upsert rewrites the
//! JSON file, so the at-rest snapshot is always complete and the file stays
//! human-inspectable. Records are kept in a `BTreeMap` keyed by id, which
//! makes the serialized order (and therefore the file bytes) deterministic
//! for a given collection.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::NoteStoreError;
use crate::file_store::write_restricted;
use crate::models::{EmbeddedNote, NoteKind};

/// On-disk record for one embedded note.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNote {
    content: String,
    id: String,
    kind: NoteKind,
    path: PathBuf,
    embedding: Vec<f32>,
}

/// JSON-file store for the authoritative note collection.
#[derive(Debug)]
pub struct NoteStore {
    notes: RwLock<BTreeMap<String, StoredNote>>,
    path: PathBuf,
}

impl NoteStore {
    /// Open a store at `path`, loading any existing collection.
    ///
    /// A missing file becomes an empty collection, written out immediately
    /// so the snapshot on disk always reflects the store. A corrupt file is
    /// fatal.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, NoteStoreError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(NoteStoreError::EmptyPath);
        }

        let store = Self {
            notes: RwLock::new(BTreeMap::new()),
            path,
        };
        if !store.load()? {
            Self::persist(&store.path, &store.notes.read())?;
        }
        Ok(store)
    }

    /// Upsert a note by id (last write wins) and rewrite the collection.
    pub fn save(&self, note: &EmbeddedNote) -> Result<(), NoteStoreError> {
        let mut notes = self.notes.write();

        notes.insert(
            note.note.id.clone(),
            StoredNote {
                content: note.note.content.clone(),
                id: note.note.id.clone(),
                kind: note.note.kind,
                path: note.note.path.clone(),
                embedding: note.embedding.clone(),
            },
        );

        Self::persist(&self.path, &notes)
    }

    /// Number of notes currently in the collection.
    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    /// True when the collection holds no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }

    /// Load the collection from disk. Returns `false` when the file did not
    /// exist.
    fn load(&self) -> Result<bool, NoteStoreError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(NoteStoreError::Io(e)),
        };

        let stored: Vec<StoredNote> =
            serde_json::from_slice(&data).map_err(NoteStoreError::Corrupt)?;

        let mut notes = self.notes.write();
        for note in stored {
            notes.insert(note.id.clone(), note);
        }
        tracing::debug!(count = notes.len(), path = %self.path.display(), "loaded note collection");

        Ok(true)
    }

    fn persist(path: &Path, notes: &BTreeMap<String, StoredNote>) -> Result<(), NoteStoreError> {
        let records: Vec<&StoredNote> = notes.values().collect();
        let data = serde_json::to_vec_pretty(&records).map_err(std::io::Error::other)?;

        write_restricted(path, &data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryNote;
    use tempfile::TempDir;

    fn embedded(id: &str, content: &str, embedding: Vec<f32>) -> EmbeddedNote {
        EmbeddedNote {
            note: MemoryNote {
                id: id.to_string(),
                content: content.to_string(),
                kind: NoteKind::Pattern,
                path: PathBuf::from("/src/a.md"),
            },
            embedding,
        }
    }

    #[test]
    fn test_new_rejects_empty_path() {
        assert!(matches!(
            NoteStore::new("").unwrap_err(),
            NoteStoreError::EmptyPath
        ));
    }

    #[test]
    fn test_missing_file_becomes_empty_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.json");
        let store = NoteStore::new(&path).unwrap();

        assert!(store.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("notes.json");

        {
            let store = NoteStore::new(&path).unwrap();
            store.save(&embedded("n1", "content one", vec![0.1, 0.2])).unwrap();
            store.save(&embedded("n2", "content two", vec![0.3])).unwrap();
        }

        let store = NoteStore::new(&path).unwrap();
        assert_eq!(store.len(), 2);

        let data = std::fs::read_to_string(&path).unwrap();
        let records: serde_json::Value = serde_json::from_str(&data).unwrap();
        let arr = records.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["id"], "n1");
        assert_eq!(arr[0]["kind"], "pattern");
        assert_eq!(arr[0]["embedding"], serde_json::json!([0.1, 0.2]));
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.json");
        let store = NoteStore::new(&path).unwrap();

        store.save(&embedded("n1", "original", vec![1.0])).unwrap();
        store.save(&embedded("n1", "replacement", vec![2.0])).unwrap();

        assert_eq!(store.len(), 1);
        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.contains("replacement"));
        assert!(!data.contains("original"));
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path_a = tmp.path().join("a.json");
        let path_b = tmp.path().join("b.json");

        // Same notes saved in different orders produce identical files.
        let store_a = NoteStore::new(&path_a).unwrap();
        store_a.save(&embedded("x", "one", vec![1.0])).unwrap();
        store_a.save(&embedded("a", "two", vec![2.0])).unwrap();

        let store_b = NoteStore::new(&path_b).unwrap();
        store_b.save(&embedded("a", "two", vec![2.0])).unwrap();
        store_b.save(&embedded("x", "one", vec![1.0])).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path_a).unwrap(),
            std::fs::read_to_string(&path_b).unwrap()
        );
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.json");
        std::fs::write(&path, "[{ broken").unwrap();

        assert!(matches!(
            NoteStore::new(&path).unwrap_err(),
            NoteStoreError::Corrupt(_)
        ));
    }
}
