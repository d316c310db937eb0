//! File scanner and durable per-file state machine.
//!
//! The [`FileStore`] walks a source root for files with eligible suffixes and
//! tracks each one through `pending → processing → processed | error`. The
//! catalogue is persisted to a single JSON state file so runs are incremental:
//! unchanged files are skipped, changed files are reset to `pending`, and a
//! killed run leaves nothing worse than a `processing` entry that the next
//! load recovers back to `pending`.
//!
//! # Change Detection
//!
//! Every call to [`FileStore::next_pending`] re-scans the tree. A file's
//! content hash is only recomputed when its modification time differs from
//! the recorded one, so steady-state scans are cheap. The hash is SHA-256
//! over a fixed `file-walker` namespace tag followed by the file bytes;
//! changing the tag or primitive invalidates existing state files.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

use crate::error::FileStoreError;
use crate::models::{FileStatus, TrackedFile};

/// Namespace tag mixed into every content hash.
const HASH_TAG: &[u8] = b"file-walker";

/// Persisted state of one tracked file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileState {
    hash: String,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    status: FileStatus,
    mod_time: i64,
}

/// Scanner plus persistent state machine over a source tree.
///
/// All operations serialize on an internal read/write lock; scans and status
/// transitions take the write half. Every status transition is flushed to the
/// state file before the call returns.
#[derive(Debug)]
pub struct FileStore {
    state: RwLock<BTreeMap<PathBuf, FileState>>,
    source_dir: PathBuf,
    state_file: PathBuf,
    extensions: Vec<String>,
}

impl FileStore {
    /// Open a store over `source_dir`, persisting state to `state_file` and
    /// matching files whose suffix (case-insensitive, leading dot included)
    /// is in `extensions`.
    ///
    /// A missing state file is a fresh start; an unreadable or corrupt one is
    /// fatal. Entries found in `processing` are reset to `pending` so work
    /// interrupted by a crash is picked up again.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        state_file: impl Into<PathBuf>,
        extensions: &[String],
    ) -> Result<Self, FileStoreError> {
        let source_dir = source_dir.into();
        let state_file = state_file.into();

        if source_dir.as_os_str().is_empty() {
            return Err(FileStoreError::EmptySourceDir);
        }
        if state_file.as_os_str().is_empty() {
            return Err(FileStoreError::EmptyStateFile);
        }
        if extensions.is_empty() {
            return Err(FileStoreError::EmptyExtensions);
        }

        let extensions = extensions.iter().map(|e| e.to_lowercase()).collect();

        let store = Self {
            state: RwLock::new(BTreeMap::new()),
            source_dir,
            state_file,
            extensions,
        };
        store.load_state()?;
        Ok(store)
    }

    /// Re-scan the source tree and return a file in `pending` state.
    ///
    /// Pending files are returned in path order, so the iteration within one
    /// scan is deterministic. Returns [`FileStoreError::NoMorePending`] when
    /// the scan leaves nothing pending; callers treat that as the end of the
    /// batch, not as a failure.
    pub fn next_pending(&self) -> Result<TrackedFile, FileStoreError> {
        let mut state = self.state.write();

        self.scan_directory(&mut state)?;
        Self::save_state(&self.state_file, &state)?;

        for st in state.values() {
            if st.status == FileStatus::Pending {
                return Ok(TrackedFile {
                    hash: st.hash.clone(),
                    path: st.path.clone(),
                    status: st.status,
                });
            }
        }

        Err(FileStoreError::NoMorePending)
    }

    /// Read a tracked file's bytes as UTF-8 text.
    pub fn read(&self, path: &Path) -> Result<String, FileStoreError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileStoreError::FileNotFound(path.display().to_string()))
            }
            Err(e) => Err(FileStoreError::Io(e)),
        }
    }

    /// Transition a file to `processing`, clearing any error reason.
    pub fn mark_processing(&self, path: &Path) -> Result<(), FileStoreError> {
        self.transition(path, FileStatus::Processing, None)
    }

    /// Transition a file to `processed`, clearing any error reason.
    pub fn mark_processed(&self, path: &Path) -> Result<(), FileStoreError> {
        self.transition(path, FileStatus::Processed, None)
    }

    /// Transition a file to `error`, recording a human-readable reason.
    pub fn mark_error(&self, path: &Path, reason: &str) -> Result<(), FileStoreError> {
        self.transition(path, FileStatus::Error, Some(reason.to_string()))
    }

    fn transition(
        &self,
        path: &Path,
        status: FileStatus,
        reason: Option<String>,
    ) -> Result<(), FileStoreError> {
        let mut state = self.state.write();

        let st = state
            .get_mut(path)
            .ok_or_else(|| FileStoreError::UnknownPath(path.display().to_string()))?;

        st.status = status;
        st.reason = reason;

        Self::save_state(&self.state_file, &state)
    }

    /// Walk the source tree and reconcile every eligible file with the
    /// catalogue. Holds the write lock via `state`.
    fn scan_directory(
        &self,
        state: &mut BTreeMap<PathBuf, FileState>,
    ) -> Result<(), FileStoreError> {
        for entry in WalkDir::new(&self.source_dir) {
            let entry = entry.map_err(|e| {
                FileStoreError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walk error")
                }))
            })?;

            if !entry.file_type().is_file() || !self.has_valid_extension(entry.path()) {
                continue;
            }

            let abs_path = std::fs::canonicalize(entry.path())?;
            let mod_time = mod_time_nanos(entry.path())?;

            match state.get_mut(&abs_path) {
                Some(existing) => {
                    // mtime unchanged: skip the expensive hash.
                    if existing.mod_time == mod_time {
                        continue;
                    }

                    let hash = compute_hash(&abs_path)?;
                    existing.mod_time = mod_time;

                    if existing.hash != hash {
                        tracing::debug!(path = %abs_path.display(), "content changed, resetting to pending");
                        existing.hash = hash;
                        existing.status = FileStatus::Pending;
                        existing.reason = None;
                    }
                }
                None => {
                    let hash = compute_hash(&abs_path)?;
                    state.insert(
                        abs_path.clone(),
                        FileState {
                            hash,
                            path: abs_path,
                            reason: None,
                            status: FileStatus::Pending,
                            mod_time,
                        },
                    );
                }
            }
        }

        Ok(())
    }

    fn has_valid_extension(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_lowercase(),
            None => return false,
        };
        self.extensions.iter().any(|ext| name.ends_with(ext))
    }

    fn load_state(&self) -> Result<(), FileStoreError> {
        let data = match std::fs::read(&self.state_file) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FileStoreError::Io(e)),
        };

        let states: Vec<FileState> =
            serde_json::from_slice(&data).map_err(FileStoreError::CorruptState)?;

        let mut state = self.state.write();
        for mut st in states {
            // Crash recovery: an interrupted run left this file mid-flight.
            if st.status == FileStatus::Processing {
                tracing::warn!(path = %st.path.display(), "recovering file stuck in processing");
                st.status = FileStatus::Pending;
            }
            state.insert(st.path.clone(), st);
        }

        Ok(())
    }

    fn save_state(
        state_file: &Path,
        state: &BTreeMap<PathBuf, FileState>,
    ) -> Result<(), FileStoreError> {
        let states: Vec<&FileState> = state.values().collect();
        let data = serde_json::to_vec_pretty(&states).map_err(std::io::Error::other)?;

        write_restricted(state_file, &data)?;
        Ok(())
    }
}

/// Modification time as nanoseconds since the Unix epoch.
fn mod_time_nanos(path: &Path) -> Result<i64, FileStoreError> {
    let modified = std::fs::metadata(path)?.modified()?;
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    Ok(nanos as i64)
}

/// Keyed content hash: SHA-256 over the namespace tag followed by the bytes.
fn compute_hash(path: &Path) -> Result<String, FileStoreError> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(HASH_TAG);
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write a file with a permissive parent directory and restrictive file mode.
pub(crate) fn write_restricted(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    std::fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup(extensions: &[&str]) -> (TempDir, PathBuf, FileStore) {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let state_file = tmp.path().join("state").join("state.json");
        let store = FileStore::new(&source, &state_file, &exts(extensions)).unwrap();
        (tmp, source, store)
    }

    /// Bump a file's mtime so the scanner notices it without sleeping.
    fn bump_mtime(path: &Path) {
        let f = fs::OpenOptions::new().append(true).open(path).unwrap();
        f.set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(2))
            .unwrap();
    }

    #[test]
    fn test_new_rejects_empty_source_dir() {
        let err = FileStore::new("", "state.json", &exts(&[".md"])).unwrap_err();
        assert!(matches!(err, FileStoreError::EmptySourceDir));
    }

    #[test]
    fn test_new_rejects_empty_state_file() {
        let err = FileStore::new("src", "", &exts(&[".md"])).unwrap_err();
        assert!(matches!(err, FileStoreError::EmptyStateFile));
    }

    #[test]
    fn test_new_rejects_empty_extensions() {
        let err = FileStore::new("src", "state.json", &[]).unwrap_err();
        assert!(matches!(err, FileStoreError::EmptyExtensions));
    }

    #[test]
    fn test_scan_returns_matching_file_and_skips_others() {
        let (_tmp, source, store) = setup(&[".md"]);
        fs::write(source.join("a.md"), "A").unwrap();
        fs::write(source.join("b.txt"), "B").unwrap();

        let file = store.next_pending().unwrap();
        assert!(file.path.ends_with("a.md"));
        assert_eq!(file.status, FileStatus::Pending);
        assert!(!file.hash.is_empty());

        store.mark_processed(&file.path).unwrap();

        let err = store.next_pending().unwrap_err();
        assert!(matches!(err, FileStoreError::NoMorePending));
    }

    #[test]
    fn test_case_insensitive_extension_match() {
        let (_tmp, source, store) = setup(&[".md"]);
        fs::write(source.join("UPPER.MD"), "shouting").unwrap();

        let file = store.next_pending().unwrap();
        assert!(file.path.to_string_lossy().ends_with("UPPER.MD"));
    }

    #[test]
    fn test_empty_tree_yields_no_more_pending() {
        let (_tmp, _source, store) = setup(&[".md"]);
        assert!(matches!(
            store.next_pending().unwrap_err(),
            FileStoreError::NoMorePending
        ));
    }

    #[test]
    fn test_pending_order_is_by_path() {
        let (_tmp, source, store) = setup(&[".md"]);
        fs::write(source.join("c.md"), "C").unwrap();
        fs::write(source.join("a.md"), "A").unwrap();
        fs::write(source.join("b.md"), "B").unwrap();

        let file = store.next_pending().unwrap();
        assert!(file.path.ends_with("a.md"));
    }

    #[test]
    fn test_change_detection_resets_to_pending() {
        let (_tmp, source, store) = setup(&[".md"]);
        let path = source.join("a.md");
        fs::write(&path, "A").unwrap();

        let first = store.next_pending().unwrap();
        store.mark_processed(&first.path).unwrap();
        assert!(matches!(
            store.next_pending().unwrap_err(),
            FileStoreError::NoMorePending
        ));

        fs::write(&path, "A2").unwrap();
        bump_mtime(&path);

        let second = store.next_pending().unwrap();
        assert_eq!(second.path, first.path);
        assert_eq!(second.status, FileStatus::Pending);
        assert_ne!(second.hash, first.hash);
    }

    #[test]
    fn test_mtime_change_without_content_change_keeps_status() {
        let (_tmp, source, store) = setup(&[".md"]);
        let path = source.join("a.md");
        fs::write(&path, "A").unwrap();

        let file = store.next_pending().unwrap();
        store.mark_processed(&file.path).unwrap();

        // Touch without rewriting: hash is recomputed but unchanged.
        bump_mtime(&path);

        assert!(matches!(
            store.next_pending().unwrap_err(),
            FileStoreError::NoMorePending
        ));
    }

    #[test]
    fn test_unchanged_mtime_skips_rehash() {
        let (_tmp, source, store) = setup(&[".md"]);
        let path = source.join("a.md");
        fs::write(&path, "A").unwrap();

        let file = store.next_pending().unwrap();
        store.mark_processed(&file.path).unwrap();
        let recorded = fs::metadata(&path).unwrap().modified().unwrap();

        // Rewrite the content but pin the mtime back: the scanner must not
        // notice, because the mtime gate short-circuits hashing.
        fs::write(&path, "sneaky edit").unwrap();
        let f = fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.set_modified(recorded).unwrap();

        assert!(matches!(
            store.next_pending().unwrap_err(),
            FileStoreError::NoMorePending
        ));
    }

    #[test]
    fn test_mark_unknown_path_fails() {
        let (_tmp, _source, store) = setup(&[".md"]);
        let ghost = Path::new("/no/such/file.md");

        assert!(matches!(
            store.mark_processing(ghost).unwrap_err(),
            FileStoreError::UnknownPath(_)
        ));
        assert!(matches!(
            store.mark_processed(ghost).unwrap_err(),
            FileStoreError::UnknownPath(_)
        ));
        assert!(matches!(
            store.mark_error(ghost, "boom").unwrap_err(),
            FileStoreError::UnknownPath(_)
        ));
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let (_tmp, _source, store) = setup(&[".md"]);
        let err = store.read(Path::new("/no/such/file.md")).unwrap_err();
        assert!(matches!(err, FileStoreError::FileNotFound(_)));
    }

    #[test]
    fn test_read_returns_contents() {
        let (_tmp, source, store) = setup(&[".md"]);
        let path = source.join("a.md");
        fs::write(&path, "hello world").unwrap();

        let file = store.next_pending().unwrap();
        assert_eq!(store.read(&file.path).unwrap(), "hello world");
    }

    #[test]
    fn test_state_survives_reload() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.md"), "A").unwrap();
        let state_file = tmp.path().join("state.json");

        let path = {
            let store = FileStore::new(&source, &state_file, &exts(&[".md"])).unwrap();
            let file = store.next_pending().unwrap();
            store.mark_error(&file.path, "llm exploded").unwrap();
            file.path
        };

        let store = FileStore::new(&source, &state_file, &exts(&[".md"])).unwrap();
        assert!(matches!(
            store.next_pending().unwrap_err(),
            FileStoreError::NoMorePending
        ));

        // The error record survived the reload, reason intact.
        let data = fs::read_to_string(&state_file).unwrap();
        let records: serde_json::Value = serde_json::from_str(&data).unwrap();
        let record = records
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["path"] == serde_json::json!(path))
            .unwrap();
        assert_eq!(record["status"], "error");
        assert_eq!(record["reason"], "llm exploded");
    }

    #[test]
    fn test_processing_recovers_to_pending_on_load() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.md"), "A").unwrap();
        let state_file = tmp.path().join("state.json");

        {
            let store = FileStore::new(&source, &state_file, &exts(&[".md"])).unwrap();
            let file = store.next_pending().unwrap();
            store.mark_processing(&file.path).unwrap();
            // Simulated crash: the run never finishes.
        }

        let store = FileStore::new(&source, &state_file, &exts(&[".md"])).unwrap();
        let file = store.next_pending().unwrap();
        assert_eq!(file.status, FileStatus::Pending);
    }

    #[test]
    fn test_corrupt_state_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let state_file = tmp.path().join("state.json");
        fs::write(&state_file, "{ not json ]").unwrap();

        let err = FileStore::new(&source, &state_file, &exts(&[".md"])).unwrap_err();
        assert!(matches!(err, FileStoreError::CorruptState(_)));
    }

    #[test]
    fn test_mark_error_then_reprocess_clears_reason() {
        let (_tmp, source, store) = setup(&[".md"]);
        let path = source.join("a.md");
        fs::write(&path, "A").unwrap();

        let file = store.next_pending().unwrap();
        store.mark_error(&file.path, "transient").unwrap();
        store.mark_processing(&file.path).unwrap();

        let data = fs::read_to_string(store.state_file.as_path()).unwrap();
        assert!(!data.contains("transient"));
        assert!(data.contains("processing"));
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let (_tmp, source, store) = setup(&[".md"]);
        let nested = source.join("deep").join("deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("n.md"), "N").unwrap();

        let file = store.next_pending().unwrap();
        assert!(file.path.ends_with("deeper/n.md"));
    }
}
