//! Markdown documentation tree, partitioned by note kind.
//!
//! Notes are collected in memory during a run and written out once by
//! [`DocWriter::finalize`]: an `index.md` with per-category counts plus one
//! file per kind, each grouping notes under `## <path>` headers. Paths are
//! sorted and the writer holds no timestamps, so finalizing the same note
//! set twice produces byte-identical files.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::DocWriterError;
use crate::models::{MemoryNote, NoteKind};

/// One documentation category: a kind with its rendered file name and blurbs.
struct Category {
    kind: NoteKind,
    title: &'static str,
    description: &'static str,
    filename: &'static str,
}

const CATEGORIES: [Category; 4] = [
    Category {
        kind: NoteKind::Learning,
        title: "Learnings",
        description: "General knowledge, facts, and concepts extracted from the sources.",
        filename: "learnings.md",
    },
    Category {
        kind: NoteKind::Pattern,
        title: "Patterns",
        description: "Reusable patterns, best practices, and conventions found in the sources.",
        filename: "patterns.md",
    },
    Category {
        kind: NoteKind::Cookbook,
        title: "Cookbooks",
        description: "Step-by-step instructions and recipes for common tasks.",
        filename: "cookbooks.md",
    },
    Category {
        kind: NoteKind::Decision,
        title: "Decisions",
        description: "Architectural decisions, trade-offs, and rationale.",
        filename: "decisions.md",
    },
];

/// Collects notes per kind and emits the documentation tree at finalize time.
#[derive(Debug)]
pub struct DocWriter {
    notes: Mutex<HashMap<NoteKind, Vec<MemoryNote>>>,
    dir: PathBuf,
}

impl DocWriter {
    /// Create a writer targeting `dir`. Nothing is written until
    /// [`DocWriter::finalize`].
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DocWriterError> {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            return Err(DocWriterError::EmptyPath);
        }

        Ok(Self {
            notes: Mutex::new(HashMap::new()),
            dir,
        })
    }

    /// Collect a note for later rendering.
    pub fn write(&self, note: MemoryNote) {
        self.notes.lock().entry(note.kind).or_default().push(note);
    }

    /// Render `index.md` and the four category files, overwriting existing
    /// output. Idempotent over the same note set.
    pub fn finalize(&self) -> Result<(), DocWriterError> {
        let notes = self.notes.lock();

        std::fs::create_dir_all(&self.dir)?;

        self.write_index(&notes)?;
        for cat in &CATEGORIES {
            let empty = Vec::new();
            let kind_notes = notes.get(&cat.kind).unwrap_or(&empty);
            self.write_category(cat, kind_notes)?;
        }

        Ok(())
    }

    fn write_index(
        &self,
        notes: &HashMap<NoteKind, Vec<MemoryNote>>,
    ) -> Result<(), DocWriterError> {
        let mut out = String::new();
        out.push_str("# Knowledge Base\n\n");
        out.push_str("This documentation was automatically generated from source analysis.\n\n");
        out.push_str("## Categories\n\n");

        for cat in &CATEGORIES {
            let count = notes.get(&cat.kind).map_or(0, Vec::len);
            out.push_str(&format!(
                "- [{}]({}) ({} notes) - {}\n",
                cat.title, cat.filename, count, cat.description
            ));
        }

        let total: usize = notes.values().map(Vec::len).sum();
        out.push_str(&format!("\n## Summary\n\n**Total Notes:** {}\n", total));

        std::fs::write(self.dir.join("index.md"), out)?;
        Ok(())
    }

    fn write_category(
        &self,
        cat: &Category,
        notes: &[MemoryNote],
    ) -> Result<(), DocWriterError> {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", cat.title));
        out.push_str(cat.description);
        out.push_str("\n\n");

        if notes.is_empty() {
            out.push_str("*No notes in this category yet.*\n");
            std::fs::write(self.dir.join(cat.filename), out)?;
            return Ok(());
        }

        // Group by source path; BTreeMap gives the stable path order the
        // output promises.
        let mut by_path: BTreeMap<&Path, Vec<&MemoryNote>> = BTreeMap::new();
        for note in notes {
            by_path.entry(note.path.as_path()).or_default().push(note);
        }

        for (path, path_notes) in &by_path {
            out.push_str(&format!("## {}\n\n", path.display()));
            for note in path_notes {
                out.push_str(&note.content);
                out.push_str("\n\n---\n\n");
            }
        }

        std::fs::write(self.dir.join(cat.filename), out)?;
        Ok(())
    }
}
