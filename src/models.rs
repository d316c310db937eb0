//! Core data models used throughout the pipeline.
//!
//! These types represent the files and notes that flow through the
//! extraction pipeline. The data lifecycle is:
//!
//! ```text
//! FileStore → TrackedFile → read() → ChatExtractor → MemoryNote
//!                                                        ↓
//!                                                  Embedder → EmbeddedNote
//!                                                        ↓
//!                                           NoteStore + DocWriter
//! ```
//!
//! # Type Relationships
//!
//! - A **[`TrackedFile`]** is a source file the scanner has discovered,
//!   together with its content hash and processing status.
//! - A **[`MemoryNote`]** is one piece of reusable knowledge the chat model
//!   distilled out of a file.
//! - An **[`EmbeddedNote`]** pairs a note with its dense embedding vector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Processing status of a tracked file.
///
/// Files move `Pending → Processing → Processed | Error`; a content change
/// observed by a later scan moves any terminal state back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Waiting to be processed.
    Pending,
    /// Currently being processed by a run.
    Processing,
    /// Successfully processed.
    Processed,
    /// Processing failed; the reason is recorded alongside.
    Error,
}

/// Category of a memory note.
///
/// | Kind | Meaning |
/// |------|---------|
/// | `Learning` | General knowledge, facts, or concepts |
/// | `Pattern` | Reusable patterns, best practices, or conventions |
/// | `Cookbook` | Step-by-step instructions or recipes |
/// | `Decision` | Architectural decisions, trade-offs, and rationale |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Learning,
    Pattern,
    Cookbook,
    Decision,
}

impl NoteKind {
    /// Parse a kind string from the model's response.
    ///
    /// Unknown values map to [`NoteKind::Learning`] so a creative model
    /// cannot widen the closed kind set.
    pub fn parse(kind: &str) -> Self {
        match kind {
            "pattern" => NoteKind::Pattern,
            "cookbook" => NoteKind::Cookbook,
            "decision" => NoteKind::Decision,
            _ => NoteKind::Learning,
        }
    }

    /// Lowercase wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Learning => "learning",
            NoteKind::Pattern => "pattern",
            NoteKind::Cookbook => "cookbook",
            NoteKind::Decision => "decision",
        }
    }
}

/// A source file discovered by the scanner, with its catalogue state.
#[derive(Debug, Clone)]
pub struct TrackedFile {
    /// Hex-encoded keyed content hash at the time of the last scan.
    pub hash: String,
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Current processing status.
    pub status: FileStatus,
}

/// One piece of reusable knowledge extracted from a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNote {
    /// Opaque unique identifier, assigned by the extractor.
    pub id: String,
    /// Self-contained description of the knowledge. Never empty.
    pub content: String,
    /// Category of the note.
    pub kind: NoteKind,
    /// Absolute path of the file the note was extracted from.
    pub path: PathBuf,
}

/// A memory note paired with its embedding vector.
///
/// The vector length is determined by the embedding model and is not
/// validated here.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedNote {
    pub note: MemoryNote,
    pub embedding: Vec<f32>,
}
