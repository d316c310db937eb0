//! Error types for the extraction pipeline.
//!
//! Each component has its own `thiserror` enum so callers can match on the
//! exact failure kind; the crate-level [`Error`] aggregates them for the
//! pipeline surface. The "no more pending files" condition is an ordinary
//! control signal and gets a dedicated variant
//! ([`FileStoreError::NoMorePending`]) rather than a message to compare
//! against.

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File scanning or state tracking failed
    #[error("file store error: {0}")]
    FileStore(#[from] FileStoreError),

    /// Note extraction failed
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),

    /// Note persistence failed
    #[error("note store error: {0}")]
    NoteStore(#[from] NoteStoreError),

    /// Documentation output failed
    #[error("doc writer error: {0}")]
    DocWriter(#[from] DocWriterError),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// File scanner and state-machine errors.
#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("source dir cannot be empty")]
    EmptySourceDir,

    #[error("state file cannot be empty")]
    EmptyStateFile,

    #[error("extensions cannot be empty")]
    EmptyExtensions,

    /// Control signal: the scan found nothing left in `pending`.
    #[error("no more pending files")]
    NoMorePending,

    /// A read targeted a file that does not exist on disk.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A status transition targeted a path the catalogue does not know.
    #[error("path not tracked: {0}")]
    UnknownPath(String),

    #[error("state file is corrupt: {0}")]
    CorruptState(#[source] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat-extraction client errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("api_key cannot be empty")]
    EmptyApiKey,

    #[error("base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("model cannot be empty")]
    EmptyModel,

    #[error("contents cannot be empty")]
    EmptyContents,

    /// The request never reached the server successfully.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered, but with an error status, an API error field,
    /// or a body that does not parse into notes.
    #[error("response error: {0}")]
    Response(String),
}

/// Embedding client errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("api_key cannot be empty")]
    EmptyApiKey,

    #[error("base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("model cannot be empty")]
    EmptyModel,

    #[error("text cannot be empty")]
    EmptyText,

    /// The request never reached the server successfully.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered, but with an error status, an API error field,
    /// or a body without embedding data.
    #[error("response error: {0}")]
    Response(String),
}

/// Note collection persistence errors.
#[derive(Error, Debug)]
pub enum NoteStoreError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("notes file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Documentation tree errors.
#[derive(Error, Debug)]
pub enum DocWriterError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
