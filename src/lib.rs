//! # Memory Harness
//!
//! **A batch knowledge-extraction pipeline for long-term project memory.**
//!
//! Memory Harness walks a directory tree of text-like sources, asks an
//! OpenAI-compatible chat model to distill each file into typed memory notes,
//! attaches an embedding vector to every note, and persists the results into
//! a durable JSON knowledge base plus a browsable Markdown documentation
//! tree.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐   ┌───────────┐
//! │ FileStore │──▶│ ChatExtractor │──▶│ Embedder  │──▶│ NoteStore │
//! │ scan+state│   │ /chat/compl.  │   │ /embedd.  │   │ notes.json│
//! └─────┬─────┘   └──────────────┘   └─────┬─────┘   └───────────┘
//!       │                                  │
//!       │ state.json                       ▼
//!       │                            ┌───────────┐
//!       └───────── mark processed ──▶│ DocWriter │
//!                                    │ docs/*.md │
//!                                    └───────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **[`file_store`]** scans the source root, tracking each eligible
//!    file through `pending → processing → processed | error` in a durable
//!    JSON catalogue. Content changes reset files to `pending`, which makes
//!    runs incremental and resumable.
//! 2. The **[`extractor`]** sends each pending file to the chat-completions
//!    endpoint and parses the strict JSON reply into typed
//!    [`models::MemoryNote`]s.
//! 3. The **[`embedder`]** fetches one dense vector per note from the
//!    embeddings endpoint.
//! 4. The **[`note_store`]** upserts embedded notes by id and snapshots the
//!    whole collection to disk, while the **[`doc_writer`]** renders a
//!    category-partitioned Markdown tree.
//! 5. The **[`pipeline`]** orchestrates one sequential batch run with
//!    per-file error isolation: a model failure on one file never aborts the
//!    batch, while embedding or persistence failures do.
//!
//! ## Quick Start
//!
//! ```bash
//! memo --config ./config/memo.toml run      # process all pending files
//! memo --config ./config/memo.toml status   # summarise catalogue state
//! ```

pub mod config;
pub mod doc_writer;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod file_store;
pub mod models;
pub mod note_store;
pub mod pipeline;
pub mod progress;
pub mod status;
