//! Extraction pipeline orchestration.
//!
//! Coordinates one batch run: pending-file collection → LLM extraction →
//! embedding → note persistence → status update, with documentation emitted
//! at the end. The run is strictly sequential (one file, then one note at a
//! time) to respect model-server rate limits.
//!
//! # Run Stages
//!
//! 1. **Collect pending** — drain [`FileStore::next_pending`], marking each
//!    file `processing`. An empty batch is a successful no-op.
//! 2. **Extract** — read each file and ask the chat model for notes. A read
//!    or extraction failure marks that file `error` (with the reason) and the
//!    batch continues; only a failure to record the error is fatal. Errored
//!    files drop out of the batch here — their `error` status is final for
//!    this run.
//! 3. **Short-circuit** — if no file produced notes, finalize the docs tree
//!    and mark the successfully-extracted files `processed`.
//! 4. **Embed** — attach a vector to every note. Any embedding failure aborts
//!    the run: embedding is cheap to retry on the next run, and dropping a
//!    note silently would leave the stores inconsistent. Each embedded note
//!    is also handed to the doc writer.
//! 5. **Persist** — upsert every embedded note into the note store. Fatal on
//!    failure.
//! 6. **Finalize** — render the docs, then mark every successfully-extracted
//!    file `processed`. The docs come first: a finalize failure leaves the
//!    batch files unprocessed, so the next run re-extracts them instead of
//!    stranding a stale documentation tree behind `processed` state.
//!
//! Because every state transition is persisted before it returns, aborting a
//! run at any point loses at most the in-flight file; files still in
//! `processing` are recovered to `pending` when the store is next opened.

use crate::doc_writer::DocWriter;
use crate::embedder::NoteEmbedder;
use crate::error::{FileStoreError, Result};
use crate::extractor::NoteExtractor;
use crate::file_store::FileStore;
use crate::models::{EmbeddedNote, MemoryNote, TrackedFile};
use crate::note_store::NoteStore;
use crate::progress::ProgressReporter;

/// Phase label reported while files are being read and extracted.
pub const PHASE_EXTRACT: &str = "Extracting notes";
/// Phase label reported while notes are being embedded.
pub const PHASE_EMBED: &str = "Embedding notes";
/// Phase label reported while notes are being persisted.
pub const PHASE_SAVE: &str = "Saving notes";
/// Phase label reported while file statuses are being finalized.
pub const PHASE_STATUS: &str = "Updating status";

/// One-shot batch orchestrator over the pipeline components.
///
/// Holds no state across runs; everything durable lives in the stores.
pub struct Pipeline {
    files: FileStore,
    extractor: Box<dyn NoteExtractor>,
    embedder: Box<dyn NoteEmbedder>,
    notes: NoteStore,
    docs: DocWriter,
    progress: Box<dyn ProgressReporter>,
}

impl Pipeline {
    pub fn new(
        files: FileStore,
        extractor: Box<dyn NoteExtractor>,
        embedder: Box<dyn NoteEmbedder>,
        notes: NoteStore,
        docs: DocWriter,
        progress: Box<dyn ProgressReporter>,
    ) -> Self {
        Self {
            files,
            extractor,
            embedder,
            notes,
            docs,
            progress,
        }
    }

    /// Execute one batch run to completion.
    pub async fn run(&self) -> Result<()> {
        let files = self.collect_pending()?;
        if files.is_empty() {
            tracing::info!("no pending files");
            return Ok(());
        }
        tracing::info!(files = files.len(), "starting extraction batch");

        let (notes, extracted) = self.extract_notes(&files).await?;
        if notes.is_empty() {
            self.docs.finalize()?;
            self.update_file_status(&extracted)?;
            return Ok(());
        }

        let embedded = self.embed_notes(notes).await?;
        self.save_notes(&embedded)?;
        self.docs.finalize()?;
        self.update_file_status(&extracted)?;

        tracing::info!(notes = embedded.len(), "batch complete");
        Ok(())
    }

    /// Drain the scanner, marking every returned file as `processing`.
    fn collect_pending(&self) -> Result<Vec<TrackedFile>> {
        let mut files = Vec::new();

        loop {
            match self.files.next_pending() {
                Ok(file) => {
                    self.files.mark_processing(&file.path)?;
                    files.push(file);
                }
                Err(FileStoreError::NoMorePending) => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(files)
    }

    /// Read and extract each file. Per-file failures are recorded in the
    /// catalogue and skipped; a failing `mark_error` aborts the batch.
    ///
    /// Returns the extracted notes together with the files that made it
    /// through — only those may later become `processed`; files marked
    /// `error` here must keep that status and reason for the rest of the run.
    async fn extract_notes(
        &self,
        files: &[TrackedFile],
    ) -> Result<(Vec<MemoryNote>, Vec<TrackedFile>)> {
        let mut all_notes = Vec::new();
        let mut extracted = Vec::with_capacity(files.len());
        let total = files.len();

        for (i, file) in files.iter().enumerate() {
            self.progress.report(i + 1, total, PHASE_EXTRACT);

            let contents = match self.files.read(&file.path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "read failed");
                    self.files.mark_error(&file.path, &e.to_string())?;
                    continue;
                }
            };

            match self.extractor.extract(&file.path, &contents).await {
                Ok(notes) => {
                    all_notes.extend(notes);
                    extracted.push(file.clone());
                }
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "extraction failed");
                    self.files.mark_error(&file.path, &e.to_string())?;
                }
            }
        }

        Ok((all_notes, extracted))
    }

    /// Embed every note; each embedded note also flows to the doc writer.
    /// Any failure here is batch-fatal.
    async fn embed_notes(&self, notes: Vec<MemoryNote>) -> Result<Vec<EmbeddedNote>> {
        let total = notes.len();
        let mut embedded_notes = Vec::with_capacity(total);

        for (i, note) in notes.into_iter().enumerate() {
            self.progress.report(i + 1, total, PHASE_EMBED);

            let embedded = self.embedder.embed(note).await?;
            self.docs.write(embedded.note.clone());
            embedded_notes.push(embedded);
        }

        Ok(embedded_notes)
    }

    fn save_notes(&self, notes: &[EmbeddedNote]) -> Result<()> {
        let total = notes.len();

        for (i, note) in notes.iter().enumerate() {
            self.progress.report(i + 1, total, PHASE_SAVE);
            self.notes.save(note)?;
        }

        Ok(())
    }

    fn update_file_status(&self, files: &[TrackedFile]) -> Result<()> {
        let total = files.len();

        for (i, file) in files.iter().enumerate() {
            self.progress.report(i + 1, total, PHASE_STATUS);
            self.files.mark_processed(&file.path)?;
        }

        Ok(())
    }
}
