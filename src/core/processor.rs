//! Batch processor: the sequential per-file pipeline.
//!
//! Files are processed strictly one after another, never in parallel, so
//! status output always reflects a single in-flight item and a slow or
//! failing request is never amplified into concurrent identical calls.
//!
//! Per file: (optional) upload the source image, transcribe, persist.
//! A step failure is recorded for that file only; the batch advances
//! after a short pause that keeps the error visible. There is no abort,
//! no rollback of already-persisted notes, and no retry.
//!
//! The processor consumes the [`BatchSelection`] by value: while a run
//! is active nothing else can mutate the selection, and it is cleared
//! unconditionally when the run finishes.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::adapters::{NoteStore, StoreError, Transcriber, VisionError};
use crate::domain::{NoteDraft, PendingFile};

use super::selection::BatchSelection;

/// Which step of the per-file pipeline is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStep {
    Uploading,
    Transcribing,
    Persisting,
}

impl std::fmt::Display for FileStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Uploading => "uploading",
            Self::Transcribing => "transcribing",
            Self::Persisting => "saving",
        };
        f.write_str(label)
    }
}

/// A per-file failure, attributed to the step that produced it.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("upload: {0}")]
    Upload(#[source] StoreError),

    #[error("transcription: {0}")]
    Transcribe(#[source] VisionError),

    #[error("save: {0}")]
    Persist(#[source] StoreError),
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// A step started for the named file.
    Step { name: String, step: FileStep },

    /// The named file failed; the batch continues.
    Failed { name: String, message: String },

    /// All files were attempted.
    Completed { succeeded: usize, attempted: usize },
}

/// Outcome for one attempted file.
#[derive(Debug)]
pub struct FileOutcome {
    pub entry_id: uuid::Uuid,
    pub name: String,
    pub result: Result<(), StepError>,
}

/// Result of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded()
    }

    /// The terminal status line for the run.
    pub fn summary(&self) -> String {
        format!("completed processing {}", self.succeeded())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Upload each source image and link its public URL to the note.
    pub upload_images: bool,

    /// Pause after a per-file failure so the error is perceptibly
    /// visible before the next file starts.
    pub error_pause: Duration,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            upload_images: false,
            error_pause: Duration::from_millis(1200),
        }
    }
}

/// Drives each selected file through the pipeline in sequence.
pub struct BatchProcessor<'a, T, S> {
    transcriber: &'a T,
    store: &'a S,
    options: ProcessorOptions,
}

impl<'a, T, S> BatchProcessor<'a, T, S>
where
    T: Transcriber,
    S: NoteStore,
{
    pub fn new(transcriber: &'a T, store: &'a S, options: ProcessorOptions) -> Self {
        Self {
            transcriber,
            store,
            options,
        }
    }

    /// Process every entry in the selection, in order. The selection is
    /// consumed; per-file failures never cancel remaining items.
    #[instrument(skip_all, fields(files = selection.len()))]
    pub async fn process(
        &self,
        mut selection: BatchSelection,
        mut on_status: impl FnMut(StatusUpdate),
    ) -> BatchReport {
        let entries = selection.take_all();
        let mut report = BatchReport {
            attempted: entries.len(),
            outcomes: Vec::with_capacity(entries.len()),
        };

        for entry in entries {
            let result = self.process_entry(&entry, &mut on_status).await;

            if let Err(e) = &result {
                error!(file = %entry.name, error = %e, "File failed, continuing with batch");
                on_status(StatusUpdate::Failed {
                    name: entry.name.clone(),
                    message: e.to_string(),
                });
                // Keep the error on screen before the next file starts.
                if !self.options.error_pause.is_zero() {
                    tokio::time::sleep(self.options.error_pause).await;
                }
            }

            report.outcomes.push(FileOutcome {
                entry_id: entry.id,
                name: entry.name,
                result,
            });
        }

        info!(
            succeeded = report.succeeded(),
            attempted = report.attempted,
            "Batch finished"
        );
        on_status(StatusUpdate::Completed {
            succeeded: report.succeeded(),
            attempted: report.attempted,
        });

        report
    }

    async fn process_entry(
        &self,
        entry: &PendingFile,
        on_status: &mut impl FnMut(StatusUpdate),
    ) -> Result<(), StepError> {
        // Upload first: a failed upload aborts the file before a note is
        // created, so no record ever lacks its linked image.
        let image_url = if self.options.upload_images {
            on_status(StatusUpdate::Step {
                name: entry.name.clone(),
                step: FileStep::Uploading,
            });
            let url = self
                .store
                .upload_image(&entry.name, entry.bytes.clone(), &entry.mime)
                .await
                .map_err(StepError::Upload)?;
            Some(url)
        } else {
            None
        };

        on_status(StatusUpdate::Step {
            name: entry.name.clone(),
            step: FileStep::Transcribing,
        });
        let transcription = self
            .transcriber
            .transcribe_image(&entry.bytes)
            .await
            .map_err(StepError::Transcribe)?;

        on_status(StatusUpdate::Step {
            name: entry.name.clone(),
            step: FileStep::Persisting,
        });
        let draft = NoteDraft::new(transcription.content)
            .with_category(transcription.category)
            .with_year(transcription.year)
            .with_image_url(image_url);
        self.store
            .save_note(&draft)
            .await
            .map_err(StepError::Persist)?;

        Ok(())
    }
}
