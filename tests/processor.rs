//! Batch Processor Integration Tests
//!
//! Exercises the sequential pipeline against mock clients: partial
//! failure accounting, upload gating, step ordering, and the no-retry
//! policy.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use inklet::adapters::{NoteStore, StoreError, Transcriber, Transcription, VisionError};
use inklet::core::{BatchProcessor, BatchSelection, FileStep, ProcessorOptions, StatusUpdate};
use inklet::domain::{Category, Note, NoteDraft, PendingFile};

/// Transcriber that fails for any image whose bytes contain
/// "bad-transcribe" and records every call.
#[derive(Default)]
struct MockTranscriber {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe_image(&self, image: &[u8]) -> Result<Transcription, VisionError> {
        let tag = String::from_utf8_lossy(image).to_string();
        self.calls.lock().unwrap().push(tag.clone());
        if tag.contains("bad-transcribe") {
            return Err(VisionError::Api {
                status: 500,
                message: "model unavailable".to_string(),
            });
        }
        Ok(Transcription {
            content: format!("note from {}", tag),
            category: Category::Quote,
            year: None,
        })
    }
}

/// Store that fails uploads for "bad-upload" names and saves for
/// "bad-save" content, recording everything else.
#[derive(Default)]
struct MockStore {
    saved: Mutex<Vec<NoteDraft>>,
    uploaded: Mutex<Vec<String>>,
}

#[async_trait]
impl NoteStore for MockStore {
    async fn upload_image(
        &self,
        file_name: &str,
        _bytes: Vec<u8>,
        _mime: &str,
    ) -> Result<String, StoreError> {
        if file_name.contains("bad-upload") {
            return Err(StoreError::Upload {
                status: 500,
                message: "bucket rejected the object".to_string(),
            });
        }
        self.uploaded.lock().unwrap().push(file_name.to_string());
        Ok(format!("https://blob.example/{}", file_name))
    }

    async fn save_note(&self, draft: &NoteDraft) -> Result<(), StoreError> {
        if draft.content.contains("bad-save") {
            return Err(StoreError::Api {
                status: 500,
                message: "insert failed".to_string(),
            });
        }
        self.saved.lock().unwrap().push(draft.clone());
        Ok(())
    }

    async fn get_all_notes(&self) -> Result<Vec<Note>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_note(&self, _id: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

fn pending(name: &str) -> PendingFile {
    PendingFile::new(name, "image/jpeg", name.as_bytes().to_vec(), vec![0u8])
}

fn options(upload_images: bool) -> ProcessorOptions {
    ProcessorOptions {
        upload_images,
        error_pause: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_partial_failures_are_isolated() {
    let transcriber = MockTranscriber::default();
    let store = MockStore::default();

    let mut selection = BatchSelection::new();
    selection.add(pending("a.jpg"));
    selection.add(pending("bad-transcribe.jpg"));
    selection.add(pending("b.jpg"));
    selection.add(pending("bad-save.jpg"));

    let processor = BatchProcessor::new(&transcriber, &store, options(false));
    let report = processor.process(selection, |_| {}).await;

    // N = 4, K = 2: the two healthy files land, in file order.
    assert_eq!(report.attempted, 4);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.summary(), "completed processing 2");

    let saved = store.saved.lock().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].content, "note from a.jpg");
    assert_eq!(saved[1].content, "note from b.jpg");
}

#[tokio::test]
async fn test_upload_failure_creates_no_orphan_record() {
    let transcriber = MockTranscriber::default();
    let store = MockStore::default();

    let mut selection = BatchSelection::new();
    selection.add(pending("bad-upload.jpg"));

    let processor = BatchProcessor::new(&transcriber, &store, options(true));
    let report = processor.process(selection, |_| {}).await;

    assert_eq!(report.succeeded(), 0);
    assert_eq!(report.failed(), 1);

    // The file aborted before transcription, so no note and no model call.
    assert!(store.saved.lock().unwrap().is_empty());
    assert!(transcriber.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_uploaded_url_is_linked_to_note() {
    let transcriber = MockTranscriber::default();
    let store = MockStore::default();

    let mut selection = BatchSelection::new();
    selection.add(pending("scan.jpg"));

    let processor = BatchProcessor::new(&transcriber, &store, options(true));
    let report = processor.process(selection, |_| {}).await;

    assert_eq!(report.succeeded(), 1);
    let saved = store.saved.lock().unwrap();
    assert_eq!(
        saved[0].image_url.as_deref(),
        Some("https://blob.example/scan.jpg")
    );
}

#[tokio::test]
async fn test_status_steps_arrive_in_order() {
    let transcriber = MockTranscriber::default();
    let store = MockStore::default();

    let mut selection = BatchSelection::new();
    selection.add(pending("scan.jpg"));

    let mut updates = Vec::new();
    let processor = BatchProcessor::new(&transcriber, &store, options(true));
    processor.process(selection, |u| updates.push(u)).await;

    let steps: Vec<FileStep> = updates
        .iter()
        .filter_map(|u| match u {
            StatusUpdate::Step { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(
        steps,
        vec![
            FileStep::Uploading,
            FileStep::Transcribing,
            FileStep::Persisting
        ]
    );
    assert!(matches!(
        updates.last(),
        Some(StatusUpdate::Completed {
            succeeded: 1,
            attempted: 1
        })
    ));
}

#[tokio::test]
async fn test_failures_are_reported_but_never_retried() {
    let transcriber = MockTranscriber::default();
    let store = MockStore::default();

    let mut selection = BatchSelection::new();
    selection.add(pending("bad-transcribe.jpg"));
    selection.add(pending("ok.jpg"));

    let mut failures = Vec::new();
    let processor = BatchProcessor::new(&transcriber, &store, options(false));
    let report = processor
        .process(selection, |u| {
            if let StatusUpdate::Failed { name, .. } = u {
                failures.push(name);
            }
        })
        .await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(failures, vec!["bad-transcribe.jpg".to_string()]);

    // Exactly one transcription attempt per file: no retry within a run.
    let calls = transcriber.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "bad-transcribe.jpg");
    assert_eq!(calls[1], "ok.jpg");
}

#[tokio::test]
async fn test_empty_batch_completes_immediately() {
    let transcriber = MockTranscriber::default();
    let store = MockStore::default();

    let processor = BatchProcessor::new(&transcriber, &store, options(false));
    let report = processor.process(BatchSelection::new(), |_| {}).await;

    assert_eq!(report.attempted, 0);
    assert_eq!(report.succeeded(), 0);
    assert_eq!(report.summary(), "completed processing 0");
}
