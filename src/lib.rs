//! inklet - handwritten-note capture and transcription
//!
//! A small pipeline around three third-party services: images of
//! handwritten notes are transcribed by a vision model, persisted to a
//! remote note store, and optionally read aloud by a speech synthesizer.
//!
//! # Architecture
//!
//! Everything non-trivial is delegated over HTTP; the original logic is
//! the batch workflow:
//! - Files are normalized (HEIC → JPEG) and collected into a selection
//!   with preview thumbnails
//! - The batch processor drives each file through upload → transcribe →
//!   persist, strictly one at a time
//! - A per-file failure is isolated: it is reported, the batch continues,
//!   and nothing is retried
//!
//! # Modules
//!
//! - `adapters`: External service clients (OpenAI, Supabase, ElevenLabs)
//! - `core`: Batch selection store and the sequential processor
//! - `ingest`: Format normalization and preview generation
//! - `render`: Markdown-to-terminal rendering and the note list
//! - `playback`: Audio playback for synthesized speech
//! - `domain`: Data structures (Note, NoteDraft, PendingFile)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Capture two note images (HEIC is converted automatically)
//! inklet add scan1.jpg scan2.heic
//!
//! # List saved notes, newest first
//! inklet list
//!
//! # Read a note aloud / delete one
//! inklet read <id>
//! inklet delete <id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;
pub mod playback;
pub mod render;

// Re-export main types at crate root for convenience
pub use adapters::{
    ElevenLabsClient, NoteStore, SpeechSynthesizer, StoreError, Transcriber, Transcription,
    VisionClient, VisionError,
};
pub use core::{BatchProcessor, BatchReport, BatchSelection, ProcessorOptions, StatusUpdate};
pub use domain::{Category, Note, NoteDraft, PendingFile};
