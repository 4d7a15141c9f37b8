//! Adapter interfaces for external systems.
//!
//! Adapters wrap the third-party HTTP services the pipeline delegates to:
//! the vision model (OpenAI), the record/blob store (Supabase), and the
//! speech synthesizer (ElevenLabs). The traits here are the seams the
//! batch processor and CLI compose; tests substitute mock implementations.

pub mod elevenlabs;
pub mod openai;
pub mod supabase;

use async_trait::async_trait;

use crate::domain::NoteDraft;

// Re-export the concrete clients
pub use elevenlabs::{ElevenLabsClient, SpeechError};
pub use openai::{Transcription, VisionClient, VisionError};
pub use supabase::{StoreError, SupabaseStore};

/// Trait for vision transcription of a single image.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one image into content, category, and optional year.
    async fn transcribe_image(&self, image: &[u8]) -> Result<Transcription, VisionError>;
}

/// Trait for the remote note store (records and blobs).
///
/// Every call reflects remote state at call time; there is no
/// client-side caching.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Store raw image bytes and return the public URL.
    async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<String, StoreError>;

    /// Create a new note record.
    async fn save_note(&self, draft: &NoteDraft) -> Result<(), StoreError>;

    /// Fetch all notes, sorted by creation time descending.
    async fn get_all_notes(&self) -> Result<Vec<crate::domain::Note>, StoreError>;

    /// Remove one note by identifier.
    async fn delete_note(&self, id: &str) -> Result<(), StoreError>;
}

/// Trait for reading text aloud.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize and play `text`, returning only once playback finished.
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}
