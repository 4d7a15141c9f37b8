//! Pending file entries awaiting batch processing.
//!
//! Entries are transient and in-memory only: created when a file is
//! selected, dropped when it is removed from the selection or the batch
//! finishes. They are never persisted.

use uuid::Uuid;

/// A normalized file queued for processing, together with its preview.
///
/// The preview thumbnail lives inside the entry, so previews and entries
/// stay in one-to-one correspondence by construction. The `id` is the
/// durable identifier used for position-independent removal.
#[derive(Debug, Clone)]
pub struct PendingFile {
    /// Durable entry identifier, assigned at selection time.
    pub id: Uuid,

    /// Display name (already renamed to .jpg when conversion ran).
    pub name: String,

    /// MIME type of `bytes`.
    pub mime: String,

    /// Normalized image bytes sent to the vision model and the blob store.
    pub bytes: Vec<u8>,

    /// JPEG-encoded preview thumbnail.
    pub preview: Vec<u8>,
}

impl PendingFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
        preview: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime: mime.into(),
            bytes,
            preview,
        }
    }
}
