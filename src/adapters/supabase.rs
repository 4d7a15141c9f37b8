//! Supabase adapter: note records (REST) and source images (Storage).
//!
//! Notes live in the `notes` table and are created, listed newest-first,
//! and deleted; they are never updated in place. Source images go into a
//! storage bucket under a collision-resistant object name, and their
//! public URL is linked from the note record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use super::NoteStore;
use crate::domain::{Note, NoteDraft};

/// Errors from the record/blob store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Record CRUD failure (create, list, delete)
    #[error("store API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Blob upload failure; the note is never created when this fires
    #[error("image upload failed ({status}): {message}")]
    Upload { status: u16, message: String },
}

/// Supabase REST + Storage client
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    bucket: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bucket: bucket.into(),
            client: reqwest::Client::new(),
        }
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/notes", self.base_url)
    }

    fn object_url(&self, object: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, object
        )
    }

    /// Public URL an uploaded object resolves to.
    pub fn public_url(&self, object: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Parse a successful JSON response or surface the remote error message.
    async fn expect_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let (status, message) = remote_error(response).await;
            return Err(StoreError::Api { status, message });
        }
        Ok(response.json().await?)
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), StoreError> {
        let status = response.status();
        if !status.is_success() {
            let (status, message) = remote_error(response).await;
            return Err(StoreError::Api { status, message });
        }
        Ok(())
    }
}

/// Extract the remote `message` field, falling back to the status text.
async fn remote_error(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    (status.as_u16(), message)
}

/// Replace every character outside [A-Za-z0-9.] with an underscore.
pub fn sanitize_object_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}

/// Build a collision-resistant object name: millisecond timestamp plus
/// the sanitized original file name.
pub fn object_name(file_name: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", at.timestamp_millis(), sanitize_object_name(file_name))
}

#[async_trait]
impl NoteStore for SupabaseStore {
    async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<String, StoreError> {
        let object = object_name(file_name, Utc::now());
        debug!(%object, size = bytes.len(), "Uploading source image");

        let response = self
            .authed(self.client.post(self.object_url(&object)))
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (status, message) = remote_error(response).await;
            return Err(StoreError::Upload { status, message });
        }

        Ok(self.public_url(&object))
    }

    async fn save_note(&self, draft: &NoteDraft) -> Result<(), StoreError> {
        let response = self
            .authed(self.client.post(self.rest_url()))
            .header("Prefer", "return=minimal")
            .json(draft)
            .send()
            .await?;

        Self::expect_success(response).await?;
        info!(category = %draft.category, "Note saved");
        Ok(())
    }

    async fn get_all_notes(&self) -> Result<Vec<Note>, StoreError> {
        let response = self
            .authed(
                self.client
                    .get(self.rest_url())
                    .query(&[("select", "*"), ("order", "created_at.desc")]),
            )
            .send()
            .await?;

        Self::expect_json(response).await
    }

    async fn delete_note(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .authed(
                self.client
                    .delete(self.rest_url())
                    .query(&[("id", format!("eq.{}", id))]),
            )
            .send()
            .await?;

        Self::expect_success(response).await?;
        info!(%id, "Note deleted");
        Ok(())
    }
}
