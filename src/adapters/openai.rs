//! OpenAI vision adapter for note transcription.
//!
//! One chat-completions request per image. The model is instructed to
//! answer with a bare JSON object; replies wrapped in a code fence are
//! unwrapped before parsing, and malformed-but-present output degrades
//! to an uncategorized note instead of an error.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::Transcriber;
use crate::domain::note::{deserialize_category, deserialize_year};
use crate::domain::Category;

/// Instruction prompt sent with every image.
const TRANSCRIPTION_PROMPT: &str = "Extract and categorize this handwritten note. Please follow these rules:\n\
1. For transcription: Correct obvious misspellings (e.g., \"Mg\" should be \"May\" if it's clearly meant to be the word \"May\")\n\
2. Maintain original capitalization unless it's clearly a mistake\n\
3. Use Markdown formatting to preserve styling:\n\
   - Use **bold** for emphasized/bold text\n\
   - Use _italic_ for underlined text\n\
   - Use # for headers/titles\n\
   - Use - or * for bullet points\n\
   - Use > for quoted text\n\
   - Preserve line breaks with double spaces\n\
Return a JSON object with these fields:\n\
- content: the transcribed text with Markdown formatting\n\
- type: categorize as prayer/quote/lesson\n\
- year: if mentioned in the note (null if not found)\n\
Return ONLY the JSON object, no additional formatting.";

/// Completion cap for a single transcription.
const MAX_COMPLETION_TOKENS: u32 = 1000;

/// Errors from the vision transcription call.
///
/// Malformed model output is deliberately NOT represented here; it
/// degrades to a fallback [`Transcription`] instead.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vision API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("vision API returned no choices")]
    EmptyReply,
}

/// Structured transcription result for one image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transcription {
    /// Markdown-formatted transcription text.
    pub content: String,

    #[serde(rename = "type", default, deserialize_with = "deserialize_category")]
    pub category: Category,

    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<i32>,
}

impl Transcription {
    /// Fallback used when the model reply is not valid JSON.
    pub fn fallback(raw: &str) -> Self {
        Self {
            content: raw.to_string(),
            category: Category::Unknown,
            year: None,
        }
    }
}

/// OpenAI chat-completions client for vision transcription
pub struct VisionClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

/// Response from the chat completions endpoint
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl VisionClient {
    /// Create a new client against the public OpenAI endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a compatible endpoint (proxy, self-hosted)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Submit one image, given as a data URI or a bare base64 string.
    pub async fn transcribe_data_uri(&self, image: &str) -> Result<Transcription, VisionError> {
        let image_url = ensure_data_uri(image);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": TRANSCRIPTION_PROMPT },
                    { "type": "image_url", "image_url": { "url": image_url, "detail": "high" } }
                ]
            }],
            "max_tokens": MAX_COMPLETION_TOKENS,
        });

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let raw = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(VisionError::EmptyReply)?
            .message
            .content;

        debug!(reply_bytes = raw.len(), "Received vision reply");
        Ok(parse_model_reply(&raw))
    }
}

#[async_trait]
impl Transcriber for VisionClient {
    async fn transcribe_image(&self, image: &[u8]) -> Result<Transcription, VisionError> {
        let data_uri = format!("data:image/jpeg;base64,{}", BASE64.encode(image));
        self.transcribe_data_uri(&data_uri).await
    }
}

/// Prefix a bare base64 payload so it forms a data URI.
fn ensure_data_uri(image: &str) -> String {
    if image.starts_with("data:") {
        image.to_string()
    } else {
        format!("data:image/jpeg;base64,{}", image)
    }
}

/// Unwrap a reply the model fenced as a code block.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        trimmed
    };

    let body = body.trim_start_matches('\n');
    let body = body.trim_end();
    body.strip_suffix("```").map(str::trim_end).unwrap_or(body)
}

/// Parse the model reply, degrading gracefully on malformed output.
pub fn parse_model_reply(raw: &str) -> Transcription {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Transcription>(cleaned) {
        Ok(transcription) => transcription,
        Err(e) => {
            warn!(error = %e, "Vision reply was not valid JSON, keeping raw text");
            Transcription::fallback(raw)
        }
    }
}
