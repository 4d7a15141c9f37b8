//! ElevenLabs text-to-speech adapter.
//!
//! Direct HTTP contract: one POST per read-aloud request, fixed voice and
//! model selection, MPEG audio back. `speak` resolves only after playback
//! of the returned audio has finished, so a caller can keep a "reading"
//! affordance active for the audible duration.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::SpeechSynthesizer;
use crate::playback::{self, PlaybackError};

/// Fixed voice rendering parameters.
const STABILITY: f64 = 0.75;
const SIMILARITY_BOOST: f64 = 0.75;

/// Errors from speech synthesis or playback.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("speech API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("audio playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

/// ElevenLabs TTS client
pub struct ElevenLabsClient {
    api_key: String,
    voice_id: String,
    model_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: impl Into<String>,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
            base_url: "https://api.elevenlabs.io".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn tts_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            self.voice_id
        )
    }

    /// Synthesize `text` and return the MPEG audio bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": STABILITY,
                "similarity_boost": SIMILARITY_BOOST,
            }
        });

        let response = self
            .client
            .post(self.tts_url())
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
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
                    v.pointer("/detail/message")
                        .or_else(|| v.get("message"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(SpeechError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let audio = response.bytes().await?.to_vec();
        debug!(audio_bytes = audio.len(), "Received synthesized audio");
        Ok(audio)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let audio = self.synthesize(text).await?;

        // The audio device API is synchronous; play on a blocking task and
        // suspend here until the last sample has been rendered.
        tokio::task::spawn_blocking(move || playback::play(&audio))
            .await
            .map_err(|e| PlaybackError::Stream(format!("playback task failed: {}", e)))??;

        Ok(())
    }
}
