//! Speech adapters: transcription (speech → text) and synthesis (text → speech).

use async_trait::async_trait;
use flightchat_core::config::OpenAiConfig;
use flightchat_core::{ProviderFailure, ProviderKind};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use crate::http::{ensure_success, read_json, request_failure, trim_base};
use crate::{GeneratedArtifact, SpeechProvider};

const PROVIDER: ProviderKind = ProviderKind::Speech;

/// File extension the transcription endpoint expects for a MIME type.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/flac" => "flac",
        _ => "webm",
    }
}

// =============================================================================
// OpenAI
// =============================================================================

/// Live speech over the OpenAI audio endpoints.
pub struct OpenAiSpeechProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    transcription_model: String,
    tts_model: String,
}

impl OpenAiSpeechProvider {
    /// Build from config. Returns `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &OpenAiConfig) -> Option<Self> {
        Some(Self {
            client,
            base_url: trim_base(&config.base_url),
            api_key: config.api_key.clone()?,
            transcription_model: config.transcription_model.clone(),
            tts_model: config.tts_model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, ProviderFailure> {
        let part = Part::bytes(audio.to_vec())
            .file_name(format!("speech.{}", extension_for(mime_type)))
            .mime_str(mime_type)
            .map_err(|e| ProviderFailure::malformed(PROVIDER, e.to_string()))?;
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let parsed: TranscriptionResponse = read_json(PROVIDER, response).await?;
        Ok(parsed.text.trim().to_string())
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<GeneratedArtifact, ProviderFailure> {
        let body = json!({
            "model": self.tts_model,
            "voice": voice,
            "input": text,
        });

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        if bytes.is_empty() {
            return Err(ProviderFailure::malformed(PROVIDER, "empty audio body"));
        }

        tracing::info!(model = %self.tts_model, voice, bytes = bytes.len(), "Speech synthesized");
        Ok(GeneratedArtifact {
            bytes: bytes.to_vec(),
            mime_type: "audio/mpeg".to_string(),
        })
    }
}

// =============================================================================
// Mock
// =============================================================================

/// Sample rate of mock audio (8-bit mono PCM).
const MOCK_SAMPLE_RATE: u32 = 8000;
/// Seconds of mock audio per word, capped at ten seconds.
const MOCK_SECONDS_PER_WORD: f32 = 0.3;

/// Offline speech provider.
///
/// Transcription returns a fixed marker; synthesis returns a silent WAV whose
/// length depends on the word count.
#[derive(Debug, Clone, Default)]
pub struct MockSpeechProvider;

impl MockSpeechProvider {
    pub fn new() -> Self {
        Self
    }
}

fn silent_wav(samples: u32) -> Vec<u8> {
    let mut wav = Vec::with_capacity(44 + samples as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + samples).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&MOCK_SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&MOCK_SAMPLE_RATE.to_le_bytes()); // byte rate
    wav.extend_from_slice(&1u16.to_le_bytes()); // block align
    wav.extend_from_slice(&8u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&samples.to_le_bytes());
    // 8-bit PCM silence is 128
    wav.resize(44 + samples as usize, 128);
    wav
}

#[async_trait]
impl SpeechProvider for MockSpeechProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn transcribe(&self, audio: &[u8], _mime_type: &str) -> Result<String, ProviderFailure> {
        if audio.is_empty() {
            return Err(ProviderFailure::malformed(PROVIDER, "cannot transcribe empty audio"));
        }
        Ok("[mock transcription]".to_string())
    }

    async fn synthesize(
        &self,
        text: &str,
        _voice: &str,
    ) -> Result<GeneratedArtifact, ProviderFailure> {
        let words = text.split_whitespace().count().max(1) as f32;
        let seconds = (words * MOCK_SECONDS_PER_WORD).min(10.0);
        let samples = (seconds * MOCK_SAMPLE_RATE as f32) as u32;
        Ok(GeneratedArtifact {
            bytes: silent_wav(samples),
            mime_type: "audio/wav".to_string(),
        })
    }
}
