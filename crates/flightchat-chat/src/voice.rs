//! Voice input and output.
//!
//! Transcription fills the host's message box and is never sent as a turn by
//! itself. Synthesis goes through the artifact cache keyed by (text, voice).

use std::sync::Arc;
use std::time::Duration;

use flightchat_cache::{ArtifactCache, CacheKey};
use flightchat_core::{ArtifactKind, Attachment, ProviderKind};
use flightchat_providers::{bounded, ProviderSet, SpeechProvider};

use crate::error::ChatError;

/// Speech-to-text and text-to-speech over the bound speech provider.
pub struct VoiceInterface {
    speech: Arc<dyn SpeechProvider>,
    cache: Arc<ArtifactCache>,
    timeout: Duration,
    default_voice: String,
}

impl VoiceInterface {
    pub fn new(
        speech: Arc<dyn SpeechProvider>,
        cache: Arc<ArtifactCache>,
        timeout: Duration,
        default_voice: impl Into<String>,
    ) -> Self {
        Self {
            speech,
            cache,
            timeout,
            default_voice: default_voice.into(),
        }
    }

    pub fn from_providers(
        providers: &ProviderSet,
        cache: Arc<ArtifactCache>,
        default_voice: impl Into<String>,
    ) -> Self {
        Self::new(
            providers.speech.clone(),
            cache,
            providers.timeouts.speech,
            default_voice,
        )
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Transcribe recorded audio. Returns an empty string when transcription
    /// fails, leaving the user to type instead.
    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> String {
        match bounded(
            ProviderKind::Speech,
            self.timeout,
            self.speech.transcribe(audio, mime_type),
        )
        .await
        {
            Ok(text) => text.trim().to_string(),
            Err(failure) => {
                tracing::warn!(
                    provider = self.speech.name(),
                    kind = %failure.kind,
                    error = %failure,
                    bytes = audio.len(),
                    "Transcription failed"
                );
                String::new()
            }
        }
    }

    /// Synthesize `text` as speech, reusing a cached rendition when present.
    ///
    /// `voice` falls back to the configured default.
    pub async fn speak(&self, text: &str, voice: Option<&str>) -> Result<Attachment, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_voice);

        let key = CacheKey::derive(ArtifactKind::Audio, &[text, voice]);
        if let Some(entry) = self.cache.lookup(&key)? {
            return Ok(Attachment {
                kind: ArtifactKind::Audio,
                handle: entry.handle,
                mime_type: entry.mime_type,
            });
        }

        let audio = bounded(
            ProviderKind::Speech,
            self.timeout,
            self.speech.synthesize(text, voice),
        )
        .await
        .map_err(|failure| {
            tracing::warn!(
                provider = self.speech.name(),
                kind = %failure.kind,
                error = %failure,
                "Speech synthesis failed"
            );
            ChatError::Voice(failure.to_string())
        })?;

        let entry = self.cache.insert(key, &audio.bytes, &audio.mime_type).await?;
        tracing::debug!(handle = %entry.handle, voice, "Speech synthesized");
        Ok(Attachment {
            kind: ArtifactKind::Audio,
            handle: entry.handle,
            mime_type: entry.mime_type,
        })
    }
}
