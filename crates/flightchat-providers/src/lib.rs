//! Provider adapters for the external capabilities flightchat consumes.
//!
//! Each capability (flight search, text generation, translation, image
//! generation, speech) is one async trait with two implementations: a live
//! HTTP client and a deterministic mock. [`ProviderSet`] picks between them
//! once, at construction, based on which credentials are configured; call
//! sites never branch on the variant.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use flightchat_core::{FlightOffer, FlightQuery, Message, ProviderFailure, ProviderKind};

pub mod flight;
mod http;
pub mod image;
pub mod registry;
pub mod speech;
pub mod text;
pub mod translation;

pub use flight::{AmadeusFlightProvider, MockFlightProvider};
pub use image::{MockImageProvider, OpenAiImageProvider};
pub use registry::{ProviderModes, ProviderSet, ProviderTimeouts};
pub use speech::{MockSpeechProvider, OpenAiSpeechProvider};
pub use text::{MockTextProvider, OpenAiTextProvider};
pub use translation::{resolve_language, AnthropicTranslator, MockTranslator};

// =============================================================================
// Capability traits
// =============================================================================

/// Searches for flight offers.
#[async_trait]
pub trait FlightProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Whether this talks to a real service.
    fn is_live(&self) -> bool;

    /// Search offers for a validated query. Order is not significant.
    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, ProviderFailure>;
}

/// Input for a natural-language summary.
#[derive(Debug, Clone, Copy)]
pub enum SummaryRequest<'a> {
    /// Summarize ranked offers (already capped to the top N).
    Offers {
        user_text: &'a str,
        query: &'a FlightQuery,
        offers: &'a [FlightOffer],
    },
    /// Reply to a non-flight utterance using recent history.
    ChitChat {
        user_text: &'a str,
        history: &'a [Message],
    },
}

impl SummaryRequest<'_> {
    pub fn user_text(&self) -> &str {
        match self {
            SummaryRequest::Offers { user_text, .. } => user_text,
            SummaryRequest::ChitChat { user_text, .. } => user_text,
        }
    }
}

/// Generates reply text.
#[async_trait]
pub trait TextGenProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_live(&self) -> bool;
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, ProviderFailure>;
}

/// Translates reply text.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_live(&self) -> bool;
    async fn translate(&self, text: &str, target_language: &str)
        -> Result<String, ProviderFailure>;
}

/// Generated binary output and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Generates images from a prompt.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_live(&self) -> bool;
    async fn generate(&self, prompt: &str) -> Result<GeneratedArtifact, ProviderFailure>;
}

/// Speech-to-text and text-to-speech.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_live(&self) -> bool;
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, ProviderFailure>;
    async fn synthesize(&self, text: &str, voice: &str)
        -> Result<GeneratedArtifact, ProviderFailure>;
}

// =============================================================================
// Bounded calls
// =============================================================================

/// Run a provider call with an upper time bound.
///
/// Exceeding `limit` yields a [`FailureKind::Timeout`](flightchat_core::FailureKind)
/// failure and drops the in-flight call.
pub async fn bounded<T, F>(
    provider: ProviderKind,
    limit: Duration,
    call: F,
) -> Result<T, ProviderFailure>
where
    F: Future<Output = Result<T, ProviderFailure>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderFailure::timeout(
            provider,
            format!("no response within {:?}", limit),
        )),
    }
}
