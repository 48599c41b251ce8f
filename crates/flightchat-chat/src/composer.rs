//! Response composition.
//!
//! Builds the assistant [`Message`] for a turn: a summary (generated, or
//! templated when generation fails), then the optional translation, image and
//! speech modalities. Each modality fails on its own; a usable text reply is
//! never discarded because an auxiliary step failed.

use std::sync::Arc;

use flightchat_cache::{ArtifactCache, CacheKey};
use flightchat_core::config::ChatConfig;
use flightchat_core::{
    Annotation, ArtifactKind, Attachment, FlightOffer, FlightQuery, Location, Message,
    ProviderKind, RequestedModalities,
};
use flightchat_providers::{
    bounded, resolve_language, ImageProvider, ProviderSet, ProviderTimeouts, SummaryRequest,
    TextGenProvider, TranslationProvider,
};

use crate::error::ChatError;
use crate::types::SearchOutcome;
use crate::voice::VoiceInterface;

/// Reply used when chit-chat generation fails.
const CHIT_CHAT_FALLBACK: &str = "I'm your flight assistant. Tell me where and when you'd like to fly, for example \"Find me a cheap flight from Istanbul to London next Friday\".";

/// Plain-text listing of offers, used when text generation is unavailable.
pub fn templated_summary(query: &FlightQuery, offers: &[FlightOffer]) -> String {
    let date = query.departure_date.format("%A, %d %B %Y");
    if offers.is_empty() {
        return format!(
            "No flights found from {} to {} on {}.",
            query.origin, query.destination, date
        );
    }
    let mut text = format!(
        "Top {} flights from {} to {} on {}:",
        offers.len(),
        query.origin,
        query.destination,
        date
    );
    for offer in offers {
        text.push('\n');
        text.push_str(&offer.summary_line());
    }
    text
}

/// Composes assistant replies.
pub struct ResponseComposer {
    text: Arc<dyn TextGenProvider>,
    translation: Arc<dyn TranslationProvider>,
    image: Arc<dyn ImageProvider>,
    voice: Arc<VoiceInterface>,
    cache: Arc<ArtifactCache>,
    timeouts: ProviderTimeouts,
    max_offers: usize,
    image_style_prompt: String,
}

impl ResponseComposer {
    pub fn new(
        providers: &ProviderSet,
        cache: Arc<ArtifactCache>,
        voice: Arc<VoiceInterface>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            text: providers.text.clone(),
            translation: providers.translation.clone(),
            image: providers.image.clone(),
            voice,
            cache,
            timeouts: providers.timeouts,
            max_offers: config.max_offers_in_summary.max(1),
            image_style_prompt: config.image_style_prompt.clone(),
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Reply for a searched flight query.
    pub async fn compose_offers(
        &self,
        user_text: &str,
        query: &FlightQuery,
        outcome: SearchOutcome,
        modalities: &RequestedModalities,
    ) -> Message {
        let mut annotations = Vec::new();
        if outcome.is_mock() {
            annotations.push(Annotation::MockData);
        }

        let top = &outcome.offers[..outcome.offers.len().min(self.max_offers)];
        let request = SummaryRequest::Offers {
            user_text,
            query,
            offers: top,
        };
        let summary = match self.generate(request).await {
            Some(text) => text,
            None => {
                annotations.push(Annotation::SummaryFallback);
                templated_summary(query, top)
            }
        };

        let destination = (!outcome.offers.is_empty()).then_some(&query.destination);
        let mut message = self
            .finish(summary, annotations, destination, modalities)
            .await;
        message.offers = outcome.offers;
        message
    }

    /// Reply for a non-flight utterance, using recent history as context.
    pub async fn compose_chit_chat(
        &self,
        user_text: &str,
        history: &[Message],
        modalities: &RequestedModalities,
    ) -> Message {
        let mut annotations = Vec::new();
        let request = SummaryRequest::ChitChat { user_text, history };
        let reply = match self.generate(request).await {
            Some(text) => text,
            None => {
                annotations.push(Annotation::SummaryFallback);
                CHIT_CHAT_FALLBACK.to_string()
            }
        };
        self.finish(reply, annotations, None, modalities).await
    }

    /// Follow-up question for an incomplete or invalid request.
    ///
    /// Translation and speech still apply; images never do.
    pub async fn compose_clarification(
        &self,
        question: &str,
        modalities: &RequestedModalities,
    ) -> Message {
        self.finish(
            question.to_string(),
            vec![Annotation::NeedsClarification],
            None,
            modalities,
        )
        .await
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Generated text, or `None` when the provider fails or returns nothing.
    async fn generate(&self, request: SummaryRequest<'_>) -> Option<String> {
        match bounded(
            ProviderKind::TextGeneration,
            self.timeouts.text,
            self.text.summarize(request),
        )
        .await
        {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(provider = self.text.name(), "Text generation returned nothing");
                None
            }
            Err(failure) => {
                tracing::warn!(
                    provider = self.text.name(),
                    kind = %failure.kind,
                    error = %failure,
                    "Text generation failed, using template"
                );
                None
            }
        }
    }

    /// Apply the auxiliary modalities concurrently and assemble the message.
    async fn finish(
        &self,
        text: String,
        mut annotations: Vec<Annotation>,
        destination: Option<&Location>,
        modalities: &RequestedModalities,
    ) -> Message {
        let spoken = async move {
            let (text, translation) = match modalities.translate_to.as_deref() {
                Some(target) if !target.trim().is_empty() => self.translate(text, target).await,
                _ => (text, None),
            };
            let audio = if modalities.voice {
                Some(self.audio(&text).await)
            } else {
                None
            };
            (text, translation, audio)
        };
        let image = async move {
            match destination {
                Some(location) if modalities.image => Some(self.image(location).await),
                _ => None,
            }
        };
        let ((text, translation, audio), image) = tokio::join!(spoken, image);

        let mut message = Message::assistant(text);
        annotations.extend(translation);
        match image {
            Some(Some(attachment)) => message.attachments.push(attachment),
            Some(None) => annotations.push(Annotation::ImageUnavailable),
            None => {}
        }
        match audio {
            Some(Some(attachment)) => message.attachments.push(attachment),
            Some(None) => annotations.push(Annotation::AudioUnavailable),
            None => {}
        }
        message.annotations = annotations;
        message
    }

    /// Translate `text`, returning the original text on failure.
    async fn translate(&self, text: String, target: &str) -> (String, Option<Annotation>) {
        let language = resolve_language(target);
        match bounded(
            ProviderKind::Translation,
            self.timeouts.translation,
            self.translation.translate(&text, &language),
        )
        .await
        {
            Ok(translated) if !translated.trim().is_empty() => (
                translated.trim().to_string(),
                Some(Annotation::Translated { language }),
            ),
            Ok(_) => {
                tracing::warn!(
                    provider = self.translation.name(),
                    language = %language,
                    "Translation returned nothing"
                );
                (text, Some(Annotation::TranslationUnavailable { language }))
            }
            Err(failure) => {
                tracing::warn!(
                    provider = self.translation.name(),
                    language = %language,
                    kind = %failure.kind,
                    error = %failure,
                    "Translation failed, keeping original text"
                );
                (text, Some(Annotation::TranslationUnavailable { language }))
            }
        }
    }

    /// Destination image, from cache or freshly generated.
    async fn image(&self, destination: &Location) -> Option<Attachment> {
        match self.cached_image(destination).await {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                tracing::warn!(
                    provider = self.image.name(),
                    city = %destination.city,
                    error = %e,
                    "Destination image unavailable"
                );
                None
            }
        }
    }

    async fn cached_image(&self, destination: &Location) -> Result<Attachment, ChatError> {
        let key = CacheKey::derive(
            ArtifactKind::Image,
            &[destination.city.as_str(), self.image_style_prompt.as_str()],
        );
        let entry = match self.cache.lookup(&key)? {
            Some(entry) => entry,
            None => {
                let prompt = self.image_style_prompt.replace("{city}", &destination.city);
                let generated = bounded(
                    ProviderKind::Image,
                    self.timeouts.image,
                    self.image.generate(&prompt),
                )
                .await
                .map_err(|failure| ChatError::Artifact(failure.to_string()))?;
                self.cache
                    .insert(key, &generated.bytes, &generated.mime_type)
                    .await?
            }
        };
        Ok(Attachment {
            kind: ArtifactKind::Image,
            handle: entry.handle,
            mime_type: entry.mime_type,
        })
    }

    async fn audio(&self, text: &str) -> Option<Attachment> {
        match self.voice.speak(text, None).await {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                tracing::warn!(error = %e, "Reply audio unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use flightchat_cache::MemoryArtifactStore;
    use flightchat_core::{Money, ProviderFailure, ProviderStatus};
    use flightchat_providers::{GeneratedArtifact, MockTranslator, SpeechProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn query() -> FlightQuery {
        FlightQuery {
            origin: Location::new("IST", "Istanbul"),
            destination: Location::new("LON", "London"),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 23).unwrap(),
            return_date: None,
            passengers: 1,
            currency: "EUR".to_string(),
        }
    }

    fn offer(price: i64) -> FlightOffer {
        let departure = NaiveDate::from_ymd_opt(2026, 10, 23)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        FlightOffer {
            carrier: "TK".to_string(),
            origin: "IST".to_string(),
            destination: "LHR".to_string(),
            price: Money::new(price, "EUR"),
            departure,
            arrival: departure + chrono::Duration::hours(4),
            stops: 0,
            booking_mock: true,
        }
    }

    fn outcome(n: usize) -> SearchOutcome {
        SearchOutcome {
            offers: (0..n).map(|i| offer(10000 + i as i64 * 100)).collect(),
            status: ProviderStatus::Unavailable,
        }
    }

    fn composer(providers: ProviderSet) -> ResponseComposer {
        let cache = Arc::new(ArtifactCache::new(
            Arc::new(MemoryArtifactStore::new()),
            16,
            None,
        ));
        let voice = Arc::new(VoiceInterface::from_providers(&providers, cache.clone(), "alloy"));
        ResponseComposer::new(&providers, cache, voice, &ChatConfig::default())
    }

    fn text_only() -> RequestedModalities {
        RequestedModalities {
            translate_to: None,
            image: false,
            voice: false,
        }
    }

    struct FailingText;

    #[async_trait]
    impl TextGenProvider for FailingText {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn is_live(&self) -> bool {
            true
        }
        async fn summarize(&self, _: SummaryRequest<'_>) -> Result<String, ProviderFailure> {
            Err(ProviderFailure::unavailable(ProviderKind::TextGeneration, "503"))
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl TranslationProvider for FailingTranslator {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn is_live(&self) -> bool {
            true
        }
        async fn translate(&self, _: &str, _: &str) -> Result<String, ProviderFailure> {
            Err(ProviderFailure::timeout(ProviderKind::Translation, "slow"))
        }
    }

    #[derive(Default)]
    struct CountingImage {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ImageProvider for CountingImage {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn is_live(&self) -> bool {
            true
        }
        async fn generate(&self, prompt: &str) -> Result<GeneratedArtifact, ProviderFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderFailure::unavailable(ProviderKind::Image, "quota"));
            }
            Ok(GeneratedArtifact {
                bytes: prompt.as_bytes().to_vec(),
                mime_type: "image/png".to_string(),
            })
        }
    }

    struct FailingSpeech;

    #[async_trait]
    impl SpeechProvider for FailingSpeech {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn is_live(&self) -> bool {
            true
        }
        async fn transcribe(&self, _: &[u8], _: &str) -> Result<String, ProviderFailure> {
            Err(ProviderFailure::unavailable(ProviderKind::Speech, "503"))
        }
        async fn synthesize(&self, _: &str, _: &str) -> Result<GeneratedArtifact, ProviderFailure> {
            Err(ProviderFailure::timeout(ProviderKind::Speech, "slow"))
        }
    }

    // ---- summary ----

    #[tokio::test]
    async fn test_summary_caps_offers_but_keeps_all() {
        let c = composer(ProviderSet::mock());
        let msg = c.compose_offers("cheap flights", &query(), outcome(5), &text_only()).await;
        assert_eq!(msg.offers.len(), 5);
        assert_eq!(msg.content.lines().filter(|l| l.starts_with("- ")).count(), 3);
        assert!(msg.has_annotation(&Annotation::MockData));
        assert!(!msg.has_annotation(&Annotation::SummaryFallback));
    }

    #[tokio::test]
    async fn test_summary_falls_back_to_template() {
        let c = composer(ProviderSet::mock().with_text(Arc::new(FailingText)));
        let msg = c.compose_offers("cheap flights", &query(), outcome(4), &text_only()).await;
        assert!(msg.has_annotation(&Annotation::SummaryFallback));
        assert!(msg.content.starts_with("Top 3 flights from Istanbul (IST) to London (LON)"));
        assert!(msg.content.contains("100.00 EUR"));
    }

    #[test]
    fn test_templated_summary_without_offers() {
        let text = templated_summary(&query(), &[]);
        assert_eq!(
            text,
            "No flights found from Istanbul (IST) to London (LON) on Friday, 23 October 2026."
        );
    }

    #[tokio::test]
    async fn test_chit_chat_fallback_is_never_empty() {
        let c = composer(ProviderSet::mock().with_text(Arc::new(FailingText)));
        let msg = c.compose_chit_chat("hello", &[], &text_only()).await;
        assert_eq!(msg.content, CHIT_CHAT_FALLBACK);
        assert!(msg.offers.is_empty());
        assert!(msg.attachments.is_empty());
    }

    // ---- translation ----

    #[tokio::test]
    async fn test_translation_applied() {
        let c = composer(ProviderSet::mock().with_translation(Arc::new(MockTranslator::new())));
        let modalities = RequestedModalities {
            translate_to: Some("de".to_string()),
            ..text_only()
        };
        let msg = c.compose_clarification("Where to?", &modalities).await;
        assert_eq!(msg.content, "[German] Where to?");
        assert!(msg.has_annotation(&Annotation::Translated {
            language: "German".to_string()
        }));
        assert!(msg.has_annotation(&Annotation::NeedsClarification));
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_original() {
        let c = composer(ProviderSet::mock().with_translation(Arc::new(FailingTranslator)));
        let modalities = RequestedModalities {
            translate_to: Some("German".to_string()),
            ..text_only()
        };
        let msg = c.compose_offers("flights", &query(), outcome(2), &modalities).await;
        assert!(msg.content.contains("Istanbul"));
        assert!(!msg.content.is_empty());
        assert!(msg.has_annotation(&Annotation::TranslationUnavailable {
            language: "German".to_string()
        }));
    }

    // ---- image ----

    #[tokio::test]
    async fn test_image_is_cached_per_destination() {
        let image = Arc::new(CountingImage::default());
        let c = composer(ProviderSet::mock().with_image(image.clone()));
        let modalities = RequestedModalities::default();

        let first = c.compose_offers("a", &query(), outcome(1), &modalities).await;
        let second = c.compose_offers("b", &query(), outcome(1), &modalities).await;
        let a = first.attachment(ArtifactKind::Image).unwrap();
        let b = second.attachment(ArtifactKind::Image).unwrap();
        assert_eq!(a.handle, b.handle);
        assert_eq!(a.mime_type, "image/png");
        assert_eq!(image.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_image_prompt_names_city() {
        let c = composer(ProviderSet::mock());
        let msg = c
            .compose_offers("a", &query(), outcome(1), &RequestedModalities::default())
            .await;
        let handle = &msg.attachment(ArtifactKind::Image).unwrap().handle;
        let (bytes, mime) = c.cache.fetch(handle).await.unwrap();
        assert_eq!(mime, "image/svg+xml");
        assert!(String::from_utf8(bytes).unwrap().contains("London"));
    }

    #[tokio::test]
    async fn test_image_failure_is_omitted() {
        let image = Arc::new(CountingImage {
            fail: true,
            ..Default::default()
        });
        let c = composer(ProviderSet::mock().with_image(image));
        let msg = c
            .compose_offers("a", &query(), outcome(2), &RequestedModalities::default())
            .await;
        assert!(msg.attachments.is_empty());
        assert!(msg.has_annotation(&Annotation::ImageUnavailable));
        assert_eq!(msg.offers.len(), 2);
    }

    #[tokio::test]
    async fn test_no_image_without_offers() {
        let image = Arc::new(CountingImage::default());
        let c = composer(ProviderSet::mock().with_image(image.clone()));
        let msg = c
            .compose_offers("a", &query(), outcome(0), &RequestedModalities::default())
            .await;
        assert!(msg.attachments.is_empty());
        assert!(!msg.has_annotation(&Annotation::ImageUnavailable));
        assert_eq!(image.calls.load(Ordering::SeqCst), 0);
    }

    // ---- audio ----

    #[tokio::test]
    async fn test_audio_follows_translated_text() {
        let c = composer(ProviderSet::mock());
        let modalities = RequestedModalities {
            translate_to: Some("fr".to_string()),
            image: false,
            voice: true,
        };
        let msg = c.compose_chit_chat("hi", &[], &modalities).await;
        let audio = msg.attachment(ArtifactKind::Audio).unwrap();
        let expected = c.voice.speak(&msg.content, None).await.unwrap();
        assert_eq!(audio.handle, expected.handle);
        assert!(msg.content.starts_with("[French] "));
    }

    #[tokio::test]
    async fn test_audio_failure_is_omitted() {
        let c = composer(ProviderSet::mock().with_speech(Arc::new(FailingSpeech)));
        let modalities = RequestedModalities {
            translate_to: None,
            image: true,
            voice: true,
        };
        let msg = c.compose_offers("flights", &query(), outcome(2), &modalities).await;
        assert!(msg.attachment(ArtifactKind::Audio).is_none());
        assert!(msg.attachment(ArtifactKind::Image).is_some());
        assert!(msg.has_annotation(&Annotation::AudioUnavailable));
        assert!(msg.content.contains("Istanbul"));
        assert_eq!(msg.offers.len(), 2);
    }
}
