//! Construction-time selection of provider implementations.

use std::sync::Arc;
use std::time::Duration;

use flightchat_core::config::{ProvidersConfig, TimeoutConfig};
use flightchat_core::{FlightChatError, ProviderKind};
use serde::Serialize;

use crate::{
    AmadeusFlightProvider, AnthropicTranslator, FlightProvider, ImageProvider, MockFlightProvider,
    MockImageProvider, MockSpeechProvider, MockTextProvider, MockTranslator, OpenAiImageProvider,
    OpenAiSpeechProvider, OpenAiTextProvider, SpeechProvider, TextGenProvider,
    TranslationProvider,
};

/// Upper time bound per capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub flight: Duration,
    pub text: Duration,
    pub translation: Duration,
    pub image: Duration,
    pub speech: Duration,
}

impl ProviderTimeouts {
    pub fn for_kind(&self, kind: ProviderKind) -> Duration {
        match kind {
            ProviderKind::Flight => self.flight,
            ProviderKind::TextGeneration => self.text,
            ProviderKind::Translation => self.translation,
            ProviderKind::Image => self.image,
            ProviderKind::Speech => self.speech,
        }
    }
}

impl From<&TimeoutConfig> for ProviderTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            flight: Duration::from_secs(config.flight_secs),
            text: Duration::from_secs(config.text_secs),
            translation: Duration::from_secs(config.translation_secs),
            image: Duration::from_secs(config.image_secs),
            speech: Duration::from_secs(config.speech_secs),
        }
    }
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Which implementation backs each capability, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderModes {
    pub flight: &'static str,
    pub text: &'static str,
    pub translation: &'static str,
    pub image: &'static str,
    pub speech: &'static str,
}

/// The provider bindings used by the engine.
///
/// Each capability is bound once. The flight capability additionally keeps a
/// mock generator so a failing live search can degrade to synthetic offers.
#[derive(Clone)]
pub struct ProviderSet {
    pub flight: Arc<dyn FlightProvider>,
    pub flight_fallback: Arc<MockFlightProvider>,
    pub text: Arc<dyn TextGenProvider>,
    pub translation: Arc<dyn TranslationProvider>,
    pub image: Arc<dyn ImageProvider>,
    pub speech: Arc<dyn SpeechProvider>,
    pub timeouts: ProviderTimeouts,
}

impl ProviderSet {
    /// Bind live implementations wherever credentials are present, mocks elsewhere.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, FlightChatError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flightchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlightChatError::Config(format!("HTTP client: {}", e)))?;

        let flight: Arc<dyn FlightProvider> =
            match AmadeusFlightProvider::from_config(client.clone(), &config.amadeus) {
                Some(live) => Arc::new(live),
                None => Arc::new(MockFlightProvider::new()),
            };
        let text: Arc<dyn TextGenProvider> =
            match OpenAiTextProvider::from_config(client.clone(), &config.openai) {
                Some(live) => Arc::new(live),
                None => Arc::new(MockTextProvider::new()),
            };
        let translation: Arc<dyn TranslationProvider> =
            match AnthropicTranslator::from_config(client.clone(), &config.anthropic) {
                Some(live) => Arc::new(live),
                None => Arc::new(MockTranslator::new()),
            };
        let image: Arc<dyn ImageProvider> =
            match OpenAiImageProvider::from_config(client.clone(), &config.openai) {
                Some(live) => Arc::new(live),
                None => Arc::new(MockImageProvider::new()),
            };
        let speech: Arc<dyn SpeechProvider> =
            match OpenAiSpeechProvider::from_config(client, &config.openai) {
                Some(live) => Arc::new(live),
                None => Arc::new(MockSpeechProvider::new()),
            };

        let set = Self {
            flight,
            flight_fallback: Arc::new(MockFlightProvider::new()),
            text,
            translation,
            image,
            speech,
            timeouts: ProviderTimeouts::from(&config.timeouts),
        };
        let modes = set.modes();
        tracing::info!(
            flight = modes.flight,
            text = modes.text,
            translation = modes.translation,
            image = modes.image,
            speech = modes.speech,
            "Providers bound"
        );
        Ok(set)
    }

    /// All capabilities backed by deterministic mocks.
    pub fn mock() -> Self {
        Self {
            flight: Arc::new(MockFlightProvider::new()),
            flight_fallback: Arc::new(MockFlightProvider::new()),
            text: Arc::new(MockTextProvider::new()),
            translation: Arc::new(MockTranslator::new()),
            image: Arc::new(MockImageProvider::new()),
            speech: Arc::new(MockSpeechProvider::new()),
            timeouts: ProviderTimeouts::default(),
        }
    }

    pub fn with_flight(mut self, provider: Arc<dyn FlightProvider>) -> Self {
        self.flight = provider;
        self
    }

    pub fn with_text(mut self, provider: Arc<dyn TextGenProvider>) -> Self {
        self.text = provider;
        self
    }

    pub fn with_translation(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.translation = provider;
        self
    }

    pub fn with_image(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.image = provider;
        self
    }

    pub fn with_speech(mut self, provider: Arc<dyn SpeechProvider>) -> Self {
        self.speech = provider;
        self
    }

    pub fn with_timeouts(mut self, timeouts: ProviderTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn modes(&self) -> ProviderModes {
        fn mode(live: bool) -> &'static str {
            if live {
                "live"
            } else {
                "mock"
            }
        }
        ProviderModes {
            flight: mode(self.flight.is_live()),
            text: mode(self.text.is_live()),
            translation: mode(self.translation.is_live()),
            image: mode(self.image.is_live()),
            speech: mode(self.speech.is_live()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_credentials_is_all_mock() {
        let set = ProviderSet::from_config(&ProvidersConfig::default()).unwrap();
        let modes = set.modes();
        assert_eq!(modes.flight, "mock");
        assert_eq!(modes.text, "mock");
        assert_eq!(modes.translation, "mock");
        assert_eq!(modes.image, "mock");
        assert_eq!(modes.speech, "mock");
    }

    #[test]
    fn test_from_config_binds_live_where_keyed() {
        let mut config = ProvidersConfig::default();
        config.openai.api_key = Some("sk-test".to_string());
        config.amadeus.api_key = Some("id".to_string());
        config.amadeus.api_secret = Some("secret".to_string());
        let modes = ProviderSet::from_config(&config).unwrap().modes();
        assert_eq!(modes.flight, "live");
        assert_eq!(modes.text, "live");
        assert_eq!(modes.image, "live");
        assert_eq!(modes.speech, "live");
        assert_eq!(modes.translation, "mock");
    }

    #[test]
    fn test_amadeus_needs_both_halves() {
        let mut config = ProvidersConfig::default();
        config.amadeus.api_key = Some("id".to_string());
        let modes = ProviderSet::from_config(&config).unwrap().modes();
        assert_eq!(modes.flight, "mock");
    }

    #[test]
    fn test_timeouts_from_config() {
        let config = TimeoutConfig {
            flight_secs: 5,
            text_secs: 6,
            translation_secs: 7,
            image_secs: 8,
            speech_secs: 9,
        };
        let timeouts = ProviderTimeouts::from(&config);
        assert_eq!(timeouts.for_kind(ProviderKind::Flight), Duration::from_secs(5));
        assert_eq!(timeouts.for_kind(ProviderKind::Speech), Duration::from_secs(9));
    }
}
