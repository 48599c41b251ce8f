use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FlightChatError, Result};

/// Top-level configuration for flightchat.
///
/// Loaded once at startup from `~/.flightchat/config.toml` and passed by
/// reference into the provider constructors. Credentials may be overlaid from
/// the environment with [`FlightChatConfig::with_env_credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightChatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl FlightChatConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FlightChatConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| FlightChatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay credentials and model names from a key lookup.
    ///
    /// The app passes the process environment; tests pass a map. Empty
    /// values are ignored so a blank `.env` entry does not erase a key from
    /// the file.
    pub fn with_env_credentials<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let p = &mut self.providers;
        if let Some(v) = get("AMADEUS_API_KEY") {
            p.amadeus.api_key = Some(v);
        }
        if let Some(v) = get("AMADEUS_API_SECRET") {
            p.amadeus.api_secret = Some(v);
        }
        if let Some(v) = get("AMADEUS_ENV") {
            p.amadeus.environment = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            p.openai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            p.openai.chat_model = v;
        }
        if let Some(v) = get("IMAGE_MODEL") {
            p.openai.image_model = v;
        }
        if let Some(v) = get("TTS_MODEL") {
            p.openai.tts_model = v;
        }
        if let Some(v) = get("TTS_VOICE") {
            self.chat.default_voice = v;
        }
        if let Some(v) = get("ANTHROPIC_API_KEY") {
            p.anthropic.api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_MODEL") {
            p.anthropic.model = v;
        }
        self
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for generated artifacts.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port for the chat API.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.flightchat/data".to_string(),
            log_level: "info".to_string(),
            port: 7860,
        }
    }
}

/// Credentials and endpoints of the external providers.
///
/// A capability whose credentials are missing runs on its deterministic
/// mock implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub amadeus: AmadeusConfig,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
    pub timeouts: TimeoutConfig,
}

/// Amadeus flight offers API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmadeusConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// "test" or "prod".
    pub environment: String,
    /// Maximum offers requested per search.
    pub max_results: u32,
}

impl AmadeusConfig {
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            environment: "test".to_string(),
            max_results: 10,
        }
    }
}

/// OpenAI chat, image, and audio endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub transcription_model: String,
    pub tts_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            transcription_model: "whisper-1".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
        }
    }
}

/// Anthropic messages API, used for translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 800,
        }
    }
}

/// Per-call timeouts in seconds. A call exceeding its bound is a provider
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub flight_secs: u64,
    pub text_secs: u64,
    pub translation_secs: u64,
    pub image_secs: u64,
    pub speech_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            flight_secs: 30,
            text_secs: 30,
            translation_secs: 20,
            image_secs: 60,
            speech_secs: 30,
        }
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of offers summarized in a reply.
    pub max_offers_in_summary: usize,
    /// Maximum accepted user message length in characters.
    pub max_message_length: usize,
    /// Idle minutes before a session is evicted.
    pub session_timeout_minutes: u32,
    /// Recent messages passed as context to chit-chat replies.
    pub history_window: usize,
    /// Currency used when the user does not name one.
    pub default_currency: String,
    /// Prompt template for destination images; `{city}` is substituted.
    pub image_style_prompt: String,
    /// Voice name for speech synthesis.
    pub default_voice: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_offers_in_summary: 3,
            max_message_length: 2000,
            session_timeout_minutes: 30,
            history_window: 6,
            default_currency: "EUR".to_string(),
            image_style_prompt: "A high-quality 1024x1024 photorealistic wide cityscape of {city}, with iconic landmarks and golden-hour lighting.".to_string(),
            default_voice: "alloy".to_string(),
        }
    }
}

/// Artifact cache bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached artifacts before the oldest are evicted.
    pub max_entries: usize,
    /// Optional time-to-live in minutes.
    pub ttl_minutes: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            ttl_minutes: None,
        }
    }
}
