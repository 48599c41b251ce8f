//! Translation adapters and output-language names.

use async_trait::async_trait;
use flightchat_core::config::AnthropicConfig;
use flightchat_core::{ProviderFailure, ProviderKind};
use serde::Deserialize;
use serde_json::json;

use crate::http::{ensure_success, read_json, request_failure, trim_base};
use crate::TranslationProvider;

const PROVIDER: ProviderKind = ProviderKind::Translation;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Supported output languages as (ISO code, English name).
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("de", "German"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("tr", "Turkish"),
];

/// Canonical language name for a name or ISO code ("de" → "German").
///
/// Unknown inputs are returned trimmed, with the first letter capitalized,
/// so a translation provider can still try them.
pub fn resolve_language(input: &str) -> String {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();
    if let Some((_, name)) = LANGUAGES
        .iter()
        .find(|(code, name)| *code == lower || name.to_lowercase() == lower)
    {
        return (*name).to_string();
    }
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text into {}. Keep prices and times intact. Reply with the translation only.\n\n{}",
        target_language, text
    )
}

// =============================================================================
// Anthropic
// =============================================================================

/// Live translation over the Anthropic messages API.
pub struct AnthropicTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicTranslator {
    /// Build from config. Returns `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &AnthropicConfig) -> Option<Self> {
        Some(Self {
            client,
            base_url: trim_base(&config.base_url),
            api_key: config.api_key.clone()?,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl TranslationProvider for AnthropicTranslator {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, ProviderFailure> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": translation_prompt(text, target_language)}],
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let parsed: MessagesResponse = read_json(PROVIDER, response).await?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderFailure::malformed(PROVIDER, "no text block in response"))
    }
}

// =============================================================================
// Mock
// =============================================================================

/// Offline translator that tags the text with the target language.
#[derive(Debug, Clone, Default)]
pub struct MockTranslator;

impl MockTranslator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TranslationProvider for MockTranslator {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, ProviderFailure> {
        Ok(format!("[{}] {}", target_language, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_language_by_code() {
        assert_eq!(resolve_language("de"), "German");
        assert_eq!(resolve_language("FR"), "French");
        assert_eq!(resolve_language(" tr "), "Turkish");
    }

    #[test]
    fn test_resolve_language_by_name() {
        assert_eq!(resolve_language("german"), "German");
        assert_eq!(resolve_language("Italian"), "Italian");
    }

    #[test]
    fn test_resolve_language_unknown_passthrough() {
        assert_eq!(resolve_language("portuguese"), "Portuguese");
        assert_eq!(resolve_language(""), "");
    }

    #[test]
    fn test_translation_prompt_keeps_text() {
        let prompt = translation_prompt("TK at 99.00 EUR", "German");
        assert!(prompt.contains("into German"));
        assert!(prompt.ends_with("TK at 99.00 EUR"));
    }

    #[tokio::test]
    async fn test_mock_translator_tags_language() {
        let out = MockTranslator::new().translate("Hello", "German").await.unwrap();
        assert_eq!(out, "[German] Hello");
    }

    #[test]
    fn test_from_config_requires_key() {
        let client = reqwest::Client::new();
        let mut config = AnthropicConfig::default();
        assert!(AnthropicTranslator::from_config(client.clone(), &config).is_none());
        config.api_key = Some("k".to_string());
        assert!(AnthropicTranslator::from_config(client, &config).is_some());
    }
}
