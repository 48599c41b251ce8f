//! Image generation adapters.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flightchat_core::config::OpenAiConfig;
use flightchat_core::{ProviderFailure, ProviderKind};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::http::{ensure_success, read_json, request_failure, trim_base};
use crate::{GeneratedArtifact, ImageProvider};

const PROVIDER: ProviderKind = ProviderKind::Image;

const IMAGE_SIZE: &str = "1024x1024";

// =============================================================================
// OpenAI
// =============================================================================

/// Live image generation over the OpenAI images API.
///
/// Accepts either a base64 payload or a URL in the response; URLs are
/// downloaded with the same client.
pub struct OpenAiImageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiImageProvider {
    /// Build from config. Returns `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &OpenAiConfig) -> Option<Self> {
        Some(Self {
            client,
            base_url: trim_base(&config.base_url),
            api_key: config.api_key.clone()?,
            model: config.image_model.clone(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedArtifact, ProviderFailure> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "size": IMAGE_SIZE,
            "n": 1,
            "response_format": "b64_json",
        });

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let parsed: ImagesResponse = read_json(PROVIDER, response).await?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderFailure::malformed(PROVIDER, "no image in response"))?;

        let bytes = if let Some(b64) = first.b64_json {
            BASE64
                .decode(b64.as_bytes())
                .map_err(|e| ProviderFailure::malformed(PROVIDER, e.to_string()))?
        } else if let Some(url) = first.url {
            self.download(&url).await?
        } else {
            return Err(ProviderFailure::malformed(PROVIDER, "no b64_json or url in response"));
        };

        tracing::info!(model = %self.model, bytes = bytes.len(), "Image generated");
        Ok(GeneratedArtifact {
            bytes,
            mime_type: "image/png".to_string(),
        })
    }
}

// =============================================================================
// Mock
// =============================================================================

/// Offline image generator producing a deterministic SVG placard.
#[derive(Debug, Clone, Default)]
pub struct MockImageProvider;

impl MockImageProvider {
    pub fn new() -> Self {
        Self
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedArtifact, ProviderFailure> {
        let digest = Sha256::digest(prompt.as_bytes());
        let caption: String = prompt.chars().take(80).collect();
        let svg = format!(
            concat!(
                r##"<svg xmlns="http://www.w3.org/2000/svg" width="1024" height="1024" viewBox="0 0 1024 1024">"##,
                r##"<rect width="1024" height="1024" fill="#{:02x}{:02x}{:02x}"/>"##,
                r##"<text x="512" y="512" font-family="sans-serif" font-size="28" fill="#ffffff" text-anchor="middle">{}</text>"##,
                "</svg>"
            ),
            digest[0] / 2,
            digest[1] / 2,
            digest[2] / 2,
            escape_xml(&caption)
        );
        Ok(GeneratedArtifact {
            bytes: svg.into_bytes(),
            mime_type: "image/svg+xml".to_string(),
        })
    }
}
