//! Shared helpers for the live HTTP adapters.

use flightchat_core::{ProviderFailure, ProviderKind};
use reqwest::Response;

/// Longest error body echoed into a failure detail.
const MAX_ERROR_BODY: usize = 300;

/// Map a transport error onto the provider failure taxonomy.
pub(crate) fn request_failure(provider: ProviderKind, err: reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::timeout(provider, err.to_string())
    } else if err.is_decode() {
        ProviderFailure::malformed(provider, err.to_string())
    } else {
        ProviderFailure::unavailable(provider, err.to_string())
    }
}

/// Turn a non-2xx response into an `Unavailable` failure.
pub(crate) async fn ensure_success(
    provider: ProviderKind,
    response: Response,
) -> Result<Response, ProviderFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(ProviderFailure::unavailable(
        provider,
        format!("HTTP {}: {}", status, body),
    ))
}

/// Decode a JSON body, classifying shape errors as malformed responses.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    provider: ProviderKind,
    response: Response,
) -> Result<T, ProviderFailure> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| request_failure(provider, e))?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderFailure::malformed(provider, e.to_string()))
}

/// Trim a configured base URL so paths can be appended with `/`.
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_base() {
        assert_eq!(trim_base("https://api.openai.com/v1/"), "https://api.openai.com/v1");
        assert_eq!(trim_base("https://api.openai.com/v1"), "https://api.openai.com/v1");
    }
}
