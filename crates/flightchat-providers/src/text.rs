//! Text generation adapters.

use async_trait::async_trait;
use flightchat_core::config::OpenAiConfig;
use flightchat_core::{ProviderFailure, ProviderKind, Role};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{ensure_success, read_json, request_failure, trim_base};
use crate::{SummaryRequest, TextGenProvider};

const PROVIDER: ProviderKind = ProviderKind::TextGeneration;

const SYSTEM_PROMPT: &str = "You are a travel planning assistant. If the user asked for flights, \
summarize the options briefly, cheapest first, keeping prices, times and carriers exact. \
Otherwise answer briefly and offer to search flights.";

/// Build the chat-completions message list for a summary request.
pub(crate) fn build_messages(request: &SummaryRequest<'_>) -> Vec<Value> {
    let mut messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
    match request {
        SummaryRequest::Offers {
            user_text,
            query,
            offers,
        } => {
            messages.push(json!({"role": "user", "content": user_text}));
            let lines: Vec<String> = offers.iter().map(|o| o.summary_line()).collect();
            messages.push(json!({
                "role": "system",
                "content": format!(
                    "Flight summaries for {} → {} on {} ({} passenger(s)):\n{}",
                    query.origin,
                    query.destination,
                    query.departure_date.format("%Y-%m-%d"),
                    query.passengers,
                    lines.join("\n")
                ),
            }));
        }
        SummaryRequest::ChitChat { user_text, history } => {
            for message in history.iter() {
                let role = match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                messages.push(json!({"role": role, "content": message.content}));
            }
            messages.push(json!({"role": "user", "content": user_text}));
        }
    }
    messages
}

// =============================================================================
// OpenAI
// =============================================================================

/// Live text generation over the OpenAI chat-completions API.
pub struct OpenAiTextProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTextProvider {
    /// Build from config. Returns `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &OpenAiConfig) -> Option<Self> {
        Some(Self {
            client,
            base_url: trim_base(&config.base_url),
            api_key: config.api_key.clone()?,
            model: config.chat_model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenProvider for OpenAiTextProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, ProviderFailure> {
        let body = json!({
            "model": self.model,
            "messages": build_messages(&request),
            "temperature": 0.3,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let parsed: CompletionResponse = read_json(PROVIDER, response).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderFailure::malformed(PROVIDER, "no content in completion"))
    }
}

// =============================================================================
// Mock
// =============================================================================

const MOCK_CHIT_CHAT: &str = "I'm your flight assistant. Tell me where and when you'd like to fly, for example \"Find me a cheap flight from Istanbul to London next Friday\".";

/// Deterministic, offline reply generator.
#[derive(Debug, Clone, Default)]
pub struct MockTextProvider;

impl MockTextProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, ProviderFailure> {
        let text = match request {
            SummaryRequest::Offers { query, offers, .. } => match offers.first() {
                None => format!(
                    "I couldn't find any flights from {} to {} on {}.",
                    query.origin.city,
                    query.destination.city,
                    query.departure_date.format("%A, %d %B %Y")
                ),
                Some(best) => {
                    let lines: Vec<String> = offers.iter().map(|o| o.summary_line()).collect();
                    format!(
                        "Here are the best options from {} to {} on {}. The cheapest is {} at {}, departing at {}.\n{}",
                        query.origin.city,
                        query.destination.city,
                        query.departure_date.format("%A, %d %B %Y"),
                        best.carrier,
                        best.price,
                        best.departure.format("%H:%M"),
                        lines.join("\n")
                    )
                }
            },
            SummaryRequest::ChitChat { .. } => MOCK_CHIT_CHAT.to_string(),
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flightchat_core::{FlightOffer, FlightQuery, Location, Message, Money};

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
        let day = NaiveDate::from_ymd_opt(2026, 10, 23).unwrap();
        FlightOffer {
            carrier: "TK".to_string(),
            origin: "IST".to_string(),
            destination: "LHR".to_string(),
            price: Money::new(price, "EUR"),
            departure: day.and_hms_opt(8, 0, 0).unwrap(),
            arrival: day.and_hms_opt(10, 0, 0).unwrap(),
            stops: 0,
            booking_mock: true,
        }
    }

    #[test]
    fn test_build_messages_for_offers() {
        let q = query();
        let offers = vec![offer(10000), offer(12000)];
        let messages = build_messages(&SummaryRequest::Offers {
            user_text: "cheap flight to London",
            query: &q,
            offers: &offers,
        });
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "cheap flight to London");
        let summary = messages[2]["content"].as_str().unwrap();
        assert!(summary.contains("Istanbul (IST) → London (LON)"));
        assert!(summary.contains("100.00 EUR"));
        assert!(summary.contains("120.00 EUR"));
    }

    #[test]
    fn test_build_messages_for_chitchat_includes_history() {
        let history = vec![Message::user("hi"), Message::assistant("hello!")];
        let messages = build_messages(&SummaryRequest::ChitChat {
            user_text: "how are you",
            history: &history,
        });
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "how are you");
    }

    #[tokio::test]
    async fn test_mock_summarizes_cheapest() {
        let q = query();
        let offers = vec![offer(9999), offer(15000)];
        let text = MockTextProvider::new()
            .summarize(SummaryRequest::Offers {
                user_text: "x",
                query: &q,
                offers: &offers,
            })
            .await
            .unwrap();
        assert!(text.contains("Istanbul"));
        assert!(text.contains("London"));
        assert!(text.contains("99.99 EUR"));
    }

    #[tokio::test]
    async fn test_mock_no_offers() {
        let q = query();
        let text = MockTextProvider::new()
            .summarize(SummaryRequest::Offers {
                user_text: "x",
                query: &q,
                offers: &[],
            })
            .await
            .unwrap();
        assert!(text.contains("couldn't find"));
    }

    #[tokio::test]
    async fn test_mock_chitchat_not_empty() {
        let text = MockTextProvider::new()
            .summarize(SummaryRequest::ChitChat {
                user_text: "hello",
                history: &[],
            })
            .await
            .unwrap();
        assert!(!text.is_empty());
    }

    #[test]
    fn test_from_config_requires_key() {
        let client = reqwest::Client::new();
        let mut config = OpenAiConfig::default();
        assert!(OpenAiTextProvider::from_config(client.clone(), &config).is_none());
        config.api_key = Some("sk-test".to_string());
        let provider = OpenAiTextProvider::from_config(client, &config).unwrap();
        assert_eq!(provider.model, "gpt-4o-mini");
        assert!(provider.is_live());
    }
}
