//! Flight search adapters.
//!
//! - `AmadeusFlightProvider` calls the Amadeus Flight Offers Search API with
//!   an OAuth client-credentials token cached until shortly before expiry.
//! - `MockFlightProvider` derives offers from a SHA-256 digest of the route
//!   and date, so identical queries always produce identical offers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use flightchat_core::config::AmadeusConfig;
use flightchat_core::{FlightOffer, FlightQuery, Money, ProviderFailure, ProviderKind};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::http::{ensure_success, read_json, request_failure};
use crate::FlightProvider;

const PROVIDER: ProviderKind = ProviderKind::Flight;

/// Refresh the token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

// =============================================================================
// Amadeus
// =============================================================================

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Live flight search over the Amadeus self-service API.
pub struct AmadeusFlightProvider {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    max_results: u32,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusFlightProvider {
    /// Build from config. Returns `None` when credentials are missing.
    pub fn from_config(client: reqwest::Client, config: &AmadeusConfig) -> Option<Self> {
        let client_id = config.api_key.clone()?;
        let client_secret = config.api_secret.clone()?;
        Some(Self {
            client,
            base_url: base_url_for(&config.environment).to_string(),
            client_id,
            client_secret,
            max_results: config.max_results,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ProviderFailure> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let body: TokenResponse = read_json(PROVIDER, response).await?;

        tracing::debug!(expires_in = body.expires_in, "Amadeus token refreshed");
        let token = AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

#[async_trait]
impl FlightProvider for AmadeusFlightProvider {
    fn name(&self) -> &'static str {
        "amadeus"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, ProviderFailure> {
        let token = self.access_token().await?;

        let mut params: Vec<(&str, String)> = vec![
            ("originLocationCode", query.origin.code.clone()),
            ("destinationLocationCode", query.destination.code.clone()),
            ("departureDate", query.departure_date.format("%Y-%m-%d").to_string()),
            ("adults", query.passengers.to_string()),
            ("currencyCode", query.currency.clone()),
            ("max", self.max_results.to_string()),
        ];
        if let Some(return_date) = query.return_date {
            if return_date != query.departure_date {
                params.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
            }
        }

        let response = self
            .client
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| request_failure(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let body: OffersResponse = read_json(PROVIDER, response).await?;

        let offers = normalize_offers(body, &query.currency);
        tracing::info!(
            origin = %query.origin.code,
            destination = %query.destination.code,
            count = offers.len(),
            "Amadeus search completed"
        );
        Ok(offers)
    }
}

fn base_url_for(environment: &str) -> &'static str {
    if environment.eq_ignore_ascii_case("prod") {
        "https://api.amadeus.com"
    } else {
        "https://test.api.amadeus.com"
    }
}

fn default_expires_in() -> u64 {
    1800
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
struct RawOffer {
    #[serde(default)]
    itineraries: Vec<RawItinerary>,
    price: RawPrice,
}

#[derive(Debug, Deserialize)]
struct RawItinerary {
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSegment {
    departure: RawEndpoint,
    arrival: RawEndpoint,
    carrier_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEndpoint {
    iata_code: String,
    at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrice {
    grand_total: String,
    #[serde(default)]
    currency: Option<String>,
}

/// Convert raw Amadeus offers into [`FlightOffer`]s.
///
/// Only the outbound itinerary is described. Offers with no segments or
/// unparseable timestamps/prices are skipped.
fn normalize_offers(body: OffersResponse, currency: &str) -> Vec<FlightOffer> {
    body.data
        .into_iter()
        .filter_map(|offer| {
            let outbound = offer.itineraries.first()?;
            let first = outbound.segments.first()?;
            let last = outbound.segments.last()?;
            let departure = parse_timestamp(&first.departure.at)?;
            let arrival = parse_timestamp(&last.arrival.at)?;
            let currency = offer.price.currency.as_deref().unwrap_or(currency);
            let price = match Money::parse_decimal(&offer.price.grand_total, currency) {
                Some(p) => p,
                None => {
                    tracing::warn!(
                        total = %offer.price.grand_total,
                        "Skipping offer with bad price"
                    );
                    return None;
                }
            };
            Some(FlightOffer {
                carrier: first.carrier_code.clone(),
                origin: first.departure.iata_code.clone(),
                destination: last.arrival.iata_code.clone(),
                price,
                departure,
                arrival,
                stops: (outbound.segments.len() - 1) as u32,
                booking_mock: false,
            })
        })
        .collect()
}

fn parse_timestamp(at: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M"))
        .ok()
}

// =============================================================================
// Mock
// =============================================================================

/// Carriers used for synthetic offers.
const MOCK_CARRIERS: &[&str] = &["TK", "PC", "LH", "BA", "AF", "KL", "LX", "OS", "W6", "U2"];

/// Deterministic synthetic flight offers.
///
/// Seeded by (origin, destination, departure date): the same triple always
/// yields byte-identical offers. Offers are tagged `booking_mock = true`.
#[derive(Debug, Clone, Default)]
pub struct MockFlightProvider;

impl MockFlightProvider {
    pub fn new() -> Self {
        Self
    }

    /// Generate offers without the async trait machinery.
    pub fn generate(&self, query: &FlightQuery) -> Vec<FlightOffer> {
        let seed = format!(
            "{}|{}|{}",
            query.origin.code.to_uppercase(),
            query.destination.code.to_uppercase(),
            query.departure_date.format("%Y-%m-%d")
        );
        let route = Sha256::digest(seed.as_bytes());

        let count = 3 + usize::from(route[0] % 4);
        // Shared block time for the route, 70..=329 minutes.
        let base_minutes = 70 + i64::from(u16::from_be_bytes([route[1], route[2]]) % 260);

        (0..count)
            .map(|i| {
                let mut hasher = Sha256::new();
                hasher.update(seed.as_bytes());
                hasher.update([i as u8]);
                let h = hasher.finalize();

                let carrier = MOCK_CARRIERS[usize::from(h[0]) % MOCK_CARRIERS.len()];
                let stops = match h[3] % 10 {
                    0..=5 => 0,
                    6..=8 => 1,
                    _ => 2,
                };
                let hour = 6 + u32::from(h[1] % 16);
                let minute = u32::from(h[2] % 4) * 15;
                let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
                let departure = query.departure_date.and_time(time);
                let duration = base_minutes + i64::from(stops) * 75 + i64::from(h[4] % 30);
                let arrival = departure + chrono::Duration::minutes(duration);

                let euros = 39 + i64::from(u16::from_be_bytes([h[5], h[6]]) % 420);
                let minor = (euros * 100 + 99) * i64::from(query.passengers.max(1));

                FlightOffer {
                    carrier: carrier.to_string(),
                    origin: query.origin.code.clone(),
                    destination: query.destination.code.clone(),
                    price: Money::new(minor, query.currency.clone()),
                    departure,
                    arrival,
                    stops,
                    booking_mock: true,
                }
            })
            .collect()
    }
}

#[async_trait]
impl FlightProvider for MockFlightProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn search(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, ProviderFailure> {
        let offers = self.generate(query);
        tracing::debug!(count = offers.len(), "Mock flight offers generated");
        Ok(offers)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flightchat_core::Location;

    fn query(origin: &str, destination: &str, day: u32) -> FlightQuery {
        FlightQuery {
            origin: Location::new(origin, origin),
            destination: Location::new(destination, destination),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            return_date: None,
            passengers: 1,
            currency: "EUR".to_string(),
        }
    }

    // ---- Mock generator ----

    #[test]
    fn test_mock_is_deterministic() {
        let mock = MockFlightProvider::new();
        let a = serde_json::to_vec(&mock.generate(&query("IST", "LON", 23))).unwrap();
        let b = serde_json::to_vec(&mock.generate(&query("IST", "LON", 23))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mock_deterministic_across_instances_and_many_routes() {
        for (o, d) in [("IST", "LON"), ("BER", "PAR"), ("NYC", "ESB"), ("ADB", "BER")] {
            for day in 20..28 {
                let q = query(o, d, day);
                assert_eq!(
                    MockFlightProvider::new().generate(&q),
                    MockFlightProvider.generate(&q)
                );
            }
        }
    }

    #[test]
    fn test_mock_varies_by_date() {
        let mock = MockFlightProvider::new();
        assert_ne!(
            mock.generate(&query("IST", "LON", 23)),
            mock.generate(&query("IST", "LON", 24))
        );
    }

    #[test]
    fn test_mock_offer_shape() {
        let offers = MockFlightProvider::new().generate(&query("IST", "LON", 23));
        assert!((3..=6).contains(&offers.len()));
        for offer in &offers {
            assert!(offer.booking_mock);
            assert_eq!(offer.origin, "IST");
            assert_eq!(offer.destination, "LON");
            assert_eq!(offer.price.currency, "EUR");
            assert!(offer.price.minor_units > 0);
            assert!(offer.arrival > offer.departure);
            assert!(offer.stops <= 2);
            assert_eq!(offer.departure.date(), NaiveDate::from_ymd_opt(2026, 10, 23).unwrap());
        }
    }

    #[test]
    fn test_mock_price_scales_with_passengers() {
        let mock = MockFlightProvider::new();
        let single = mock.generate(&query("IST", "LON", 23));
        let mut q = query("IST", "LON", 23);
        q.passengers = 2;
        let double = mock.generate(&q);
        assert_eq!(single[0].price.minor_units * 2, double[0].price.minor_units);
    }

    #[tokio::test]
    async fn test_mock_trait_search() {
        let mock = MockFlightProvider::new();
        assert!(!mock.is_live());
        let offers = mock.search(&query("IST", "LON", 23)).await.unwrap();
        assert!(!offers.is_empty());
    }

    // ---- Amadeus normalization ----

    const SAMPLE: &str = r#"{
      "data": [
        {
          "itineraries": [{
            "segments": [
              {"departure": {"iataCode": "IST", "at": "2026-10-23T07:30:00"},
               "arrival": {"iataCode": "MUC", "at": "2026-10-23T09:10:00"},
               "carrierCode": "LH"},
              {"departure": {"iataCode": "MUC", "at": "2026-10-23T10:30:00"},
               "arrival": {"iataCode": "LHR", "at": "2026-10-23T11:40:00"},
               "carrierCode": "LH"}
            ]
          }],
          "price": {"grandTotal": "231.40", "currency": "EUR"}
        },
        {
          "itineraries": [],
          "price": {"grandTotal": "10.00", "currency": "EUR"}
        },
        {
          "itineraries": [{
            "segments": [
              {"departure": {"iataCode": "SAW", "at": "2026-10-23T13:00:00"},
               "arrival": {"iataCode": "STN", "at": "2026-10-23T15:55:00"},
               "carrierCode": "PC"}
            ]
          }],
          "price": {"grandTotal": "99.99"}
        }
      ]
    }"#;

    #[test]
    fn test_normalize_offers() {
        let body: OffersResponse = serde_json::from_str(SAMPLE).unwrap();
        let offers = normalize_offers(body, "EUR");
        assert_eq!(offers.len(), 2);

        let lh = &offers[0];
        assert_eq!(lh.carrier, "LH");
        assert_eq!(lh.origin, "IST");
        assert_eq!(lh.destination, "LHR");
        assert_eq!(lh.stops, 1);
        assert_eq!(lh.price, Money::new(23140, "EUR"));
        assert!(!lh.booking_mock);
        assert_eq!(lh.arrival.format("%H:%M").to_string(), "11:40");

        let pc = &offers[1];
        assert_eq!(pc.stops, 0);
        assert_eq!(pc.price.currency, "EUR");
    }

    #[test]
    fn test_normalize_empty_response() {
        let body: OffersResponse = serde_json::from_str("{}").unwrap();
        assert!(normalize_offers(body, "EUR").is_empty());
    }

    #[test]
    fn test_base_url_for_environment() {
        assert_eq!(base_url_for("prod"), "https://api.amadeus.com");
        assert_eq!(base_url_for("test"), "https://test.api.amadeus.com");
        assert_eq!(base_url_for("anything"), "https://test.api.amadeus.com");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let client = reqwest::Client::new();
        let mut config = AmadeusConfig::default();
        assert!(AmadeusFlightProvider::from_config(client.clone(), &config).is_none());
        config.api_key = Some("k".to_string());
        assert!(AmadeusFlightProvider::from_config(client.clone(), &config).is_none());
        config.api_secret = Some("s".to_string());
        assert!(AmadeusFlightProvider::from_config(client, &config).is_some());
    }
}
