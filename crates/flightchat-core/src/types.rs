//! Data model for conversations, flight queries, and offers.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum passengers a single search may request.
pub const MAX_PASSENGERS: u32 = 9;

// =============================================================================
// Providers
// =============================================================================

/// The external capabilities consumed through provider adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Flight,
    TextGeneration,
    Translation,
    Image,
    Speech,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Flight => "flight",
            ProviderKind::TextGeneration => "text generation",
            ProviderKind::Translation => "translation",
            ProviderKind::Image => "image",
            ProviderKind::Speech => "speech",
        };
        f.write_str(s)
    }
}

/// Availability of a provider, recomputed on every call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// The live provider answered.
    Available,
    /// A live provider is configured but failed; fallback data was used.
    Degraded,
    /// No live provider is configured; fallback data was used.
    Unavailable,
}

// =============================================================================
// Artifacts and messages
// =============================================================================

/// Kind of generated binary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Audio,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Image, ArtifactKind::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(ArtifactKind::Image),
            "audio" => Some(ArtifactKind::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to stored artifact bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated artifact attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: ArtifactKind,
    pub handle: ArtifactHandle,
    pub mime_type: String,
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Notes on how an assistant reply was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// Offers came from the deterministic fallback generator.
    MockData,
    /// The summary was templated because text generation failed.
    SummaryFallback,
    /// The reply needs more information from the user.
    NeedsClarification,
    Translated { language: String },
    TranslationUnavailable { language: String },
    ImageUnavailable,
    AudioUnavailable,
}

/// One conversation message. Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Ranked offers backing an assistant reply, for tabular rendering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offers: Vec<FlightOffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            attachments: Vec::new(),
            offers: Vec::new(),
            annotations: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn has_annotation(&self, annotation: &Annotation) -> bool {
        self.annotations.contains(annotation)
    }

    /// First attachment of the given kind, if any.
    pub fn attachment(&self, kind: ArtifactKind) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.kind == kind)
    }
}

// =============================================================================
// Slots and queries
// =============================================================================

/// A resolved airport or metropolitan area.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// IATA airport or city code.
    pub code: String,
    /// Human-readable city name.
    pub city: String,
}

impl Location {
    pub fn new(code: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            city: city.into(),
        }
    }

    /// Whether two locations are the same place (same code or same city).
    pub fn same_place(&self, other: &Location) -> bool {
        self.code.eq_ignore_ascii_case(&other.code) || self.city.eq_ignore_ascii_case(&other.city)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.city, self.code)
    }
}

/// Slots remembered across turns of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotMemory {
    pub origin: Option<Location>,
    pub destination: Option<Location>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub passengers: Option<u32>,
    pub currency: Option<String>,
    pub output_language: Option<String>,
    pub voice: bool,
}

impl SlotMemory {
    /// Whether any flight slot has been stated in this conversation.
    pub fn has_flight_context(&self) -> bool {
        self.origin.is_some() || self.destination.is_some() || self.departure_date.is_some()
    }
}

/// A complete, searchable flight query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightQuery {
    pub origin: Location,
    pub destination: Location,
    /// Serialized in canonical `YYYY-MM-DD` form.
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub passengers: u32,
    pub currency: String,
}

impl FlightQuery {
    /// Check the query invariants relative to `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if self.origin.same_place(&self.destination) {
            return Err(ValidationError::SameOriginAndDestination(
                self.destination.city.clone(),
            ));
        }
        if self.departure_date < today {
            return Err(ValidationError::DepartureInPast {
                date: self.departure_date,
            });
        }
        if let Some(return_date) = self.return_date {
            if return_date < self.departure_date {
                return Err(ValidationError::ReturnBeforeDeparture {
                    departure: self.departure_date,
                    return_date,
                });
            }
        }
        if self.passengers == 0 || self.passengers > MAX_PASSENGERS {
            return Err(ValidationError::InvalidPassengerCount(self.passengers));
        }
        Ok(())
    }
}

// =============================================================================
// Offers
// =============================================================================

/// A price in minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub minor_units: i64,
    pub currency: String,
}

impl Money {
    pub fn new(minor_units: i64, currency: impl Into<String>) -> Self {
        Self {
            minor_units,
            currency: currency.into(),
        }
    }

    /// Parse a non-negative decimal amount such as `"123.4"` or `"99"`.
    ///
    /// Digits past the second decimal place are truncated.
    pub fn parse_decimal(amount: &str, currency: impl Into<String>) -> Option<Self> {
        let amount = amount.trim();
        let (whole, frac) = match amount.split_once('.') {
            Some((w, f)) => (w, f),
            None => (amount, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let mut cents: String = frac.chars().take(2).collect();
        while cents.len() < 2 {
            cents.push('0');
        }
        let cents: i64 = cents.parse().ok()?;
        Some(Self::new(whole.checked_mul(100)?.checked_add(cents)?, currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.minor_units / 100,
            self.minor_units % 100,
            self.currency
        )
    }
}

/// One bookable (or mock) flight option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub carrier: String,
    /// IATA code of the departure airport.
    pub origin: String,
    /// IATA code of the arrival airport.
    pub destination: String,
    pub price: Money,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub stops: u32,
    /// `true` when sourced from fallback data.
    pub booking_mock: bool,
}

impl FlightOffer {
    /// One-line rendering used in prompts and templated replies.
    pub fn summary_line(&self) -> String {
        let stops = match self.stops {
            0 => "direct".to_string(),
            1 => "1 stop".to_string(),
            n => format!("{} stops", n),
        };
        format!(
            "- {} {} {} → {} — {} — {} — {}",
            self.departure.format("%Y-%m-%d"),
            self.departure.format("%H:%M"),
            self.origin,
            self.destination,
            self.carrier,
            self.price,
            stops
        )
    }
}

// =============================================================================
// Turn requests
// =============================================================================

/// Output modalities requested for one turn. Text is always produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestedModalities {
    /// Target language name or ISO code for translating the reply.
    pub translate_to: Option<String>,
    /// Attach a destination image when offers are shown.
    pub image: bool,
    /// Attach synthesized speech of the final reply text.
    pub voice: bool,
}

impl Default for RequestedModalities {
    fn default() -> Self {
        Self {
            translate_to: None,
            image: true,
            voice: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn query() -> FlightQuery {
        FlightQuery {
            origin: Location::new("IST", "Istanbul"),
            destination: Location::new("LON", "London"),
            departure_date: date(2026, 10, 23),
            return_date: None,
            passengers: 1,
            currency: "EUR".to_string(),
        }
    }

    // ---- FlightQuery validation ----

    #[test]
    fn test_valid_query() {
        assert!(query().validate(date(2026, 10, 19)).is_ok());
    }

    #[test]
    fn test_departure_today_is_valid() {
        assert!(query().validate(date(2026, 10, 23)).is_ok());
    }

    #[test]
    fn test_departure_in_past() {
        let err = query().validate(date(2026, 10, 24)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DepartureInPast {
                date: date(2026, 10, 23)
            }
        );
    }

    #[test]
    fn test_same_origin_and_destination_by_code() {
        let mut q = query();
        q.destination = Location::new("ist", "Somewhere");
        assert!(matches!(
            q.validate(date(2026, 10, 19)),
            Err(ValidationError::SameOriginAndDestination(_))
        ));
    }

    #[test]
    fn test_same_city_different_airports() {
        let mut q = query();
        q.destination = Location::new("SAW", "Istanbul");
        assert!(matches!(
            q.validate(date(2026, 10, 19)),
            Err(ValidationError::SameOriginAndDestination(_))
        ));
    }

    #[test]
    fn test_return_before_departure() {
        let mut q = query();
        q.return_date = Some(date(2026, 10, 20));
        assert!(matches!(
            q.validate(date(2026, 10, 19)),
            Err(ValidationError::ReturnBeforeDeparture { .. })
        ));
    }

    #[test]
    fn test_passenger_bounds() {
        let mut q = query();
        q.passengers = 0;
        assert!(q.validate(date(2026, 10, 19)).is_err());
        q.passengers = MAX_PASSENGERS;
        assert!(q.validate(date(2026, 10, 19)).is_ok());
        q.passengers = MAX_PASSENGERS + 1;
        assert_eq!(
            q.validate(date(2026, 10, 19)),
            Err(ValidationError::InvalidPassengerCount(10))
        );
    }

    #[test]
    fn test_query_date_serializes_canonical() {
        let json = serde_json::to_value(query()).unwrap();
        assert_eq!(json["departure_date"], "2026-10-23");
    }

    // ---- Money ----

    #[test]
    fn test_money_parse_decimal() {
        assert_eq!(Money::parse_decimal("123.45", "EUR").unwrap().minor_units, 12345);
        assert_eq!(Money::parse_decimal("99", "EUR").unwrap().minor_units, 9900);
        assert_eq!(Money::parse_decimal("10.5", "EUR").unwrap().minor_units, 1050);
        assert_eq!(Money::parse_decimal("10.999", "EUR").unwrap().minor_units, 1099);
    }

    #[test]
    fn test_money_parse_rejects_garbage() {
        assert!(Money::parse_decimal("", "EUR").is_none());
        assert!(Money::parse_decimal("-5.00", "EUR").is_none());
        assert!(Money::parse_decimal("12a", "EUR").is_none());
        assert!(Money::parse_decimal(".50", "EUR").is_none());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(12305, "EUR").to_string(), "123.05 EUR");
        assert_eq!(Money::new(7, "USD").to_string(), "0.07 USD");
    }

    // ---- Messages ----

    #[test]
    fn test_message_constructors() {
        let m = Message::user("hello");
        assert_eq!(m.role, Role::User);
        assert!(m.attachments.is_empty());
        let a = Message::assistant("hi");
        assert_eq!(a.role, Role::Assistant);
        assert_ne!(m.id, a.id);
    }

    #[test]
    fn test_message_serialization_skips_empty_lists() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("attachments").is_none());
        assert!(json.get("offers").is_none());
    }

    #[test]
    fn test_annotation_serialization() {
        let json = serde_json::to_value(Annotation::TranslationUnavailable {
            language: "German".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "translation_unavailable");
        assert_eq!(json["language"], "German");
    }

    #[test]
    fn test_message_attachment_lookup() {
        let mut m = Message::assistant("x");
        m.attachments.push(Attachment {
            kind: ArtifactKind::Audio,
            handle: ArtifactHandle::new("audio/abc"),
            mime_type: "audio/mpeg".to_string(),
        });
        assert!(m.attachment(ArtifactKind::Audio).is_some());
        assert!(m.attachment(ArtifactKind::Image).is_none());
    }

    // ---- Misc ----

    #[test]
    fn test_artifact_kind_parse() {
        assert_eq!(ArtifactKind::parse("image"), Some(ArtifactKind::Image));
        assert_eq!(ArtifactKind::parse("audio"), Some(ArtifactKind::Audio));
        assert_eq!(ArtifactKind::parse("video"), None);
    }

    #[test]
    fn test_slot_memory_flight_context() {
        let mut slots = SlotMemory::default();
        assert!(!slots.has_flight_context());
        slots.output_language = Some("German".to_string());
        assert!(!slots.has_flight_context());
        slots.destination = Some(Location::new("BER", "Berlin"));
        assert!(slots.has_flight_context());
    }

    #[test]
    fn test_offer_summary_line() {
        let offer = FlightOffer {
            carrier: "TK".to_string(),
            origin: "IST".to_string(),
            destination: "LHR".to_string(),
            price: Money::new(12999, "EUR"),
            departure: date(2026, 10, 23).and_hms_opt(9, 5, 0).unwrap(),
            arrival: date(2026, 10, 23).and_hms_opt(11, 50, 0).unwrap(),
            stops: 1,
            booking_mock: true,
        };
        assert_eq!(
            offer.summary_line(),
            "- 2026-10-23 09:05 IST → LHR — TK — 129.99 EUR — 1 stop"
        );
    }

    #[test]
    fn test_default_modalities() {
        let m = RequestedModalities::default();
        assert!(m.image);
        assert!(!m.voice);
        assert!(m.translate_to.is_none());
    }
}
