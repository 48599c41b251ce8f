use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::ProviderKind;

/// Top-level error type for configuration and storage plumbing.
///
/// Subsystem crates define their own error types and implement
/// `From<FlightChatError>` so that the `?` operator works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlightChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for FlightChatError {
    fn from(err: toml::de::Error) -> Self {
        FlightChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FlightChatError {
    fn from(err: toml::ser::Error) -> Self {
        FlightChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FlightChatError {
    fn from(err: serde_json::Error) -> Self {
        FlightChatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for flightchat plumbing.
pub type Result<T> = std::result::Result<T, FlightChatError>;

/// A flight query that cannot be searched as stated.
///
/// Surfaced to the user as a clarification request, never as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("origin and destination are both {0}")]
    SameOriginAndDestination(String),

    #[error("departure date {date} is in the past")]
    DepartureInPast { date: NaiveDate },

    #[error("return date {return_date} is before departure date {departure}")]
    ReturnBeforeDeparture {
        departure: NaiveDate,
        return_date: NaiveDate,
    },

    #[error("passenger count {0} is outside 1..={max}", max = crate::types::MAX_PASSENGERS)]
    InvalidPassengerCount(u32),
}

/// How an external provider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Unavailable,
    MalformedResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Unavailable => "unavailable",
            FailureKind::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// Failure of a single provider call.
///
/// Always recovered locally by the caller (fallback data, untranslated text,
/// or an omitted attachment).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} provider {kind}: {detail}")]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub kind: FailureKind,
    pub detail: String,
}

impl ProviderFailure {
    pub fn new(provider: ProviderKind, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Timeout, detail)
    }

    pub fn unavailable(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Unavailable, detail)
    }

    pub fn malformed(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::MalformedResponse, detail)
    }
}
