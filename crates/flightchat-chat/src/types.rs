//! Types shared across the orchestration engine.

use chrono::{DateTime, Utc};
use flightchat_core::{FlightOffer, FlightQuery, ProviderStatus, SlotMemory};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Resolution
// =============================================================================

/// A required slot the user has not stated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSlot {
    Origin,
    Destination,
    DepartureDate,
}

impl MissingSlot {
    /// Follow-up question asking for this slot.
    pub fn question(&self) -> &'static str {
        match self {
            MissingSlot::Origin => "Where will you be flying from?",
            MissingSlot::Destination => "Where would you like to fly to?",
            MissingSlot::DepartureDate => {
                "When would you like to depart? For example \"next Friday\" or \"15 September\"."
            }
        }
    }
}

/// Outcome of resolving one utterance against remembered slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// All required slots are known.
    Flight(FlightQuery),
    /// Flight intent, but a required slot is still missing.
    Incomplete { missing: MissingSlot },
    /// Not a flight request.
    ChitChat,
}

// =============================================================================
// Search
// =============================================================================

/// Ranked offers plus the status of the provider that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub offers: Vec<FlightOffer>,
    pub status: ProviderStatus,
}

impl SearchOutcome {
    /// Whether the offers came from the fallback generator.
    pub fn is_mock(&self) -> bool {
        self.status != ProviderStatus::Available
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// Read-only view of a session for hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: usize,
    pub slots: SlotMemory,
}
