//! Orchestration engine for flightchat.
//!
//! Turns one user utterance into one assistant reply: resolves flight slots
//! against the session's memory, searches offers (degrading to mock data),
//! and composes a reply with optional translation, image and speech.

pub mod composer;
pub mod error;
mod gazetteer;
pub mod orchestrator;
pub mod resolver;
pub mod search;
pub mod session;
pub mod types;
pub mod voice;

pub use composer::{templated_summary, ResponseComposer};
pub use error::ChatError;
pub use orchestrator::{FlightChatOrchestrator, OrchestratorBuilder};
pub use resolver::{ExtractedDates, ExtractedSlots, SlotResolver};
pub use search::{rank_offers, FlightSearchCoordinator};
pub use session::{ConversationSession, SessionManager};
pub use types::{MissingSlot, Resolution, SearchOutcome, SessionSummary};
pub use voice::VoiceInterface;
