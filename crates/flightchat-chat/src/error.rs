//! Error types for the orchestration engine.

use flightchat_cache::CacheError;
use flightchat_core::FlightChatError;

/// Errors surfaced to the host.
///
/// Provider failures never appear here; they are recovered inside the turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("artifact error: {0}")]
    Artifact(String),
    #[error("voice error: {0}")]
    Voice(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<FlightChatError> for ChatError {
    fn from(err: FlightChatError) -> Self {
        ChatError::Fatal(err.to_string())
    }
}

impl From<CacheError> for ChatError {
    fn from(err: CacheError) -> Self {
        ChatError::Artifact(err.to_string())
    }
}
