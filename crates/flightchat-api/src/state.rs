//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use flightchat_chat::FlightChatOrchestrator;
use flightchat_core::FlightChatConfig;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FlightChatConfig>,
    pub orchestrator: Arc<FlightChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: FlightChatConfig, orchestrator: FlightChatOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            start_time: Instant::now(),
        }
    }
}
