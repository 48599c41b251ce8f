//! HTTP host for the flightchat orchestration engine.
//!
//! Exposes chat turns, session lifecycle, voice transcription and synthesis,
//! and cached artifact download over a small JSON API.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
