//! Shared data model, error taxonomy, and configuration for flightchat.

pub mod config;
pub mod error;
pub mod types;

pub use config::FlightChatConfig;
pub use error::{FailureKind, FlightChatError, ProviderFailure, Result, ValidationError};
pub use types::*;
