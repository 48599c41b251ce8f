//! Route handler functions for all API endpoints.
//!
//! Handlers are thin: they decode the request, call the orchestrator, and
//! encode the result. All conversation behaviour lives in `flightchat-chat`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use flightchat_cache::CacheStats;
use flightchat_core::{Attachment, Message, RequestedModalities};
use flightchat_providers::ProviderModes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// MIME type assumed for uploads without a `Content-Type` header.
const DEFAULT_AUDIO_MIME: &str = "audio/webm";

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    /// Omit to start a new conversation.
    pub session_id: Option<Uuid>,
    pub message: String,
    pub translate_to: Option<String>,
    pub voice: Option<bool>,
    pub image: Option<bool>,
}

impl TurnRequest {
    fn modalities(&self) -> RequestedModalities {
        let defaults = RequestedModalities::default();
        RequestedModalities {
            translate_to: self
                .translate_to
                .as_ref()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            image: self.image.unwrap_or(defaults.image),
            voice: self.voice.unwrap_or(defaults.voice),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    pub voice: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub sessions: usize,
    pub providers: ProviderModes,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: Uuid,
    pub message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Empty when the audio could not be transcribed.
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub attachment: Attachment,
    /// Download path for the synthesized audio.
    pub url: String,
}

fn artifact_url(attachment: &Attachment) -> String {
    format!("/artifacts/{}", attachment.handle)
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - liveness, provider modes and cache counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.orchestrator.session_count(),
        providers: state.orchestrator.provider_modes().clone(),
        cache: state.orchestrator.cache_stats(),
    })
}

/// POST /chat/turn - handle one user message.
pub async fn chat_turn(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let modalities = request.modalities();
    let message = state
        .orchestrator
        .handle_turn(session_id, &request.message, &modalities)
        .await?;
    Ok(Json(TurnResponse {
        session_id,
        message,
    }))
}

/// GET /chat/sessions/{id}/history
pub async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.orchestrator.get_history(session_id).await?;
    Ok(Json(HistoryResponse {
        session_id,
        messages,
    }))
}

/// POST /chat/sessions/{id}/reset - forget remembered slots.
pub async fn session_reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ActionResult>, ApiError> {
    state.orchestrator.reset_session(session_id).await?;
    Ok(Json(ActionResult {
        success: true,
        message: "Session reset".to_string(),
    }))
}

/// POST /voice/transcribe - raw audio body in, text out.
pub async fn voice_transcribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("audio body is empty".to_string()));
    }
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_AUDIO_MIME);
    let text = state.orchestrator.transcribe(&body, mime_type).await;
    Ok(Json(TranscriptionResponse { text }))
}

/// POST /voice/speak - synthesize text into a cached audio artifact.
pub async fn voice_speak(
    State(state): State<AppState>,
    Json(request): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, ApiError> {
    let attachment = state
        .orchestrator
        .speak(&request.text, request.voice.as_deref())
        .await?;
    Ok(Json(SpeakResponse {
        url: artifact_url(&attachment),
        attachment,
    }))
}

/// GET /artifacts/{kind}/{key} - cached artifact bytes.
pub async fn artifact(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, mime_type) = state
        .orchestrator
        .fetch_artifact_parts(&kind, &key)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, mime_type),
            // Keys are content hashes, so bytes never change.
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_request_defaults() {
        let request: TurnRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(request.session_id.is_none());
        let modalities = request.modalities();
        assert_eq!(modalities, RequestedModalities::default());
    }

    #[test]
    fn test_turn_request_blank_language_ignored() {
        let request: TurnRequest = serde_json::from_str(
            r#"{"message": "hi", "translate_to": "  ", "voice": true, "image": false}"#,
        )
        .unwrap();
        let modalities = request.modalities();
        assert!(modalities.translate_to.is_none());
        assert!(modalities.voice);
        assert!(!modalities.image);
    }
}
