//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use flightchat_core::{FlightChatConfig, FlightChatError};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Body limit for JSON endpoints.
const JSON_BODY_LIMIT: usize = 64 * 1024;

/// Body limit for audio uploads, matching the transcription API's cap.
const AUDIO_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Allow the configured port and port+1 for a dev frontend.
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [port, port.saturating_add(1)]
        .into_iter()
        .flat_map(|p| {
            [
                format!("http://127.0.0.1:{}", p),
                format!("http://localhost:{}", p),
            ]
        })
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let json_routes = Router::new()
        .route("/chat/turn", post(handlers::chat_turn))
        .route("/chat/sessions/{id}/history", get(handlers::session_history))
        .route("/chat/sessions/{id}/reset", post(handlers::session_reset))
        .route("/voice/speak", post(handlers::voice_speak))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT));

    let audio_routes = Router::new()
        .route("/voice/transcribe", post(handlers::voice_transcribe))
        .layer(DefaultBodyLimit::max(AUDIO_BODY_LIMIT));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/artifacts/{kind}/{key}", get(handlers::artifact))
        .merge(json_routes)
        .merge(audio_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on localhost at the configured port until the process is
/// asked to stop.
pub async fn start_server(
    config: &FlightChatConfig,
    state: AppState,
) -> Result<(), FlightChatError> {
    let addr = format!("127.0.0.1:{}", config.general.port);
    let router = create_router(state);

    tracing::info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FlightChatError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FlightChatError::Api(format!("Server error: {}", e)))?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
