//! FlightChat server binary, the composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Overlay provider credentials from the environment
//! 3. Bind providers (live where credentialed, mock elsewhere)
//! 4. Open the artifact store and build the orchestrator
//! 5. Start the idle-session eviction loop
//! 6. Serve the HTTP API

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use flightchat_api::{start_server, AppState};
use flightchat_cache::{ArtifactCache, FsArtifactStore};
use flightchat_chat::FlightChatOrchestrator;
use flightchat_core::FlightChatConfig;
use flightchat_providers::ProviderSet;
use tracing_subscriber::EnvFilter;

use cli::{expand_home, CliArgs};

/// How often idle sessions are swept.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Build the log filter. Priority: --log-level > RUST_LOG > config file.
fn log_filter(cli_level: Option<&str>, config_level: &str) -> EnvFilter {
    if let Some(filter) = cli_level.and_then(|l| EnvFilter::try_new(l).ok()) {
        return filter;
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Periodically drop sessions idle past the configured timeout.
async fn session_eviction_loop(orchestrator: Arc<FlightChatOrchestrator>) {
    let mut interval = tokio::time::interval(EVICTION_INTERVAL);
    loop {
        interval.tick().await;
        match orchestrator.evict_expired() {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(
                evicted,
                remaining = orchestrator.session_count(),
                "Session sweep complete"
            ),
            Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before logging starts, so load problems are reported
    // once the subscriber is up.
    let config_file = args.resolve_config_path();
    let (config, load_error) = match FlightChatConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (FlightChatConfig::default(), Some(e)),
    };
    let mut config = config.with_env_credentials(|key| std::env::var(key).ok());
    config.general.port = args.resolve_port(config.general.port);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            args.resolve_log_level().as_deref(),
            &config.general.log_level,
        ))
        .init();

    tracing::info!("Starting FlightChat v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Configuration not loaded, using defaults"
        ),
    }

    // Providers.
    let providers = ProviderSet::from_config(&config.providers)?;

    // Artifact cache.
    let artifact_dir = expand_home(&config.general.data_dir).join("artifacts");
    let store = match FsArtifactStore::open(&artifact_dir) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(
                path = %artifact_dir.display(),
                error = %e,
                "Failed to open artifact store"
            );
            return Err(e.into());
        }
    };
    let cache = Arc::new(ArtifactCache::from_config(&config.cache, Arc::new(store)));
    if let Err(e) = cache.restore().await {
        tracing::warn!(
            path = %artifact_dir.display(),
            error = %e,
            "Failed to index stored artifacts"
        );
    }

    // Orchestrator.
    let orchestrator = FlightChatOrchestrator::builder(config.chat.clone())
        .providers(providers)
        .cache(cache)
        .build()?;
    let state = AppState::new(config.clone(), orchestrator);

    // === Background tasks ===

    tokio::spawn(session_eviction_loop(Arc::clone(&state.orchestrator)));

    // === API server ===

    if let Err(e) = start_server(&config, state).await {
        tracing::error!(error = %e, port = config.general.port, "API server failed");
        tracing::error!(
            "Try: FLIGHTCHAT_PORT={} flightchat",
            config.general.port.saturating_add(1)
        );
        return Err(e.into());
    }
    Ok(())
}
