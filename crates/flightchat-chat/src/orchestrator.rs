//! Orchestration engine: the single entry point for one user turn.
//!
//! A turn runs resolver → search (flight requests only) → composer, then
//! appends the reply to the session. The session stays locked for the whole
//! turn and is released on every exit path, including cancellation.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate, Utc};
use flightchat_cache::{ArtifactCache, CacheKey, CacheStats};
use flightchat_core::config::ChatConfig;
use flightchat_core::{
    ArtifactHandle, Attachment, Message, RequestedModalities, SlotMemory, ValidationError,
    MAX_PASSENGERS,
};
use flightchat_providers::{resolve_language, ProviderModes, ProviderSet};
use uuid::Uuid;

use crate::composer::ResponseComposer;
use crate::error::ChatError;
use crate::resolver::SlotResolver;
use crate::search::FlightSearchCoordinator;
use crate::session::SessionManager;
use crate::types::{Resolution, SessionSummary};
use crate::voice::VoiceInterface;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

// =============================================================================
// Builder
// =============================================================================

/// Wires an orchestrator from its collaborators.
pub struct OrchestratorBuilder {
    config: ChatConfig,
    providers: Option<ProviderSet>,
    cache: Option<Arc<ArtifactCache>>,
    today: fn() -> NaiveDate,
}

impl OrchestratorBuilder {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            providers: None,
            cache: None,
            today: local_today,
        }
    }

    pub fn providers(mut self, providers: ProviderSet) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn cache(mut self, cache: Arc<ArtifactCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the clock used to resolve relative dates.
    pub fn today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Build the orchestrator. Fails if a required binding is missing.
    pub fn build(self) -> Result<FlightChatOrchestrator, ChatError> {
        let providers = self
            .providers
            .ok_or_else(|| ChatError::Fatal("no provider set bound".to_string()))?;
        let cache = self
            .cache
            .ok_or_else(|| ChatError::Fatal("no artifact cache bound".to_string()))?;
        if self.config.max_message_length == 0 {
            return Err(ChatError::Fatal(
                "chat.max_message_length must be positive".to_string(),
            ));
        }

        let voice = Arc::new(VoiceInterface::from_providers(
            &providers,
            cache.clone(),
            self.config.default_voice.clone(),
        ));
        let composer =
            ResponseComposer::new(&providers, cache.clone(), voice.clone(), &self.config);

        Ok(FlightChatOrchestrator {
            sessions: SessionManager::new(self.config.session_timeout_minutes),
            resolver: SlotResolver::new(self.config.default_currency.clone()),
            search: FlightSearchCoordinator::from_providers(&providers),
            composer,
            voice,
            cache,
            modes: providers.modes(),
            today: self.today,
            config: self.config,
        })
    }
}

// =============================================================================
// FlightChatOrchestrator
// =============================================================================

/// Coordinates slot resolution, flight search, and reply composition.
pub struct FlightChatOrchestrator {
    sessions: SessionManager,
    resolver: SlotResolver,
    search: FlightSearchCoordinator,
    composer: ResponseComposer,
    voice: Arc<VoiceInterface>,
    cache: Arc<ArtifactCache>,
    modes: ProviderModes,
    today: fn() -> NaiveDate,
    config: ChatConfig,
}

impl FlightChatOrchestrator {
    pub fn builder(config: ChatConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Handle one user turn and return the assistant reply.
    ///
    /// Only host errors (empty or oversized input) and fatal wiring errors
    /// are returned; provider failures and invalid queries produce a reply.
    pub async fn handle_turn(
        &self,
        session_id: Uuid,
        text: &str,
        modalities: &RequestedModalities,
    ) -> Result<Message, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        let started = Instant::now();
        let mut session = self.sessions.lock(session_id).await?;
        let history = session.recent(self.config.history_window).to_vec();
        session.append(Message::user(text));

        session.slots.output_language = modalities
            .translate_to
            .as_deref()
            .map(resolve_language)
            .filter(|l| !l.is_empty());
        session.slots.voice = modalities.voice;

        let today = (self.today)();
        let resolution = self.resolver.resolve(text, &mut session.slots, today);
        let intent = match &resolution {
            Resolution::Flight(_) => "flight",
            Resolution::Incomplete { .. } => "incomplete",
            Resolution::ChitChat => "chit_chat",
        };

        let reply = match resolution {
            Resolution::Flight(query) => match self.search.search(&query, today).await {
                Ok(outcome) => {
                    self.composer
                        .compose_offers(text, &query, outcome, modalities)
                        .await
                }
                Err(invalid) => {
                    tracing::info!(session_id = %session_id, reason = %invalid, "Query rejected");
                    let question = clarify(&invalid, &mut session.slots);
                    self.composer
                        .compose_clarification(&question, modalities)
                        .await
                }
            },
            Resolution::Incomplete { missing } => {
                self.composer
                    .compose_clarification(missing.question(), modalities)
                    .await
            }
            Resolution::ChitChat => {
                self.composer
                    .compose_chit_chat(text, &history, modalities)
                    .await
            }
        };

        session.append(reply.clone());
        tracing::info!(
            session_id = %session_id,
            intent,
            offers = reply.offers.len(),
            attachments = reply.attachments.len(),
            annotations = reply.annotations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Turn handled"
        );
        Ok(reply)
    }

    /// Forget a session's remembered slots, keeping its history.
    pub async fn reset_session(&self, session_id: Uuid) -> Result<(), ChatError> {
        self.sessions.reset(session_id).await
    }

    pub async fn get_history(&self, session_id: Uuid) -> Result<Vec<Message>, ChatError> {
        self.sessions.history(session_id).await
    }

    pub async fn session_summary(&self, session_id: Uuid) -> Result<SessionSummary, ChatError> {
        self.sessions.summary(session_id).await
    }

    /// Evict sessions idle past the configured timeout.
    pub fn evict_expired(&self) -> Result<usize, ChatError> {
        self.sessions.evict_expired(Utc::now())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Transcribe recorded audio for the message box. Empty on failure.
    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> String {
        self.voice.transcribe(audio, mime_type).await
    }

    /// Synthesize arbitrary text as speech.
    pub async fn speak(&self, text: &str, voice: Option<&str>) -> Result<Attachment, ChatError> {
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        self.voice.speak(text, voice).await
    }

    /// Bytes and MIME type of a cached artifact.
    pub async fn fetch_artifact(
        &self,
        handle: &ArtifactHandle,
    ) -> Result<(Vec<u8>, String), ChatError> {
        Ok(self.cache.fetch(handle).await?)
    }

    /// Bytes and MIME type of a cached artifact addressed by kind and digest.
    pub async fn fetch_artifact_parts(
        &self,
        kind: &str,
        digest: &str,
    ) -> Result<(Vec<u8>, String), ChatError> {
        let key = CacheKey::from_parts(kind, digest).ok_or_else(|| {
            ChatError::Artifact(format!("invalid artifact key: {}/{}", kind, digest))
        })?;
        self.fetch_artifact(&key.handle()).await
    }

    pub fn provider_modes(&self) -> &ProviderModes {
        &self.modes
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Follow-up question for an invalid query. Clears the offending slot so the
/// next turn can supply it again.
fn clarify(error: &ValidationError, slots: &mut SlotMemory) -> String {
    match error {
        ValidationError::SameOriginAndDestination(city) => {
            slots.destination = None;
            format!(
                "You're already in {}. Where would you like to fly to?",
                city
            )
        }
        ValidationError::DepartureInPast { date } => {
            slots.departure_date = None;
            slots.return_date = None;
            format!(
                "{} has already passed. When would you like to depart?",
                date.format("%d %B %Y")
            )
        }
        ValidationError::ReturnBeforeDeparture {
            departure,
            return_date,
        } => {
            slots.return_date = None;
            format!(
                "The return date {} is before the departure on {}. When would you like to come back?",
                return_date.format("%d %B %Y"),
                departure.format("%d %B %Y")
            )
        }
        ValidationError::InvalidPassengerCount(count) => {
            slots.passengers = None;
            format!(
                "I can search for 1 to {} passengers, not {}. How many people are travelling?",
                MAX_PASSENGERS, count
            )
        }
    }
}
