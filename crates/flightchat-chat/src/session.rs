//! Session and context management.
//!
//! Each conversation owns an ordered message history and a [`SlotMemory`].
//! Sessions sit behind their own async mutex so one conversation never runs
//! two turns at once while different conversations proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use flightchat_core::{Message, SlotMemory};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::ChatError;
use crate::types::SessionSummary;

// =============================================================================
// ConversationSession
// =============================================================================

/// State of one conversation.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    messages: Vec<Message>,
    pub slots: SlotMemory,
}

impl ConversationSession {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            started_at: now,
            last_message_at: now,
            messages: Vec::new(),
            slots: SlotMemory::default(),
        }
    }

    /// Append a message. History is append-only.
    pub fn append(&mut self, message: Message) {
        self.last_message_at = message.timestamp.max(self.last_message_at);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Forget remembered slots. History is kept.
    pub fn reset(&mut self) {
        self.slots = SlotMemory::default();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            started_at: self.started_at,
            last_message_at: self.last_message_at,
            message_count: self.messages.len(),
            slots: self.slots.clone(),
        }
    }
}

// =============================================================================
// SessionManager
// =============================================================================

type SharedSession = Arc<AsyncMutex<ConversationSession>>;

/// Registry of live sessions.
pub struct SessionManager {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
    /// Idle time after which a session may be evicted.
    pub session_timeout_minutes: u32,
}

impl SessionManager {
    pub fn new(session_timeout_minutes: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            session_timeout_minutes,
        }
    }

    fn registry(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, SharedSession>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::Fatal(format!("session registry lock poisoned: {}", e)))
    }

    fn find(&self, id: Uuid) -> Result<SharedSession, ChatError> {
        self.registry()?
            .get(&id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(id))
    }

    fn shared(&self, id: Uuid) -> Result<SharedSession, ChatError> {
        Ok(self
            .registry()?
            .entry(id)
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Session created");
                Arc::new(AsyncMutex::new(ConversationSession::new(id)))
            })
            .clone())
    }

    /// Lock a session for the duration of one turn, creating it if needed.
    ///
    /// The guard is owned, so dropping the turn future at any await point
    /// releases the session. A session evicted while we waited for its lock
    /// is not used; the lookup is retried against the registry.
    pub async fn lock(&self, id: Uuid) -> Result<OwnedMutexGuard<ConversationSession>, ChatError> {
        loop {
            let shared = self.shared(id)?;
            let guard = shared.clone().lock_owned().await;
            let registered = self
                .registry()?
                .get(&id)
                .is_some_and(|current| Arc::ptr_eq(current, &shared));
            if registered {
                return Ok(guard);
            }
            tracing::debug!(session_id = %id, "Session evicted while waiting, retrying");
        }
    }

    /// Snapshot of a session's slots and history, creating it if needed.
    pub async fn get_or_create(&self, id: Uuid) -> Result<(SlotMemory, Vec<Message>), ChatError> {
        let session = self.lock(id).await?;
        Ok((session.slots.clone(), session.messages.clone()))
    }

    /// Append a message to an existing session.
    pub async fn append(&self, id: Uuid, message: Message) -> Result<(), ChatError> {
        let shared = self.find(id)?;
        shared.lock().await.append(message);
        Ok(())
    }

    /// Full message history of an existing session.
    pub async fn history(&self, id: Uuid) -> Result<Vec<Message>, ChatError> {
        let shared = self.find(id)?;
        let session = shared.lock().await;
        Ok(session.messages.clone())
    }

    /// Clear an existing session's slots, keeping its history.
    pub async fn reset(&self, id: Uuid) -> Result<(), ChatError> {
        let shared = self.find(id)?;
        shared.lock().await.reset();
        tracing::info!(session_id = %id, "Session slots reset");
        Ok(())
    }

    pub async fn summary(&self, id: Uuid) -> Result<SessionSummary, ChatError> {
        let shared = self.find(id)?;
        let session = shared.lock().await;
        Ok(session.summary())
    }

    /// Drop sessions idle for longer than the timeout.
    ///
    /// Sessions in the middle of a turn are skipped. Returns the number
    /// evicted.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, ChatError> {
        let timeout = Duration::minutes(i64::from(self.session_timeout_minutes));
        let mut sessions = self.registry()?;
        let before = sessions.len();
        sessions.retain(|_, shared| match shared.try_lock() {
            Ok(session) => now - session.last_message_at <= timeout,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        Ok(evicted)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
