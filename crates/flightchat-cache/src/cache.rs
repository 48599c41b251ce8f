//! The artifact cache: an index of immutable entries over an [`ArtifactStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use flightchat_core::config::CacheConfig;
use flightchat_core::{ArtifactHandle, ArtifactKind};
use serde::Serialize;

use crate::error::CacheError;
use crate::key::CacheKey;
use crate::store::{ArtifactStore, StoredArtifact};

/// An indexed artifact. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub handle: ArtifactHandle,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn kind(&self) -> ArtifactKind {
        self.key.kind()
    }
}

/// Counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Indexed {
    seq: u64,
    entry: CacheEntry,
}

/// Content-addressed artifact cache.
///
/// Safe for concurrent lookup and insert. Two callers racing to insert the
/// same key both write identical bytes and the later index entry wins.
pub struct ArtifactCache {
    store: Arc<dyn ArtifactStore>,
    entries: RwLock<HashMap<CacheKey, Indexed>>,
    /// Serialises store writes and removals with index updates, so an
    /// eviction never deletes bytes that a concurrent insert just wrote.
    writes: tokio::sync::Mutex<()>,
    sequence: AtomicU64,
    max_entries: usize,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ArtifactCache {
    pub fn new(store: Arc<dyn ArtifactStore>, max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
            writes: tokio::sync::Mutex::new(()),
            sequence: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig, store: Arc<dyn ArtifactStore>) -> Self {
        let ttl = config
            .ttl_minutes
            .and_then(|m| i64::try_from(m).ok())
            .and_then(Duration::try_minutes);
        Self::new(store, config.max_entries, ttl)
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now - entry.created_at >= ttl,
            None => false,
        }
    }

    fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::Store("cache index lock poisoned".to_string()))?;
        Ok(entries
            .get(key)
            .map(|i| &i.entry)
            .filter(|e| !self.is_expired(e, Utc::now()))
            .cloned())
    }

    /// Look up a live entry, counting the hit or miss.
    pub fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let found = self.read_entry(key)?;
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Cache miss");
        }
        Ok(found)
    }

    fn write_index(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<CacheKey, Indexed>>, CacheError> {
        self.entries
            .write()
            .map_err(|_| CacheError::Store("cache index lock poisoned".to_string()))
    }

    /// Store `bytes` under `key` and index them.
    ///
    /// If a live entry already exists it is returned unchanged and nothing is
    /// written.
    pub async fn insert(
        &self,
        key: CacheKey,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<CacheEntry, CacheError> {
        if let Some(existing) = self.read_entry(&key)? {
            return Ok(existing);
        }

        let _writes = self.writes.lock().await;
        if let Some(existing) = self.read_entry(&key)? {
            return Ok(existing);
        }

        self.store.put(&key, bytes, mime_type).await?;

        let entry = CacheEntry {
            handle: key.handle(),
            key: key.clone(),
            mime_type: mime_type.to_string(),
            created_at: Utc::now(),
        };
        let evicted = {
            let mut entries = self.write_index()?;
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            entries.insert(
                key,
                Indexed {
                    seq,
                    entry: entry.clone(),
                },
            );
            self.collect_evictions(&mut entries)
        };
        self.remove_evicted(evicted).await;

        tracing::debug!(handle = %entry.handle, bytes = bytes.len(), "Artifact cached");
        Ok(entry)
    }

    /// Index the artifacts already held by the store, oldest first, then
    /// apply the TTL and entry bound to them. Returns the number of entries
    /// kept.
    pub async fn restore(&self) -> Result<usize, CacheError> {
        let _writes = self.writes.lock().await;
        let mut stored = self.store.list().await?;
        stored.sort_by(|a, b| {
            a.stored_at
                .cmp(&b.stored_at)
                .then_with(|| a.key.digest().cmp(b.key.digest()))
        });

        let (kept, evicted) = {
            let mut entries = self.write_index()?;
            for StoredArtifact {
                key,
                mime_type,
                stored_at,
            } in stored
            {
                if entries.contains_key(&key) {
                    continue;
                }
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                entries.insert(
                    key.clone(),
                    Indexed {
                        seq,
                        entry: CacheEntry {
                            handle: key.handle(),
                            key,
                            mime_type,
                            created_at: stored_at,
                        },
                    },
                );
            }
            let evicted = self.collect_evictions(&mut entries);
            (entries.len(), evicted)
        };
        let dropped = evicted.len();
        self.remove_evicted(evicted).await;

        tracing::info!(entries = kept, evicted = dropped, "Artifact cache restored");
        Ok(kept)
    }

    /// Delete evicted bytes. Callers hold the write lock.
    async fn remove_evicted(&self, evicted: Vec<CacheKey>) {
        for key in evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.store.remove(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove evicted artifact");
            }
        }
    }

    /// Drop expired entries, then the oldest until within `max_entries`.
    fn collect_evictions(&self, entries: &mut HashMap<CacheKey, Indexed>) -> Vec<CacheKey> {
        let now = Utc::now();
        let mut evicted: Vec<CacheKey> = entries
            .values()
            .filter(|i| self.is_expired(&i.entry, now))
            .map(|i| i.entry.key.clone())
            .collect();
        for key in &evicted {
            entries.remove(key);
        }

        if entries.len() > self.max_entries {
            let mut by_age: Vec<(u64, CacheKey)> = entries
                .values()
                .map(|i| (i.seq, i.entry.key.clone()))
                .collect();
            by_age.sort_by_key(|(seq, _)| *seq);
            let excess = entries.len() - self.max_entries;
            for (_, key) in by_age.into_iter().take(excess) {
                entries.remove(&key);
                evicted.push(key);
            }
        }
        evicted
    }

    /// Read the bytes and MIME type behind a handle.
    pub async fn fetch(&self, handle: &ArtifactHandle) -> Result<(Vec<u8>, String), CacheError> {
        let key = CacheKey::from_handle(handle)
            .ok_or_else(|| CacheError::InvalidHandle(handle.to_string()))?;
        let entry = self
            .read_entry(&key)?
            .ok_or_else(|| CacheError::NotFound(handle.to_string()))?;
        let bytes = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| CacheError::NotFound(handle.to_string()))?;
        Ok((bytes, entry.mime_type))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().map(|e| e.len()).unwrap_or(0),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
