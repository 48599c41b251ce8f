//! Byte stores backing the artifact cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flightchat_core::ArtifactKind;

use crate::error::CacheError;
use crate::key::CacheKey;

/// An artifact already held by a store, as reported when the cache index is
/// rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub key: CacheKey,
    pub mime_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Where artifact bytes live.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write bytes and their MIME type for `key`, replacing any previous
    /// content.
    async fn put(&self, key: &CacheKey, bytes: &[u8], mime_type: &str) -> Result<(), CacheError>;

    /// Read bytes for `key`, or `None` if absent.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Remove bytes for `key`. Missing keys are not an error.
    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Every complete artifact currently held.
    async fn list(&self) -> Result<Vec<StoredArtifact>, CacheError>;
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Debug)]
struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
    stored_at: DateTime<Utc>,
}

/// Process-local store, used in tests and when no data directory is wanted.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    blobs: RwLock<HashMap<CacheKey, Blob>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::Store("store lock poisoned".to_string())
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &CacheKey, bytes: &[u8], mime_type: &str) -> Result<(), CacheError> {
        self.blobs.write().map_err(poisoned)?.insert(
            key.clone(),
            Blob {
                bytes: bytes.to_vec(),
                mime_type: mime_type.to_string(),
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .blobs
            .read()
            .map_err(poisoned)?
            .get(key)
            .map(|b| b.bytes.clone()))
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.blobs.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredArtifact>, CacheError> {
        Ok(self
            .blobs
            .read()
            .map_err(poisoned)?
            .iter()
            .map(|(key, blob)| StoredArtifact {
                key: key.clone(),
                mime_type: blob.mime_type.clone(),
                stored_at: blob.stored_at,
            })
            .collect())
    }
}

// =============================================================================
// Filesystem
// =============================================================================

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Extension of the sidecar file holding an artifact's MIME type.
const MIME_EXTENSION: &str = "mime";

/// Stores each artifact as `{root}/{kind}/{digest}`, with its MIME type in
/// `{digest}.mime` next to it.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::info!(root = %root.display(), "Artifact store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.kind().as_str()).join(key.digest())
    }

    fn mime_path_for(&self, key: &CacheKey) -> PathBuf {
        self.path_for(key).with_extension(MIME_EXTENSION)
    }
}

/// Write then rename so readers never see a partial file. The temporary file
/// is removed if either step fails.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let tmp = path.with_extension(format!(
        "{}.tmp",
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let written = match tokio::fs::write(&tmp, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        remove_if_present(&tmp).await?;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<(), CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &CacheKey, bytes: &[u8], mime_type: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Sidecar first: bytes without a MIME type are never listed.
        write_atomic(&self.mime_path_for(key), mime_type.as_bytes()).await?;
        write_atomic(&path, bytes).await
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        remove_if_present(&self.path_for(key)).await?;
        remove_if_present(&self.mime_path_for(key)).await
    }

    /// Lists complete artifacts. Leftover temporary files and half-written
    /// artifact/sidecar pairs are removed along the way.
    async fn list(&self) -> Result<Vec<StoredArtifact>, CacheError> {
        let mut found = Vec::new();
        for kind in ArtifactKind::ALL {
            let dir = self.root.join(kind.as_str());
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                if name.ends_with(".tmp") {
                    remove_if_present(&path).await?;
                    continue;
                }
                if let Some(digest) = name.strip_suffix(".mime") {
                    if !tokio::fs::try_exists(dir.join(digest)).await? {
                        remove_if_present(&path).await?;
                    }
                    continue;
                }
                let Some(key) = CacheKey::from_parts(kind.as_str(), name) else {
                    continue;
                };

                let mime_type = match tokio::fs::read_to_string(self.mime_path_for(&key)).await {
                    Ok(mime) if !mime.trim().is_empty() => mime.trim().to_string(),
                    _ => {
                        tracing::warn!(key = %key, "Artifact has no MIME type, removing");
                        self.remove(&key).await?;
                        continue;
                    }
                };
                let stored_at = entry
                    .metadata()
                    .await?
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                found.push(StoredArtifact {
                    key,
                    mime_type,
                    stored_at,
                });
            }
        }
        Ok(found)
    }
}
