//! Content-addressed cache for generated artifacts.
//!
//! Keys are SHA-256 digests of the artifact kind and its generation inputs.
//! Entries are never mutated once written; the cache bounds itself by entry
//! count and an optional TTL.

pub mod cache;
pub mod error;
pub mod key;
pub mod store;

pub use cache::{ArtifactCache, CacheEntry, CacheStats};
pub use error::CacheError;
pub use key::CacheKey;
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, StoredArtifact};
