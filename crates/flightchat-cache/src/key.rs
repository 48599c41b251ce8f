//! Deterministic cache keys.

use std::fmt;

use flightchat_core::{ArtifactHandle, ArtifactKind};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of an artifact kind and its generation inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ArtifactKind,
    digest: String,
}

impl CacheKey {
    /// Derive the key for `kind` generated from `inputs`.
    ///
    /// Each input is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
    /// produce different keys.
    pub fn derive(kind: ArtifactKind, inputs: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        for input in inputs {
            hasher.update((input.len() as u64).to_le_bytes());
            hasher.update(input.as_bytes());
        }
        Self {
            kind,
            digest: format!("{:x}", hasher.finalize()),
        }
    }

    /// Rebuild a key from its handle form `"{kind}/{digest}"`.
    pub fn from_handle(handle: &ArtifactHandle) -> Option<Self> {
        let (kind, digest) = handle.as_str().split_once('/')?;
        Self::from_parts(kind, digest)
    }

    /// Rebuild a key from a kind name and hex digest, rejecting anything that
    /// is not a 64-character lowercase hex string.
    pub fn from_parts(kind: &str, digest: &str) -> Option<Self> {
        let kind = ArtifactKind::parse(kind)?;
        let valid = digest.len() == 64
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self {
            kind,
            digest: digest.to_string(),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Opaque handle exposed to hosts.
    pub fn handle(&self) -> ArtifactHandle {
        ArtifactHandle::new(self.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.digest)
    }
}
