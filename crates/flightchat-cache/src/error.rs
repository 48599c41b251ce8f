//! Error types for the artifact cache.

/// Errors from the artifact cache and its backing stores.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("invalid artifact handle: {0}")]
    InvalidHandle(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
