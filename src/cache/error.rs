use std::path::PathBuf;
use thiserror::Error;

/// Failures of the request cache's backing files.
///
/// These never reach callers of [`crate::RequestCache`]: every one of them degrades to
/// a cache miss (or a skipped write) and is logged.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Cache directory '{0}' is not writable")]
    NotWritable(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache entry '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache entry '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to remove cache entry '{0}'")]
    Remove(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache entry '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache entry")]
    Encode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to fingerprint payload")]
    Fingerprint(#[from] serde_json::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
