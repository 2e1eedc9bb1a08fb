use std::path::PathBuf;
use thiserror::Error;

/// Failures of the durable forecast store.
///
/// Storing a forecast that is already present is not one of them, see
/// [`crate::StoreOutcome::AlreadyStored`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open forecast database '{0}'")]
    Open(PathBuf, #[source] rusqlite::Error),

    #[error("Forecast database query failed")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize a stored JSON column")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp '{value}' in column '{column}'")]
    InvalidTimestamp {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
