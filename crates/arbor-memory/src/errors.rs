//! Error types for the memory subsystem.

use thiserror::Error;

/// Errors raised by recall, handoff, ledger, and artifact stores.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Event store failure.
    #[error(transparent)]
    Store(#[from] arbor_events::EventStoreError),

    /// `SQLite` failure in the memory database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool failure.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON (de)serialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("io error at {path}: {message}")]
    Io {
        /// Path involved.
        path: String,
        /// Failure description.
        message: String,
    },

    /// Identifier contains characters that cannot appear in a filename.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// Requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias for memory results.
pub type Result<T> = std::result::Result<T, MemoryError>;
