//! Error types for the event store subsystem.
//!
//! [`EventStoreError`] is the primary error type returned by all event store
//! operations. Variants map onto the stable wire codes where one exists
//! (`INVALID_PARENT`, `SCHEMA_MISMATCH`, `EVNT_PERSIST`).

use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Database schema is newer than this binary understands.
    #[error("schema mismatch: database at version {found}, supported up to {supported}")]
    SchemaMismatch {
        /// Version recorded in the database.
        found: u32,
        /// Latest version this binary can apply.
        supported: u32,
    },

    /// Requested session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Requested event was not found.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// Requested workspace was not found.
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// Requested blob was not found.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Parent pointer is invalid: missing, cross-session, or would close a cycle.
    #[error("invalid parent: {0}")]
    InvalidParent(String),

    /// Invalid operation on the event store.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Internal error (e.g. poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EventStoreError {
    /// Stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParent(_) => "INVALID_PARENT",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::Sqlite(_) | Self::Pool(_) | Self::Serde(_) | Self::Migration { .. } => {
                "EVNT_PERSIST"
            }
            Self::EventNotFound(_)
            | Self::WorkspaceNotFound(_)
            | Self::BlobNotFound(_)
            | Self::InvalidOperation(_)
            | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convenience type alias for event store results.
pub type Result<T> = std::result::Result<T, EventStoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
