//! The core error taxonomy.
//!
//! Errors are classified along two orthogonal axes: a [`ErrorCategory`]
//! describing *where* the failure came from, and a retryability flag
//! describing whether the caller may usefully try again. Every logged error
//! carries a stable string code alongside both axes, so log pipelines and
//! clients never have to parse messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where an error originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    /// Filesystem access (worktree checkouts, artifact files).
    Filesystem,
    /// Embedded database (event store, handoff store).
    Database,
    /// Network or subprocess I/O.
    Network,
    /// Session lifecycle state (not found, already ended, conflicting owner).
    SessionState,
    /// Event persistence (append, index, counter updates).
    EventPersist,
    /// Security / authentication.
    Security,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Filesystem => "filesystem",
            Self::Database => "database",
            Self::Network => "network",
            Self::SessionState => "session-state",
            Self::EventPersist => "event-persist",
            Self::Security => "security",
        };
        f.write_str(s)
    }
}

/// A classified core error: stable code, category, retryability, message.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct CoreError {
    /// Stable machine-readable code (e.g. `EVNT_PERSIST`).
    pub code: String,
    /// Origin classification.
    pub category: ErrorCategory,
    /// Whether retrying the operation may succeed.
    pub retryable: bool,
    /// Human-readable description.
    pub message: String,
}

impl CoreError {
    /// Create a new classified error.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        category: ErrorCategory,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            category,
            retryable,
            message: message.into(),
        }
    }

    /// Terminal event-persistence failure (`EVNT_PERSIST`).
    #[must_use]
    pub fn event_persist(message: impl Into<String>) -> Self {
        Self::new("EVNT_PERSIST", ErrorCategory::EventPersist, false, message)
    }

    /// Session-state failure (`SESS_INVALID`).
    #[must_use]
    pub fn session_invalid(message: impl Into<String>) -> Self {
        Self::new("SESS_INVALID", ErrorCategory::SessionState, false, message)
    }

    /// Conflicting session state (`SESS_CONFLICT`), retryable once the
    /// conflicting session releases its resources.
    #[must_use]
    pub fn session_conflict(message: impl Into<String>) -> Self {
        Self::new("SESS_CONFLICT", ErrorCategory::SessionState, true, message)
    }

    /// Filesystem failure, retryable.
    #[must_use]
    pub fn filesystem(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, ErrorCategory::Filesystem, true, message)
    }

    /// Authentication failure (`AUTH_FAILED`).
    #[must_use]
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new("AUTH_FAILED", ErrorCategory::Security, false, message)
    }
}

/// Convenience alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
