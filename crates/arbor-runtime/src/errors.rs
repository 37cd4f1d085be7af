//! Error types for the runtime layer.

use thiserror::Error;

/// Errors raised by session, plan, and todo managers.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Event store failure.
    #[error(transparent)]
    Store(#[from] arbor_events::EventStoreError),

    /// Requested session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Operation requires an active session but this one has ended.
    #[error("session has ended: {0}")]
    SessionEnded(String),

    /// Session is already in plan mode.
    #[error("session {0} is already in plan mode")]
    AlreadyInPlanMode(String),

    /// Session is not in plan mode.
    #[error("session {0} is not in plan mode")]
    NotInPlanMode(String),

    /// Invalid operation for the session's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl RuntimeError {
    /// Stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.code(),
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::SessionEnded(_) | Self::InvalidOperation(_) => "SESS_INVALID",
            Self::AlreadyInPlanMode(_) => "ALREADY_IN_PLAN_MODE",
            Self::NotInPlanMode(_) => "NOT_IN_PLAN_MODE",
        }
    }
}

/// Convenience alias for runtime results.
pub type Result<T> = std::result::Result<T, RuntimeError>;
