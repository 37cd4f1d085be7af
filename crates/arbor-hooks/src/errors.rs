//! Error types for the hook subsystem.

use thiserror::Error;

/// Errors raised by hook handlers.
///
/// The engine treats all of these as fail-open: a failing handler logs a
/// warning and counts as `continue`.
#[derive(Debug, Error)]
pub enum HookError {
    /// Handler reported a failure.
    #[error("hook '{name}' failed: {message}")]
    HandlerError {
        /// Handler name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// Handler context could not be (de)serialized.
    #[error("hook context error: {0}")]
    Context(#[from] serde_json::Error),
}

/// Convenience alias for hook results.
pub type Result<T> = std::result::Result<T, HookError>;
