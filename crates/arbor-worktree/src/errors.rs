//! Error types for the worktree subsystem.

use thiserror::Error;

/// Errors raised by the worktree coordinator and git driver.
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// A git subprocess failed.
    #[error("git {command} failed ({exit_code}): {stderr}")]
    Git {
        /// Subcommand that failed (e.g. `worktree add`).
        command: String,
        /// Process exit code (-1 when killed).
        exit_code: i32,
        /// Captured stderr.
        stderr: String,
    },

    /// A git subprocess exceeded its timeout.
    #[error("git {command} timed out after {timeout_ms}ms")]
    Timeout {
        /// Subcommand that timed out.
        command: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The operation was cancelled.
    #[error("git {command} cancelled")]
    Cancelled {
        /// Subcommand that was cancelled.
        command: String,
    },

    /// Session has no acquired working directory.
    #[error("session {0} has no acquired working directory")]
    NotAcquired(String),

    /// Filesystem error.
    #[error("filesystem error at {path}: {message}")]
    Filesystem {
        /// Path involved.
        path: String,
        /// Failure description.
        message: String,
    },

    /// Failed to spawn the git binary.
    #[error("failed to spawn git: {0}")]
    Spawn(String),
}

/// Convenience alias for worktree results.
pub type Result<T> = std::result::Result<T, WorktreeError>;
