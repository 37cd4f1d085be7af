//! RPC error codes and error type.
//!
//! Handlers return [`RpcError`]; the dispatcher maps it into a structured
//! `{success: false, error: {code, message}}` response. Domain errors from
//! the runtime, store, memory, and worktree layers convert in carrying their
//! stable codes.

use crate::types::RpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Invalid or missing parameters.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Handler requires a manager this server was not configured with.
pub const NOT_SUPPORTED: &str = "NOT_SUPPORTED";
/// Session does not exist.
pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
/// Session is already in plan mode.
pub const ALREADY_IN_PLAN_MODE: &str = "ALREADY_IN_PLAN_MODE";
/// Session is not in plan mode.
pub const NOT_IN_PLAN_MODE: &str = "NOT_IN_PLAN_MODE";
/// Session exists but is in an invalid state for the operation.
pub const SESS_INVALID: &str = "SESS_INVALID";
/// Conflicting session state (e.g. the main directory is owned).
pub const SESS_CONFLICT: &str = "SESS_CONFLICT";
/// Event persistence failure.
pub const EVNT_PERSIST: &str = "EVNT_PERSIST";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Event parent pointer rejected.
pub const INVALID_PARENT: &str = "INVALID_PARENT";
/// Database schema is newer than the binary.
pub const SCHEMA_MISMATCH: &str = "SCHEMA_MISMATCH";
/// Authentication failure.
pub const AUTH_FAILED: &str = "AUTH_FAILED";

/// RPC error type returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Method is not registered.
    #[error("Method '{method}' not found")]
    MethodNotFound {
        /// The unknown method name.
        method: String,
    },

    /// Required manager is not configured.
    #[error("{message}")]
    NotSupported {
        /// Description.
        message: String,
    },

    /// Domain error carrying its stable code.
    #[error("{message}")]
    Domain {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl RpcError {
    /// Create an invalid-params error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a domain error with a stable code.
    #[must_use]
    pub fn domain(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Domain {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a not-supported error naming the missing manager.
    #[must_use]
    pub fn manager_missing(name: &str) -> Self {
        Self::NotSupported {
            message: format!("{name} is not available on this server"),
        }
    }

    /// Machine-readable error code for this variant.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::NotSupported { .. } => NOT_SUPPORTED,
            Self::Domain { code, .. } => code,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Convert to the wire-format error body.
    #[must_use]
    pub fn to_error_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
        }
    }
}

impl From<arbor_runtime::RuntimeError> for RpcError {
    fn from(err: arbor_runtime::RuntimeError) -> Self {
        Self::Domain {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}

impl From<arbor_events::EventStoreError> for RpcError {
    fn from(err: arbor_events::EventStoreError) -> Self {
        Self::Domain {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}

impl From<arbor_memory::MemoryError> for RpcError {
    fn from(err: arbor_memory::MemoryError) -> Self {
        match err {
            arbor_memory::MemoryError::Store(e) => e.into(),
            arbor_memory::MemoryError::InvalidId(id) => Self::InvalidParams {
                message: format!("invalid id: {id}"),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<arbor_worktree::WorktreeError> for RpcError {
    fn from(err: arbor_worktree::WorktreeError) -> Self {
        match err {
            arbor_worktree::WorktreeError::NotAcquired(session) => Self::Domain {
                code: SESS_INVALID.to_owned(),
                message: format!("session {session} has no acquired working directory"),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}
