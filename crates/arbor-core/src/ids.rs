//! Prefixed entity ids.
//!
//! Every persisted entity carries a stable string id: a short type prefix
//! followed by a UUID v7 (time-ordered, so ids sort by creation time).
//! The prefix makes ids self-describing in logs and wire payloads.

use uuid::Uuid;

/// Id prefix for workspaces.
pub const WORKSPACE_PREFIX: &str = "ws_";
/// Id prefix for sessions.
pub const SESSION_PREFIX: &str = "sess_";
/// Id prefix for events.
pub const EVENT_PREFIX: &str = "evt_";
/// Id prefix for blobs.
pub const BLOB_PREFIX: &str = "blob_";
/// Id prefix for branches.
pub const BRANCH_PREFIX: &str = "br_";
/// Id prefix for handoffs.
pub const HANDOFF_PREFIX: &str = "ho_";

fn prefixed(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::now_v7())
}

/// Generate a new workspace id (`ws_…`).
#[must_use]
pub fn new_workspace_id() -> String {
    prefixed(WORKSPACE_PREFIX)
}

/// Generate a new session id (`sess_…`).
#[must_use]
pub fn new_session_id() -> String {
    prefixed(SESSION_PREFIX)
}

/// Generate a new event id (`evt_…`).
#[must_use]
pub fn new_event_id() -> String {
    prefixed(EVENT_PREFIX)
}

/// Generate a new blob id (`blob_…`).
#[must_use]
pub fn new_blob_id() -> String {
    prefixed(BLOB_PREFIX)
}

/// Generate a new branch id (`br_…`).
#[must_use]
pub fn new_branch_id() -> String {
    prefixed(BRANCH_PREFIX)
}

/// Generate a new handoff id (`ho_…`).
#[must_use]
pub fn new_handoff_id() -> String {
    prefixed(HANDOFF_PREFIX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
