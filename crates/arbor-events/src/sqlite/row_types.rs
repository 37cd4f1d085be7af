//! Database row types for mapping between `SQLite` rows and Rust structs.
//!
//! These represent the raw database row shape — not the public wire types.
//! Conversion to wire payloads happens at the RPC layer.

use serde::{Deserialize, Serialize};

/// Raw workspace row from the `workspaces` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRow {
    /// Workspace ID.
    pub id: String,
    /// Absolute path (unique).
    pub path: String,
    /// Display name.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
    /// Session count (computed via subquery).
    pub session_count: Option<i64>,
}

/// Raw session row from the `sessions` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    /// Session ID.
    pub id: String,
    /// Workspace ID.
    pub workspace_id: String,
    /// Head event ID (latest event in the main chain).
    pub head_event_id: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Provider identifier.
    pub provider: String,
    /// Working directory.
    pub working_directory: String,
    /// Parent session ID (for forks).
    pub parent_session_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
    /// End timestamp (null while active).
    pub ended_at: Option<String>,
    /// Event count.
    pub event_count: i64,
    /// Message count.
    pub message_count: i64,
    /// Total input tokens.
    pub input_tokens: i64,
    /// Total output tokens.
    pub output_tokens: i64,
}

impl SessionRow {
    /// Whether the session has ended.
    #[must_use]
    pub fn ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Raw event row from the `events` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    /// Event ID.
    pub id: String,
    /// Session ID.
    pub session_id: String,
    /// Parent event ID (null for roots).
    pub parent_id: Option<String>,
    /// Workspace ID.
    pub workspace_id: String,
    /// Per-session sequence number.
    pub sequence: i64,
    /// Event type string.
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
    /// Payload JSON (stored verbatim).
    pub payload: String,
    /// Denormalized tool name.
    pub tool_name: Option<String>,
    /// Denormalized turn number.
    pub turn: Option<i64>,
}

impl EventRow {
    /// Parse the stored payload JSON.
    pub fn payload_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Raw blob row from the `blobs` table (metadata only, no content).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRow {
    /// Blob ID.
    pub id: String,
    /// SHA-256 content hash (hex).
    pub hash: String,
    /// Byte length of the content.
    pub size: i64,
    /// Reference count.
    pub ref_count: i64,
    /// Creation timestamp.
    pub created_at: String,
}

/// Raw branch row from the `branches` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRow {
    /// Branch ID.
    pub id: String,
    /// Session ID.
    pub session_id: String,
    /// Branch name (unique per session).
    pub name: String,
    /// Root event ID.
    pub root_event_id: String,
    /// Head event ID (must descend from the root).
    pub head_event_id: String,
    /// Whether this is the default branch.
    pub is_default: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last activity timestamp.
    pub last_activity_at: String,
}
