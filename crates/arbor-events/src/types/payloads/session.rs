//! Session lifecycle event payloads.

use serde::{Deserialize, Serialize};

/// Payload for `session.start` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartPayload {
    /// Directory the session operates in.
    pub working_directory: String,
    /// Model identifier.
    pub model: String,
    /// Provider identifier.
    pub provider: String,
}

/// Payload for `session.end` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndPayload {
    /// Why the session ended.
    pub reason: String,
}

/// Payload for `session.fork` events (recorded on the child session).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForkPayload {
    /// Session the fork was taken from.
    pub source_session_id: String,
    /// How many messages were replayed onto the child.
    pub message_count: i64,
}

/// Payload for `session.rewind` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRewindPayload {
    /// Last retained message index.
    pub to_message_index: i64,
    /// Event ids of the logically removed messages.
    pub removed_event_ids: Vec<String>,
    /// Number of messages removed.
    pub removed_count: i64,
}
