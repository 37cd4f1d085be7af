//! Tool event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for `tool.call` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallPayload {
    /// Unique id tying the call to its result.
    pub tool_call_id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments (tool-specific JSON).
    pub arguments: Value,
}

/// Payload for `tool.result` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPayload {
    /// Id of the originating call.
    pub tool_call_id: String,
    /// Tool output (tool-specific JSON).
    pub result: Value,
    /// Whether the tool reported an error.
    pub is_error: bool,
    /// Execution duration in milliseconds.
    pub duration: u64,
}
