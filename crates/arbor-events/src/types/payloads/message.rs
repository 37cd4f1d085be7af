//! Message event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for `message.user` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessagePayload {
    /// Message text.
    pub content: String,
    /// Conversation turn this message opened.
    pub turn: i64,
}

/// One content block in an assistant message (`{type, text|…}`).
///
/// Blocks other than `text` carry provider-specific fields; those are kept
/// in `extra` so the stored JSON round-trips unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block type (`text`, `tool_use`, `thinking`, …).
    #[serde(rename = "type")]
    pub block_type: String,
    /// Text for `text` blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Any additional provider fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Token accounting for one assistant message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Prompt tokens consumed.
    pub input_tokens: i64,
    /// Completion tokens produced.
    pub output_tokens: i64,
    /// Tokens served from prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<i64>,
    /// Tokens written into prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<i64>,
}

/// Payload for `message.assistant` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessagePayload {
    /// Content blocks.
    pub content: Vec<ContentBlock>,
    /// Conversation turn.
    pub turn: i64,
    /// Token accounting.
    pub token_usage: TokenUsage,
    /// Why the model stopped.
    pub stop_reason: String,
    /// Model that produced the message.
    pub model: String,
}

impl AssistantMessagePayload {
    /// Concatenated text of all `text` blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
