//! The [`SessionEvent`] struct — the core persisted event type.
//!
//! Events are stored as a flat struct with base fields at the top level and a
//! `payload` stored as opaque [`serde_json::Value`] for exact wire
//! compatibility. Typed access to the payload is opt-in via
//! [`SessionEvent::typed_payload()`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event_type::EventType;
use super::payloads;

/// A persisted session event.
///
/// The canonical wire format has base fields (`id`, `parentId`, `sessionId`,
/// etc.) at the top level and a `payload` JSON object whose schema depends on
/// [`EventType`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// Unique event ID (`evt_` + UUID v7).
    pub id: String,
    /// Parent event ID (`null` for root events).
    pub parent_id: Option<String>,
    /// Session this event belongs to.
    pub session_id: String,
    /// Workspace this event belongs to.
    pub workspace_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
    /// Event type discriminator.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Monotonic sequence number within the session (starts at 0).
    pub sequence: i64,
    /// Event-specific data (opaque JSON).
    pub payload: Value,
}

/// Typed payload enum for compile-time-safe access.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEventPayload {
    /// `session.start`
    SessionStart(payloads::session::SessionStartPayload),
    /// `session.end`
    SessionEnd(payloads::session::SessionEndPayload),
    /// `session.fork`
    SessionFork(payloads::session::SessionForkPayload),
    /// `session.rewind`
    SessionRewind(payloads::session::SessionRewindPayload),
    /// `message.user`
    MessageUser(payloads::message::UserMessagePayload),
    /// `message.assistant`
    MessageAssistant(payloads::message::AssistantMessagePayload),
    /// `tool.call`
    ToolCall(payloads::tool::ToolCallPayload),
    /// `tool.result`
    ToolResult(payloads::tool::ToolResultPayload),
    /// `worktree.acquired`
    WorktreeAcquired(payloads::worktree::WorktreeAcquiredPayload),
    /// `worktree.released`
    WorktreeReleased(payloads::worktree::WorktreeReleasedPayload),
    /// `worktree.commit`
    WorktreeCommit(payloads::worktree::WorktreeCommitPayload),
    /// `worktree.merged`
    WorktreeMerged(payloads::worktree::WorktreeMergedPayload),
    /// `plan.mode_entered`
    PlanModeEntered(payloads::plan::PlanModeEnteredPayload),
    /// `plan.mode_exited`
    PlanModeExited(payloads::plan::PlanModeExitedPayload),
    /// `todos.updated`
    TodosUpdated(payloads::todo::TodosUpdatedPayload),
    /// `config.model_switch`
    ConfigModelSwitch(payloads::config::ConfigModelSwitchPayload),
    /// `memory.ledger` — kept opaque, shape is owner-defined.
    MemoryLedger(Value),
    /// `log` — kept opaque.
    Log(Value),
}

impl SessionEvent {
    /// Deserialize the payload into the typed variant matching
    /// [`event_type`](Self::event_type).
    ///
    /// Returns `Err` if the payload JSON doesn't match the expected shape.
    pub fn typed_payload(&self) -> std::result::Result<SessionEventPayload, serde_json::Error> {
        match self.event_type {
            EventType::SessionStart => Ok(SessionEventPayload::SessionStart(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::SessionEnd => Ok(SessionEventPayload::SessionEnd(serde_json::from_value(
                self.payload.clone(),
            )?)),
            EventType::SessionFork => Ok(SessionEventPayload::SessionFork(serde_json::from_value(
                self.payload.clone(),
            )?)),
            EventType::SessionRewind => Ok(SessionEventPayload::SessionRewind(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::MessageUser => Ok(SessionEventPayload::MessageUser(serde_json::from_value(
                self.payload.clone(),
            )?)),
            EventType::MessageAssistant => Ok(SessionEventPayload::MessageAssistant(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::ToolCall => Ok(SessionEventPayload::ToolCall(serde_json::from_value(
                self.payload.clone(),
            )?)),
            EventType::ToolResult => Ok(SessionEventPayload::ToolResult(serde_json::from_value(
                self.payload.clone(),
            )?)),
            EventType::WorktreeAcquired => Ok(SessionEventPayload::WorktreeAcquired(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::WorktreeReleased => Ok(SessionEventPayload::WorktreeReleased(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::WorktreeCommit => Ok(SessionEventPayload::WorktreeCommit(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::WorktreeMerged => Ok(SessionEventPayload::WorktreeMerged(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::PlanModeEntered => Ok(SessionEventPayload::PlanModeEntered(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::PlanModeExited => Ok(SessionEventPayload::PlanModeExited(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::TodosUpdated => Ok(SessionEventPayload::TodosUpdated(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::ConfigModelSwitch => Ok(SessionEventPayload::ConfigModelSwitch(
                serde_json::from_value(self.payload.clone())?,
            )),
            EventType::MemoryLedger => Ok(SessionEventPayload::MemoryLedger(self.payload.clone())),
            EventType::Log => Ok(SessionEventPayload::Log(self.payload.clone())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
