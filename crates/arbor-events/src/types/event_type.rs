//! The [`EventType`] enum — all session event type discriminators.
//!
//! Every variant has an exact `#[serde(rename)]` matching the wire string
//! literal (e.g., `"session.start"`). Domain helper methods replace
//! stringly-typed guards with compile-time exhaustiveness.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// All session event types.
///
/// Each variant serializes to the exact dot-separated string clients expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // -- Session lifecycle --
    /// New session started.
    #[serde(rename = "session.start")]
    SessionStart,
    /// Session ended.
    #[serde(rename = "session.end")]
    SessionEnd,
    /// Session forked from another.
    #[serde(rename = "session.fork")]
    SessionFork,
    /// Messages logically removed by a rewind.
    #[serde(rename = "session.rewind")]
    SessionRewind,

    // -- Messages --
    /// User message.
    #[serde(rename = "message.user")]
    MessageUser,
    /// Assistant (model) message.
    #[serde(rename = "message.assistant")]
    MessageAssistant,

    // -- Tools --
    /// Tool call from the model.
    #[serde(rename = "tool.call")]
    ToolCall,
    /// Tool execution result.
    #[serde(rename = "tool.result")]
    ToolResult,

    // -- Worktree --
    /// Working directory acquired for a session.
    #[serde(rename = "worktree.acquired")]
    WorktreeAcquired,
    /// Working directory released.
    #[serde(rename = "worktree.released")]
    WorktreeReleased,
    /// Commit in an acquired checkout.
    #[serde(rename = "worktree.commit")]
    WorktreeCommit,
    /// Session branch merged back.
    #[serde(rename = "worktree.merged")]
    WorktreeMerged,

    // -- Plan mode --
    /// Plan mode entered.
    #[serde(rename = "plan.mode_entered")]
    PlanModeEntered,
    /// Plan mode exited.
    #[serde(rename = "plan.mode_exited")]
    PlanModeExited,

    // -- Todos --
    /// Todo list replaced.
    #[serde(rename = "todos.updated")]
    TodosUpdated,

    // -- Config --
    /// Model switched.
    #[serde(rename = "config.model_switch")]
    ConfigModelSwitch,

    // -- Memory --
    /// Memory ledger entry recorded.
    #[serde(rename = "memory.ledger")]
    MemoryLedger,

    // -- Diagnostics --
    /// Free-form log line attached to the session.
    #[serde(rename = "log")]
    Log,
}

/// All event type variants in definition order.
pub const ALL_EVENT_TYPES: [EventType; 18] = [
    EventType::SessionStart,
    EventType::SessionEnd,
    EventType::SessionFork,
    EventType::SessionRewind,
    EventType::MessageUser,
    EventType::MessageAssistant,
    EventType::ToolCall,
    EventType::ToolResult,
    EventType::WorktreeAcquired,
    EventType::WorktreeReleased,
    EventType::WorktreeCommit,
    EventType::WorktreeMerged,
    EventType::PlanModeEntered,
    EventType::PlanModeExited,
    EventType::TodosUpdated,
    EventType::ConfigModelSwitch,
    EventType::MemoryLedger,
    EventType::Log,
];

impl EventType {
    /// Return the canonical string representation (e.g., `"session.start"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "session.start",
            Self::SessionEnd => "session.end",
            Self::SessionFork => "session.fork",
            Self::SessionRewind => "session.rewind",
            Self::MessageUser => "message.user",
            Self::MessageAssistant => "message.assistant",
            Self::ToolCall => "tool.call",
            Self::ToolResult => "tool.result",
            Self::WorktreeAcquired => "worktree.acquired",
            Self::WorktreeReleased => "worktree.released",
            Self::WorktreeCommit => "worktree.commit",
            Self::WorktreeMerged => "worktree.merged",
            Self::PlanModeEntered => "plan.mode_entered",
            Self::PlanModeExited => "plan.mode_exited",
            Self::TodosUpdated => "todos.updated",
            Self::ConfigModelSwitch => "config.model_switch",
            Self::MemoryLedger => "memory.ledger",
            Self::Log => "log",
        }
    }

    /// Whether this is a message event (`message.*`).
    #[must_use]
    pub fn is_message_type(self) -> bool {
        matches!(self, Self::MessageUser | Self::MessageAssistant)
    }

    /// Whether this is a tool event (`tool.*`).
    #[must_use]
    pub fn is_tool_type(self) -> bool {
        matches!(self, Self::ToolCall | Self::ToolResult)
    }

    /// Whether this is a worktree event (`worktree.*`).
    #[must_use]
    pub fn is_worktree_type(self) -> bool {
        matches!(
            self,
            Self::WorktreeAcquired
                | Self::WorktreeReleased
                | Self::WorktreeCommit
                | Self::WorktreeMerged
        )
    }

    /// Whether this is a session lifecycle event (`session.*`).
    #[must_use]
    pub fn is_session_type(self) -> bool {
        matches!(
            self,
            Self::SessionStart | Self::SessionEnd | Self::SessionFork | Self::SessionRewind
        )
    }

    /// Whether this is a plan mode event (`plan.*`).
    #[must_use]
    pub fn is_plan_type(self) -> bool {
        matches!(self, Self::PlanModeEntered | Self::PlanModeExited)
    }

    /// The domain prefix (e.g., `"session"`, `"message"`, `"tool"`).
    #[must_use]
    pub fn domain(self) -> &'static str {
        let s = self.as_str();
        s.split('.').next().unwrap_or(s)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Use serde to parse — the `#[serde(rename)]` attributes are the source of truth.
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("unknown event type: {s}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
