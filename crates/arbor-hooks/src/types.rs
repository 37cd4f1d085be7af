//! Core types for the hook system.
//!
//! Defines hook points, handler results, and the typed context passed to
//! handlers. All context types use camelCase serde renaming so they can be
//! logged and shipped to clients unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle hook point.
///
/// Hooks fire at specific moments in the agent's execution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPoint {
    /// Before a tool is executed. A `block` result vetoes the call.
    PreToolUse,
    /// After a tool has executed.
    PostToolUse,
    /// When the agent stops.
    Stop,
    /// When a subagent stops.
    SubagentStop,
    /// When a session starts.
    SessionStart,
    /// When a session ends.
    SessionEnd,
    /// When a user submits a prompt. A `modify` result rewrites the prompt.
    UserPromptSubmit,
    /// Before context compaction.
    PreCompact,
    /// Notification event.
    Notification,
}

impl HookPoint {
    /// Returns all hook point variants.
    #[must_use]
    pub fn all() -> &'static [HookPoint] {
        &[
            Self::PreToolUse,
            Self::PostToolUse,
            Self::Stop,
            Self::SubagentStop,
            Self::SessionStart,
            Self::SessionEnd,
            Self::UserPromptSubmit,
            Self::PreCompact,
            Self::Notification,
        ]
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::PreCompact => "PreCompact",
            Self::Notification => "Notification",
        };
        f.write_str(s)
    }
}

/// Action a hook handler can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    /// Continue execution normally.
    Continue,
    /// Block the guarded operation.
    Block,
    /// Modify the operation with provided modifications.
    Modify,
}

/// Result returned by a hook handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResult {
    /// Action to take.
    pub action: HookAction,
    /// Reason for the action (set for `Block`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Message to display or log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Modifications to apply (for `Modify`). Keys are context field names
    /// in camelCase (e.g. `toolArguments`, `prompt`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifications: Option<Value>,
}

impl HookResult {
    /// Create a `Continue` result.
    #[must_use]
    pub fn continue_() -> Self {
        Self {
            action: HookAction::Continue,
            reason: None,
            message: None,
            modifications: None,
        }
    }

    /// Create a `Continue` result with a message.
    #[must_use]
    pub fn continue_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::continue_()
        }
    }

    /// Create a `Block` result with a reason.
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: HookAction::Block,
            reason: Some(reason.into()),
            message: None,
            modifications: None,
        }
    }

    /// Create a `Modify` result with modifications.
    #[must_use]
    pub fn modify(modifications: Value) -> Self {
        Self {
            action: HookAction::Modify,
            reason: None,
            message: None,
            modifications: Some(modifications),
        }
    }

    /// Whether this result blocks the operation.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.action == HookAction::Block
    }
}

/// Hook context — one variant per [`HookPoint`].
///
/// Passed to handlers so they can inspect and act on the current lifecycle
/// moment. Every variant includes `session_id` and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hookPoint")]
pub enum HookContext {
    /// Context for [`HookPoint::PreToolUse`].
    #[serde(rename_all = "camelCase")]
    PreToolUse {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Tool being invoked.
        tool_name: String,
        /// Arguments passed to the tool.
        tool_arguments: Value,
        /// Unique ID for this tool call.
        tool_call_id: String,
    },
    /// Context for [`HookPoint::PostToolUse`].
    #[serde(rename_all = "camelCase")]
    PostToolUse {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Tool that was invoked.
        tool_name: String,
        /// Unique ID for this tool call.
        tool_call_id: String,
        /// Serialized tool result.
        result: Value,
        /// How long the tool call took.
        duration_ms: u64,
    },
    /// Context for [`HookPoint::Stop`].
    #[serde(rename_all = "camelCase")]
    Stop {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Why the agent is stopping.
        stop_reason: String,
        /// Last message from the agent.
        final_message: Option<String>,
    },
    /// Context for [`HookPoint::SubagentStop`].
    #[serde(rename_all = "camelCase")]
    SubagentStop {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Subagent session ID.
        subagent_id: String,
        /// Why the subagent stopped.
        stop_reason: String,
        /// Result from the subagent.
        result: Option<Value>,
    },
    /// Context for [`HookPoint::SessionStart`].
    #[serde(rename_all = "camelCase")]
    SessionStart {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Working directory for the session.
        working_directory: String,
        /// Workspace the session belongs to.
        workspace_id: String,
    },
    /// Context for [`HookPoint::SessionEnd`].
    #[serde(rename_all = "camelCase")]
    SessionEnd {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Number of messages in the session.
        message_count: u64,
        /// Number of tool calls in the session.
        tool_call_count: u64,
    },
    /// Context for [`HookPoint::UserPromptSubmit`].
    #[serde(rename_all = "camelCase")]
    UserPromptSubmit {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// The user's prompt text.
        prompt: String,
    },
    /// Context for [`HookPoint::PreCompact`].
    #[serde(rename_all = "camelCase")]
    PreCompact {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Current token usage.
        current_tokens: u64,
        /// Target token usage after compaction.
        target_tokens: u64,
    },
    /// Context for [`HookPoint::Notification`].
    #[serde(rename_all = "camelCase")]
    Notification {
        /// Session this hook fires in.
        session_id: String,
        /// ISO 8601 timestamp.
        timestamp: String,
        /// Notification severity level.
        level: String,
        /// Notification title.
        title: String,
        /// Optional notification body.
        body: Option<String>,
    },
}

impl HookContext {
    /// Get the [`HookPoint`] for this context.
    #[must_use]
    pub fn hook_point(&self) -> HookPoint {
        match self {
            Self::PreToolUse { .. } => HookPoint::PreToolUse,
            Self::PostToolUse { .. } => HookPoint::PostToolUse,
            Self::Stop { .. } => HookPoint::Stop,
            Self::SubagentStop { .. } => HookPoint::SubagentStop,
            Self::SessionStart { .. } => HookPoint::SessionStart,
            Self::SessionEnd { .. } => HookPoint::SessionEnd,
            Self::UserPromptSubmit { .. } => HookPoint::UserPromptSubmit,
            Self::PreCompact { .. } => HookPoint::PreCompact,
            Self::Notification { .. } => HookPoint::Notification,
        }
    }

    /// Get the session ID from any context variant.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::PreToolUse { session_id, .. }
            | Self::PostToolUse { session_id, .. }
            | Self::Stop { session_id, .. }
            | Self::SubagentStop { session_id, .. }
            | Self::SessionStart { session_id, .. }
            | Self::SessionEnd { session_id, .. }
            | Self::UserPromptSubmit { session_id, .. }
            | Self::PreCompact { session_id, .. }
            | Self::Notification { session_id, .. } => session_id,
        }
    }

    /// Apply `modify` modifications to this context.
    ///
    /// Keys name camelCase context fields (`toolArguments`, `prompt`, …) and
    /// replace the corresponding values. Unknown keys are ignored; the
    /// discriminator cannot be overridden.
    pub fn apply_modifications(&mut self, modifications: &Value) -> crate::errors::Result<()> {
        let Some(overlay) = modifications.as_object() else {
            return Ok(());
        };
        let mut serialized = serde_json::to_value(&*self)?;
        if let Some(map) = serialized.as_object_mut() {
            for (key, value) in overlay {
                if key == "hookPoint" {
                    continue;
                }
                if map.contains_key(key) {
                    let _ = map.insert(key.clone(), value.clone());
                }
            }
        }
        *self = serde_json::from_value(serialized)?;
        Ok(())
    }
}

/// Information about a registered hook (for listing/inspection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookInfo {
    /// Hook name.
    pub name: String,
    /// Hook point.
    pub hook_point: HookPoint,
    /// Execution priority (higher runs first).
    pub priority: i32,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional timeout in milliseconds (none = unbounded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}
