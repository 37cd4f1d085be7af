//! Automatic handoff creation at session end.
//!
//! A `SessionEnd` hook that writes a handoff when the ended session carried a
//! real conversation (at least `min_messages` messages). Failures are logged
//! and swallowed — memory is observability, not a correctness gate for
//! session teardown.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use arbor_events::{EventStore, EventType};
use arbor_hooks::{HookContext, HookError, HookHandler, HookPoint, HookResult};

use crate::handoff::{CodeChange, HandoffStore, NewHandoff};

/// Default minimum message count before a handoff is worth writing.
pub const DEFAULT_MIN_MESSAGES: u64 = 4;

/// `SessionEnd` hook creating handoffs automatically.
pub struct SessionEndHandoffHook {
    store: Arc<EventStore>,
    handoffs: Arc<HandoffStore>,
    min_messages: u64,
}

impl SessionEndHandoffHook {
    /// Create the hook with the default message threshold.
    #[must_use]
    pub fn new(store: Arc<EventStore>, handoffs: Arc<HandoffStore>) -> Self {
        Self::with_min_messages(store, handoffs, DEFAULT_MIN_MESSAGES)
    }

    /// Create the hook with a custom message threshold.
    #[must_use]
    pub fn with_min_messages(
        store: Arc<EventStore>,
        handoffs: Arc<HandoffStore>,
        min_messages: u64,
    ) -> Self {
        Self {
            store,
            handoffs,
            min_messages,
        }
    }

    /// Build a handoff from the session's event log.
    fn build_handoff(&self, session_id: &str) -> Option<NewHandoff> {
        let session = self.store.get_session(session_id).ok()??;

        let messages = self
            .store
            .get_events_by_type(
                session_id,
                &[EventType::MessageUser, EventType::MessageAssistant],
                None,
            )
            .ok()?;

        let first_ask = messages
            .iter()
            .find(|e| e.event_type == "message.user")
            .and_then(|e| e.payload_value().ok())
            .and_then(|p| p.get("content").and_then(Value::as_str).map(truncate))
            .unwrap_or_else(|| "(no prompt recorded)".into());

        let last_reply = messages
            .iter()
            .rev()
            .find(|e| e.event_type == "message.assistant")
            .and_then(|e| e.payload_value().ok())
            .map(|p| assistant_text(&p))
            .filter(|t| !t.is_empty())
            .map(|t| truncate(&t));

        // Files touched by file-writing tools become code-change entries.
        let tool_calls = self
            .store
            .get_events_by_type(session_id, &[EventType::ToolCall], None)
            .ok()?;
        let mut code_changes = Vec::new();
        for call in &tool_calls {
            let Ok(payload) = call.payload_value() else {
                continue;
            };
            let name = payload.get("name").and_then(Value::as_str).unwrap_or("");
            if !matches!(name, "write" | "edit") {
                continue;
            }
            if let Some(path) = payload
                .get("arguments")
                .and_then(|a| a.get("path"))
                .and_then(Value::as_str)
            {
                if !code_changes.iter().any(|c: &CodeChange| c.file == path) {
                    code_changes.push(CodeChange {
                        file: path.to_string(),
                        description: format!("{name} via {}", call.tool_name.as_deref().unwrap_or(name)),
                    });
                }
            }
        }

        Some(NewHandoff {
            session_id: session_id.to_string(),
            summary: format!(
                "{} message conversation in {}: {first_ask}",
                session.message_count, session.working_directory
            ),
            code_changes,
            current_state: last_reply.unwrap_or_else(|| "session ended without a reply".into()),
            blockers: Vec::new(),
            next_steps: Vec::new(),
            patterns: Vec::new(),
            working_directory: Some(session.working_directory),
        })
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 240;
    if s.len() <= MAX {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}…", &s[..cut])
    }
}

fn assistant_text(payload: &Value) -> String {
    match payload.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

#[async_trait]
impl HookHandler for SessionEndHandoffHook {
    fn name(&self) -> &str {
        "auto-handoff"
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::SessionEnd
    }

    fn description(&self) -> Option<&str> {
        Some("Writes a searchable handoff summary when a session ends")
    }

    fn should_handle(&self, context: &HookContext) -> bool {
        matches!(
            context,
            HookContext::SessionEnd { message_count, .. } if *message_count >= self.min_messages
        )
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let HookContext::SessionEnd { session_id, .. } = context else {
            return Ok(HookResult::continue_());
        };

        match self.build_handoff(session_id) {
            Some(input) => match self.handoffs.create(&input) {
                Ok(record) => {
                    debug!(session_id, handoff_id = %record.id, "handoff created");
                }
                Err(e) => {
                    warn!(session_id, error = %e, "handoff creation failed");
                }
            },
            None => {
                warn!(session_id, "could not assemble handoff from event log");
            }
        }
        Ok(HookResult::continue_())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_events::AppendOptions;
    use serde_json::json;

    struct Fixture {
        store: Arc<EventStore>,
        handoffs: Arc<HandoffStore>,
        session_id: String,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(EventStore::in_memory().unwrap());
        let handoffs = Arc::new(HandoffStore::in_memory().unwrap());
        let session_id = store
            .create_session(&arbor_events::NewSessionOptions {
                model: "model-a",
                provider: "anthropic",
                workspace_path: "/tmp/project",
                working_directory: None,
                parent_session_id: None,
            })
            .unwrap()
            .session
            .id;
        Fixture { store, handoffs, session_id }
    }

    fn seed_messages(fx: &Fixture, count: usize) {
        for i in 0..count {
            let (event_type, payload) = if i % 2 == 0 {
                (
                    EventType::MessageUser,
                    json!({"content": format!("question {i}"), "turn": i / 2 + 1}),
                )
            } else {
                (
                    EventType::MessageAssistant,
                    json!({
                        "content": [{"type": "text", "text": format!("answer {i}")}],
                        "turn": i / 2 + 1,
                        "tokenUsage": {"inputTokens": 1, "outputTokens": 1},
                        "stopReason": "end_turn",
                        "model": "model-a"
                    }),
                )
            };
            let _ = fx
                .store
                .append(&AppendOptions {
                    session_id: &fx.session_id,
                    event_type,
                    payload,
                    parent_id: None,
                })
                .unwrap();
        }
    }

    fn end_context(fx: &Fixture, message_count: u64) -> HookContext {
        HookContext::SessionEnd {
            session_id: fx.session_id.clone(),
            timestamp: arbor_core::now_iso(),
            message_count,
            tool_call_count: 0,
        }
    }

    #[tokio::test]
    async fn creates_handoff_for_substantial_session() {
        let fx = fixture();
        seed_messages(&fx, 4);
        let hook = SessionEndHandoffHook::new(Arc::clone(&fx.store), Arc::clone(&fx.handoffs));

        assert!(hook.should_handle(&end_context(&fx, 4)));
        let result = hook.handle(&end_context(&fx, 4)).await.unwrap();
        assert!(!result.is_blocked());

        let recent = fx.handoffs.list_recent(None, 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].session_id, fx.session_id);
        assert!(recent[0].summary.contains("question 0"));
        assert!(recent[0].current_state.contains("answer 3"));
    }

    #[tokio::test]
    async fn skips_short_sessions() {
        let fx = fixture();
        seed_messages(&fx, 2);
        let hook = SessionEndHandoffHook::new(Arc::clone(&fx.store), Arc::clone(&fx.handoffs));

        assert!(!hook.should_handle(&end_context(&fx, 2)));
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let fx = fixture();
        let hook = SessionEndHandoffHook::with_min_messages(
            Arc::clone(&fx.store),
            Arc::clone(&fx.handoffs),
            1,
        );
        assert!(hook.should_handle(&end_context(&fx, 1)));
    }

    #[tokio::test]
    async fn file_writes_become_code_changes() {
        let fx = fixture();
        seed_messages(&fx, 4);
        let _ = fx
            .store
            .append(&AppendOptions {
                session_id: &fx.session_id,
                event_type: EventType::ToolCall,
                payload: json!({
                    "toolCallId": "tc_1",
                    "name": "write",
                    "arguments": {"path": "src/lib.rs", "content": "..."}
                }),
                parent_id: None,
            })
            .unwrap();

        let hook = SessionEndHandoffHook::new(Arc::clone(&fx.store), Arc::clone(&fx.handoffs));
        let _ = hook.handle(&end_context(&fx, 4)).await.unwrap();

        let recent = fx.handoffs.list_recent(None, 10).unwrap();
        assert_eq!(recent[0].code_changes.len(), 1);
        assert_eq!(recent[0].code_changes[0].file, "src/lib.rs");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate(&long);
        assert!(out.ends_with('…'));
        assert!(out.len() <= 244);
    }
}
