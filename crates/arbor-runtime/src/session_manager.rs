//! Session manager — create, get, list, message appends, end, fork, rewind,
//! model switch.
//!
//! Sits above the raw event store: every mutation is an event append (with
//! counters maintained in the same transaction by the store), and the
//! conversation view is materialized from the log on demand.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, instrument};

use arbor_events::types::payloads::message::{ContentBlock, TokenUsage};
use arbor_events::{
    AppendOptions, EventRow, EventStore, EventType, ListSessionsOptions, NewSessionOptions,
    SessionRow,
};

use crate::errors::{Result, RuntimeError};
use crate::reconstruct::{Message, materialize_messages};

/// A session together with its materialized messages.
#[derive(Clone, Debug)]
pub struct SessionView {
    /// The session row.
    pub session: SessionRow,
    /// Conversation messages in order.
    pub messages: Vec<Message>,
}

/// Result of forking a session.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkResult {
    /// The new (child) session id.
    pub new_session_id: String,
    /// The source session id.
    pub forked_from: String,
    /// Number of messages replayed onto the child.
    pub message_count: usize,
}

/// Result of rewinding a session.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewindResult {
    /// The rewound session id.
    pub session_id: String,
    /// Messages remaining after the rewind.
    pub new_message_count: usize,
    /// Messages logically removed.
    pub removed_count: usize,
}

/// An assistant message to append (the manager assigns the turn).
#[derive(Clone, Debug)]
pub struct NewAssistantMessage {
    /// Content blocks.
    pub content: Vec<ContentBlock>,
    /// Token accounting.
    pub token_usage: TokenUsage,
    /// Why the model stopped.
    pub stop_reason: String,
    /// Model that produced the message.
    pub model: String,
}

/// Filter for listing sessions.
#[derive(Clone, Debug, Default)]
pub struct SessionFilter {
    /// Filter by workspace id.
    pub workspace_id: Option<String>,
    /// Filter by ended state.
    pub ended: Option<bool>,
    /// Maximum results.
    pub limit: Option<i64>,
}

/// Session manager over the event store.
pub struct SessionManager {
    store: Arc<EventStore>,
    /// Current turn per active session, lazily derived from the log.
    turns: DashMap<String, i64>,
}

impl SessionManager {
    /// Create a new manager.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        Self {
            store,
            turns: DashMap::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Create a new session in the given workspace.
    #[instrument(skip(self))]
    pub fn create(&self, model: &str, provider: &str, workspace_path: &str) -> Result<SessionRow> {
        let result = self.store.create_session(&NewSessionOptions {
            model,
            provider,
            workspace_path,
            working_directory: None,
            parent_session_id: None,
        })?;
        debug!(session_id = %result.session.id, "session created");
        Ok(result.session)
    }

    /// Get a session with its materialized conversation.
    pub fn get(&self, session_id: &str) -> Result<SessionView> {
        let session = self.require_session(session_id)?;
        let messages = materialize_messages(&self.store, session_id)?;
        Ok(SessionView { session, messages })
    }

    /// List sessions.
    pub fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRow>> {
        Ok(self.store.list_sessions(&ListSessionsOptions {
            workspace_id: filter.workspace_id.as_deref(),
            ended: filter.ended,
            limit: filter.limit,
            offset: None,
        })?)
    }

    /// Append a user message. Opens a new turn.
    pub fn add_user_message(&self, session_id: &str, content: &str) -> Result<EventRow> {
        let session = self.require_active(session_id)?;
        let turn = self.next_turn(&session)?;
        let event = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::MessageUser,
            payload: json!({"content": content, "turn": turn}),
            parent_id: None,
        })?;
        let _ = self.turns.insert(session_id.to_string(), turn);
        Ok(event)
    }

    /// Append an assistant message on the current turn.
    pub fn add_assistant_message(
        &self,
        session_id: &str,
        message: &NewAssistantMessage,
    ) -> Result<EventRow> {
        let session = self.require_active(session_id)?;
        let turn = self.current_turn(&session)?;
        let payload = json!({
            "content": message.content,
            "turn": turn,
            "tokenUsage": message.token_usage,
            "stopReason": message.stop_reason,
            "model": message.model,
        });
        Ok(self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::MessageAssistant,
            payload,
            parent_id: None,
        })?)
    }

    /// Append a tool call on the current turn.
    pub fn add_tool_call(
        &self,
        session_id: &str,
        tool_call_id: &str,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<EventRow> {
        let session = self.require_active(session_id)?;
        let turn = self.current_turn(&session)?;
        Ok(self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::ToolCall,
            payload: json!({
                "toolCallId": tool_call_id,
                "name": name,
                "arguments": arguments,
                "turn": turn,
            }),
            parent_id: None,
        })?)
    }

    /// Append a tool result on the current turn.
    pub fn add_tool_result(
        &self,
        session_id: &str,
        tool_call_id: &str,
        result: serde_json::Value,
        is_error: bool,
        duration_ms: u64,
    ) -> Result<EventRow> {
        let _ = self.require_active(session_id)?;
        Ok(self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::ToolResult,
            payload: json!({
                "toolCallId": tool_call_id,
                "result": result,
                "isError": is_error,
                "duration": duration_ms,
            }),
            parent_id: None,
        })?)
    }

    /// End a session: append `session.end` and flip the ended flag.
    #[instrument(skip(self))]
    pub fn end(&self, session_id: &str, reason: &str) -> Result<()> {
        let _ = self.require_session(session_id)?;
        let _ = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::SessionEnd,
            payload: json!({"reason": reason}),
            parent_id: None,
        })?;
        let _ = self.store.end_session(session_id)?;
        let _ = self.turns.remove(session_id);
        Ok(())
    }

    /// Reactivate an ended session.
    pub fn resume(&self, session_id: &str) -> Result<SessionView> {
        let _ = self.require_session(session_id)?;
        let _ = self.store.clear_session_ended(session_id)?;
        self.get(session_id)
    }

    /// Delete a session entirely.
    pub fn delete(&self, session_id: &str) -> Result<bool> {
        let _ = self.turns.remove(session_id);
        Ok(self.store.delete_session(session_id)?)
    }

    /// Fork a session at a message index.
    ///
    /// Takes the first `from_message_index` messages of the source (all when
    /// omitted), creates a child session with `parent_session_id` set, and
    /// replays those messages as fresh events on the child — roles and
    /// content preserved, history physically independent.
    #[instrument(skip(self))]
    pub fn fork(&self, session_id: &str, from_message_index: Option<usize>) -> Result<ForkResult> {
        let source = self.require_session(session_id)?;
        let messages = materialize_messages(&self.store, session_id)?;
        let keep = from_message_index.unwrap_or(messages.len()).min(messages.len());
        let replay = &messages[..keep];

        let workspace = self
            .store
            .get_workspace(&source.workspace_id)?
            .ok_or_else(|| {
                RuntimeError::InvalidOperation(format!(
                    "workspace {} missing for session {session_id}",
                    source.workspace_id
                ))
            })?;

        let child = self.store.create_session(&NewSessionOptions {
            model: &source.model,
            provider: &source.provider,
            workspace_path: &workspace.path,
            working_directory: Some(&source.working_directory),
            parent_session_id: Some(session_id),
        })?;

        let _ = self.store.append(&AppendOptions {
            session_id: &child.session.id,
            event_type: EventType::SessionFork,
            payload: json!({
                "sourceSessionId": session_id,
                "messageCount": keep as i64,
            }),
            parent_id: None,
        })?;

        for message in replay {
            let event_type = if message.role == "user" {
                EventType::MessageUser
            } else {
                EventType::MessageAssistant
            };
            let _ = self.store.append(&AppendOptions {
                session_id: &child.session.id,
                event_type,
                payload: json!({
                    "content": message.content,
                    "turn": message.turn,
                }),
                parent_id: None,
            })?;
        }

        debug!(
            source = session_id,
            child = %child.session.id,
            replayed = keep,
            "session forked"
        );
        Ok(ForkResult {
            new_session_id: child.session.id,
            forked_from: session_id.to_string(),
            message_count: keep,
        })
    }

    /// Rewind a session so only messages `0..=to_message_index` remain.
    ///
    /// Removal is logical: a compensating `session.rewind` event names the
    /// dropped message events and the head pointer moves back to the last
    /// retained message. The log is never truncated. Rewinding to an index at
    /// or past the end is a no-op with `removed_count = 0`.
    #[instrument(skip(self))]
    pub fn rewind(&self, session_id: &str, to_message_index: usize) -> Result<RewindResult> {
        let _ = self.require_session(session_id)?;
        let messages = materialize_messages(&self.store, session_id)?;

        if to_message_index + 1 >= messages.len() {
            return Ok(RewindResult {
                session_id: session_id.to_string(),
                new_message_count: messages.len(),
                removed_count: 0,
            });
        }

        let retained = &messages[..=to_message_index];
        let removed: Vec<String> = messages[to_message_index + 1..]
            .iter()
            .map(|m| m.event_id.clone())
            .collect();
        let removed_count = removed.len();

        let _ = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::SessionRewind,
            payload: json!({
                "toMessageIndex": to_message_index as i64,
                "removedEventIds": removed,
                "removedCount": removed_count as i64,
            }),
            parent_id: None,
        })?;

        // Future appends chain from the last retained message.
        let last_retained = &retained[retained.len() - 1].event_id;
        let _ = self.store.update_session_head(session_id, last_retained)?;

        let _ = self.turns.remove(session_id);
        Ok(RewindResult {
            session_id: session_id.to_string(),
            new_message_count: retained.len(),
            removed_count,
        })
    }

    /// Switch the session's model, recording a `config.model_switch` event.
    pub fn switch_model(&self, session_id: &str, model: &str) -> Result<()> {
        let session = self.require_active(session_id)?;
        if session.model == model {
            return Ok(());
        }
        let _ = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::ConfigModelSwitch,
            payload: json!({"fromModel": session.model, "toModel": model}),
            parent_id: None,
        })?;
        let _ = self.store.update_session_model(session_id, model)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────

    fn require_session(&self, session_id: &str) -> Result<SessionRow> {
        self.store
            .get_session(session_id)?
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))
    }

    fn require_active(&self, session_id: &str) -> Result<SessionRow> {
        let session = self.require_session(session_id)?;
        if session.ended() {
            return Err(RuntimeError::SessionEnded(session_id.to_string()));
        }
        Ok(session)
    }

    /// Turn a new user message opens: user messages so far + 1.
    fn next_turn(&self, session: &SessionRow) -> Result<i64> {
        let users = self
            .store
            .get_events_by_type(&session.id, &[EventType::MessageUser], None)?;
        Ok(users.len() as i64 + 1)
    }

    /// Turn the conversation is currently on.
    fn current_turn(&self, session: &SessionRow) -> Result<i64> {
        if let Some(turn) = self.turns.get(&session.id) {
            return Ok(*turn);
        }
        let users = self
            .store
            .get_events_by_type(&session.id, &[EventType::MessageUser], None)?;
        Ok((users.len() as i64).max(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn setup() -> SessionManager {
        SessionManager::new(Arc::new(EventStore::in_memory().unwrap()))
    }

    fn assistant(text: &str) -> NewAssistantMessage {
        NewAssistantMessage {
            content: vec![ContentBlock {
                block_type: "text".into(),
                text: Some(text.into()),
                extra: serde_json::Map::new(),
            }],
            token_usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                cache_read_tokens: None,
                cache_creation_tokens: None,
            },
            stop_reason: "end_turn".into(),
            model: "model-a".into(),
        }
    }

    fn seed_conversation(mgr: &SessionManager, turns: &[(&str, &str)]) -> String {
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        for (user, reply) in turns {
            let _ = mgr.add_user_message(&session.id, user).unwrap();
            let _ = mgr.add_assistant_message(&session.id, &assistant(reply)).unwrap();
        }
        session.id
    }

    #[test]
    fn create_and_get() {
        let mgr = setup();
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        let view = mgr.get(&session.id).unwrap();
        assert!(view.messages.is_empty());
        assert_eq!(view.session.model, "model-a");
    }

    #[test]
    fn get_missing_session() {
        let mgr = setup();
        let err = mgr.get("sess_missing").unwrap_err();
        assert_matches!(err, RuntimeError::SessionNotFound(_));
    }

    #[test]
    fn messages_carry_turns() {
        let mgr = setup();
        let id = seed_conversation(&mgr, &[("q1", "a1"), ("q2", "a2")]);
        let view = mgr.get(&id).unwrap();
        assert_eq!(view.messages.len(), 4);
        assert_eq!(view.messages[0].turn, 1);
        assert_eq!(view.messages[1].turn, 1);
        assert_eq!(view.messages[2].turn, 2);
        assert_eq!(view.messages[3].turn, 2);
        assert_eq!(view.session.message_count, 4);
    }

    #[test]
    fn tool_events_do_not_appear_as_messages() {
        let mgr = setup();
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        let _ = mgr.add_user_message(&session.id, "run ls").unwrap();
        let _ = mgr
            .add_tool_call(&session.id, "tc_1", "bash", json!({"command": "ls"}))
            .unwrap();
        let _ = mgr
            .add_tool_result(&session.id, "tc_1", json!("file.txt"), false, 12)
            .unwrap();

        let view = mgr.get(&session.id).unwrap();
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.session.event_count, 4);
    }

    #[test]
    fn end_blocks_further_messages() {
        let mgr = setup();
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        mgr.end(&session.id, "completed").unwrap();

        assert!(mgr.get(&session.id).unwrap().session.ended());
        let err = mgr.add_user_message(&session.id, "too late").unwrap_err();
        assert_matches!(err, RuntimeError::SessionEnded(_));
    }

    #[test]
    fn resume_reactivates() {
        let mgr = setup();
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        mgr.end(&session.id, "completed").unwrap();
        let view = mgr.resume(&session.id).unwrap();
        assert!(!view.session.ended());
        let _ = mgr.add_user_message(&session.id, "back again").unwrap();
    }

    // ── Fork (spec scenario: fork and diverge) ────────────────────────

    #[test]
    fn fork_takes_first_n_messages() {
        let mgr = setup();
        // Messages: [u1, a1, u2, a2, u3]
        let id = seed_conversation(&mgr, &[("u1", "a1"), ("u2", "a2")]);
        let _ = mgr.add_user_message(&id, "u3").unwrap();

        let fork = mgr.fork(&id, Some(3)).unwrap();
        assert_eq!(fork.message_count, 3);
        assert_eq!(fork.forked_from, id);

        let view = mgr.get(&fork.new_session_id).unwrap();
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[0].content, json!("u1"));
        assert_eq!(view.messages[1].role, "assistant");
        assert_eq!(view.messages[2].content, json!("u2"));
        assert_eq!(view.session.parent_session_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn fork_without_index_takes_all() {
        let mgr = setup();
        let id = seed_conversation(&mgr, &[("u1", "a1")]);
        let fork = mgr.fork(&id, None).unwrap();
        assert_eq!(fork.message_count, 2);
        let view = mgr.get(&fork.new_session_id).unwrap();
        assert_eq!(view.messages.len(), 2);
    }

    #[test]
    fn fork_diverges_independently() {
        let mgr = setup();
        let id = seed_conversation(&mgr, &[("u1", "a1")]);
        let fork = mgr.fork(&id, Some(1)).unwrap();

        let _ = mgr
            .add_assistant_message(&fork.new_session_id, &assistant("alternative"))
            .unwrap();

        assert_eq!(mgr.get(&id).unwrap().messages.len(), 2);
        assert_eq!(mgr.get(&fork.new_session_id).unwrap().messages.len(), 2);
    }

    // ── Rewind ────────────────────────────────────────────────────────

    #[test]
    fn rewind_drops_tail_messages() {
        let mgr = setup();
        let id = seed_conversation(&mgr, &[("u1", "a1"), ("u2", "a2")]);

        let result = mgr.rewind(&id, 1).unwrap();
        assert_eq!(result.removed_count, 2);
        assert_eq!(result.new_message_count, 2);

        let view = mgr.get(&id).unwrap();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(
            view.session.head_event_id.as_deref(),
            Some(view.messages[1].event_id.as_str())
        );
    }

    #[test]
    fn rewind_past_end_is_noop() {
        let mgr = setup();
        let id = seed_conversation(&mgr, &[("u1", "a1")]);

        let result = mgr.rewind(&id, 5).unwrap();
        assert_eq!(result.removed_count, 0);
        assert_eq!(result.new_message_count, 2);

        // No rewind event was appended.
        let events = mgr
            .store()
            .get_events_by_type(&id, &[EventType::SessionRewind], None)
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn conversation_continues_after_rewind() {
        let mgr = setup();
        let id = seed_conversation(&mgr, &[("u1", "a1"), ("u2", "a2")]);
        let _ = mgr.rewind(&id, 1).unwrap();

        let _ = mgr.add_user_message(&id, "u2 revised").unwrap();
        let view = mgr.get(&id).unwrap();
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[2].content, json!("u2 revised"));
        // The log still holds everything: 1 start + 4 messages + 1 rewind + 1 new.
        assert_eq!(view.session.event_count, 7);
    }

    // ── Model switch ──────────────────────────────────────────────────

    #[test]
    fn switch_model_records_event() {
        let mgr = setup();
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        mgr.switch_model(&session.id, "model-b").unwrap();

        let view = mgr.get(&session.id).unwrap();
        assert_eq!(view.session.model, "model-b");

        let events = mgr
            .store()
            .get_events_by_type(&session.id, &[EventType::ConfigModelSwitch], None)
            .unwrap();
        assert_eq!(events.len(), 1);
        let payload = events[0].payload_value().unwrap();
        assert_eq!(payload["fromModel"], "model-a");
        assert_eq!(payload["toModel"], "model-b");
    }

    #[test]
    fn switch_to_same_model_is_noop() {
        let mgr = setup();
        let session = mgr.create("model-a", "anthropic", "/tmp/project").unwrap();
        mgr.switch_model(&session.id, "model-a").unwrap();
        let events = mgr
            .store()
            .get_events_by_type(&session.id, &[EventType::ConfigModelSwitch], None)
            .unwrap();
        assert!(events.is_empty());
    }
}
