//! Message materialization from the event log.
//!
//! A session's conversation view is derived, never stored: walk the events in
//! sequence order, collect message events, and apply `session.rewind` events
//! by dropping the message events they name. The log itself is untouched.

use serde_json::Value;

use arbor_events::{EventRow, EventStore, ListEventsOptions};

use crate::errors::Result;

/// One materialized conversation message.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Event the message came from.
    pub event_id: String,
    /// `user` or `assistant`.
    pub role: String,
    /// Message content (string for user, block array for assistant).
    pub content: Value,
    /// Conversation turn.
    pub turn: i64,
}

/// Materialize the ordered message list for a session.
pub fn materialize_messages(store: &EventStore, session_id: &str) -> Result<Vec<Message>> {
    let events = store.get_events_by_session(session_id, &ListEventsOptions::default())?;
    Ok(apply_events(&events))
}

fn apply_events(events: &[EventRow]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();

    for event in events {
        let Ok(payload) = event.payload_value() else {
            continue;
        };
        match event.event_type.as_str() {
            "message.user" => messages.push(Message {
                event_id: event.id.clone(),
                role: "user".into(),
                content: payload.get("content").cloned().unwrap_or(Value::Null),
                turn: payload.get("turn").and_then(Value::as_i64).unwrap_or(0),
            }),
            "message.assistant" => messages.push(Message {
                event_id: event.id.clone(),
                role: "assistant".into(),
                content: payload.get("content").cloned().unwrap_or(Value::Null),
                turn: payload.get("turn").and_then(Value::as_i64).unwrap_or(0),
            }),
            "session.rewind" => {
                if let Some(removed) = payload.get("removedEventIds").and_then(Value::as_array) {
                    let removed: Vec<&str> =
                        removed.iter().filter_map(Value::as_str).collect();
                    messages.retain(|m| !removed.contains(&m.event_id.as_str()));
                }
            }
            _ => {}
        }
    }

    messages
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
