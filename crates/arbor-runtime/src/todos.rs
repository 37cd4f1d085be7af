//! Todo manager.
//!
//! Todo lists are event-sourced: every update appends a `todos.updated`
//! event carrying the full replacement list, and the current list is the
//! payload of the latest such event. The backlog is the most recent todo
//! snapshot left behind by ended sessions in the same workspace.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use arbor_events::types::payloads::todo::TodoItem;
use arbor_events::{AppendOptions, EventStore, EventType};

use crate::errors::{Result, RuntimeError};

/// Todo manager over the event store.
pub struct TodoManager {
    store: Arc<EventStore>,
}

impl TodoManager {
    /// Create a new manager.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    /// Replace the session's todo list.
    pub fn update(&self, session_id: &str, todos: &[TodoItem]) -> Result<()> {
        let _ = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::TodosUpdated,
            payload: json!({"todos": todos}),
            parent_id: None,
        })?;
        Ok(())
    }

    /// The session's current todo list (empty when never written).
    pub fn list(&self, session_id: &str) -> Result<Vec<TodoItem>> {
        let events = self
            .store
            .get_events_by_type(session_id, &[EventType::TodosUpdated], None)?;
        let Some(latest) = events.last() else {
            return Ok(Vec::new());
        };
        Ok(parse_todos(latest)?)
    }

    /// Restore the most recent todo snapshot from ended sessions in the same
    /// workspace onto this session. Returns the restored items (empty when
    /// the backlog holds nothing).
    pub fn restore_from_backlog(&self, session_id: &str) -> Result<Vec<TodoItem>> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))?;

        let candidates = self.store.get_workspace_events_by_type(
            &session.workspace_id,
            &[EventType::TodosUpdated],
            None,
        )?;

        // Newest first; pick the first non-empty list from an ended sibling.
        for event in candidates {
            if event.session_id == session_id {
                continue;
            }
            let owner = self.store.get_session(&event.session_id)?;
            if !owner.is_some_and(|s| s.ended()) {
                continue;
            }
            let todos = parse_todos(&event)?;
            if todos.is_empty() {
                continue;
            }
            debug!(
                session_id,
                from = %event.session_id,
                count = todos.len(),
                "restoring todos from backlog"
            );
            self.update(session_id, &todos)?;
            return Ok(todos);
        }

        Ok(Vec::new())
    }
}

fn parse_todos(event: &arbor_events::EventRow) -> Result<Vec<TodoItem>> {
    let payload = event
        .payload_value()
        .map_err(arbor_events::EventStoreError::Serde)?;
    let todos = payload.get("todos").cloned().unwrap_or(json!([]));
    Ok(serde_json::from_value(todos).map_err(arbor_events::EventStoreError::Serde)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, content: &str, status: &str) -> TodoItem {
        TodoItem {
            id: id.into(),
            content: content.into(),
            status: status.into(),
        }
    }

    fn setup() -> (Arc<EventStore>, TodoManager) {
        let store = Arc::new(EventStore::in_memory().unwrap());
        let todos = TodoManager::new(Arc::clone(&store));
        (store, todos)
    }

    fn new_session(store: &EventStore, path: &str) -> String {
        store
            .create_session(&arbor_events::NewSessionOptions {
                model: "model-a",
                provider: "anthropic",
                workspace_path: path,
                working_directory: None,
                parent_session_id: None,
            })
            .unwrap()
            .session
            .id
    }

    #[test]
    fn empty_list_for_fresh_session() {
        let (store, todos) = setup();
        let session = new_session(&store, "/tmp/p");
        assert!(todos.list(&session).unwrap().is_empty());
    }

    #[test]
    fn update_replaces_whole_list() {
        let (store, todos) = setup();
        let session = new_session(&store, "/tmp/p");

        todos
            .update(&session, &[item("t1", "write tests", "pending")])
            .unwrap();
        todos
            .update(
                &session,
                &[
                    item("t1", "write tests", "completed"),
                    item("t2", "refactor", "in_progress"),
                ],
            )
            .unwrap();

        let list = todos.list(&session).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].status, "completed");
        assert_eq!(list[1].content, "refactor");
    }

    #[test]
    fn restore_pulls_from_ended_sibling() {
        let (store, todos) = setup();
        let old = new_session(&store, "/tmp/p");
        todos
            .update(&old, &[item("t1", "leftover work", "pending")])
            .unwrap();
        let _ = store.end_session(&old).unwrap();

        let fresh = new_session(&store, "/tmp/p");
        let restored = todos.restore_from_backlog(&fresh).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].content, "leftover work");
        assert_eq!(todos.list(&fresh).unwrap().len(), 1);
    }

    #[test]
    fn restore_ignores_active_siblings() {
        let (store, todos) = setup();
        let active = new_session(&store, "/tmp/p");
        todos
            .update(&active, &[item("t1", "still mine", "pending")])
            .unwrap();

        let fresh = new_session(&store, "/tmp/p");
        assert!(todos.restore_from_backlog(&fresh).unwrap().is_empty());
    }

    #[test]
    fn restore_ignores_other_workspaces() {
        let (store, todos) = setup();
        let other = new_session(&store, "/tmp/other");
        todos
            .update(&other, &[item("t1", "elsewhere", "pending")])
            .unwrap();
        let _ = store.end_session(&other).unwrap();

        let fresh = new_session(&store, "/tmp/p");
        assert!(todos.restore_from_backlog(&fresh).unwrap().is_empty());
    }
}
