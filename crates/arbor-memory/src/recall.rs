//! Recall — search and typed queries over the session event log.
//!
//! Backed by the event store's FTS index plus structured filters; `add`
//! records a `memory.ledger` event so memories live in the same causally
//! ordered log as everything else.

use std::sync::Arc;

use serde_json::Value;

use arbor_events::{
    AppendOptions, EventRow, EventStore, EventType, SearchOptions, SearchResult,
};

use crate::errors::Result;

/// Filters for recall searches.
#[derive(Clone, Debug, Default)]
pub struct RecallFilters {
    /// Restrict to one workspace.
    pub workspace_id: Option<String>,
    /// Restrict to one session.
    pub session_id: Option<String>,
    /// Restrict to event types.
    pub types: Option<Vec<EventType>>,
    /// Maximum results.
    pub limit: Option<i64>,
}

/// Recall interface over the event store.
pub struct Recall {
    store: Arc<EventStore>,
}

impl Recall {
    /// Create a recall interface.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    /// Full-text search with structured filters.
    pub fn search(&self, query: &str, filters: &RecallFilters) -> Result<Vec<SearchResult>> {
        let opts = SearchOptions {
            workspace_id: filters.workspace_id.as_deref(),
            session_id: filters.session_id.as_deref(),
            types: filters.types.as_deref(),
            limit: filters.limit,
            offset: None,
        };
        Ok(self.store.search_events(query, &opts)?)
    }

    /// Record a memory entry as a `memory.ledger` event on the session.
    pub fn add(&self, session_id: &str, entry: Value) -> Result<EventRow> {
        Ok(self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::MemoryLedger,
            payload: entry,
            parent_id: None,
        })?)
    }

    /// Events of the given types within a session, in sequence order.
    pub fn events_by_type(
        &self,
        session_id: &str,
        types: &[EventType],
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        Ok(self.store.get_events_by_type(session_id, types, limit)?)
    }

    /// Events belonging to one conversation turn.
    pub fn events_by_turn(&self, session_id: &str, turn: i64) -> Result<Vec<EventRow>> {
        let events = self
            .store
            .get_events_by_session(session_id, &arbor_events::ListEventsOptions::default())?;
        Ok(events.into_iter().filter(|e| e.turn == Some(turn)).collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (Arc<EventStore>, Recall, String) {
        let store = Arc::new(EventStore::in_memory().unwrap());
        let session = store
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
        let recall = Recall::new(Arc::clone(&store));
        (store, recall, session)
    }

    #[test]
    fn add_appends_ledger_event() {
        let (store, recall, session) = setup();
        let event = recall
            .add(&session, json!({"goal": "remember the scheduler redesign"}))
            .unwrap();
        assert_eq!(event.event_type, "memory.ledger");

        let events = store
            .get_events_by_type(&session, &[EventType::MemoryLedger], None)
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn added_memories_are_searchable() {
        let (_store, recall, session) = setup();
        let _ = recall
            .add(&session, json!({"goal": "migrate the scheduler to tokio"}))
            .unwrap();

        let hits = recall.search("scheduler", &RecallFilters::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event_type, EventType::MemoryLedger);
    }

    #[test]
    fn search_respects_type_filter() {
        let (store, recall, session) = setup();
        let _ = recall.add(&session, json!({"goal": "remember widgets"})).unwrap();
        let _ = store
            .append(&AppendOptions {
                session_id: &session,
                event_type: EventType::MessageUser,
                payload: json!({"content": "widgets everywhere", "turn": 1}),
                parent_id: None,
            })
            .unwrap();

        let hits = recall
            .search(
                "widgets",
                &RecallFilters {
                    types: Some(vec![EventType::MemoryLedger]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event_type, EventType::MemoryLedger);
    }

    #[test]
    fn events_by_turn_filters() {
        let (store, recall, session) = setup();
        for (turn, content) in [(1, "first"), (2, "second")] {
            let _ = store
                .append(&AppendOptions {
                    session_id: &session,
                    event_type: EventType::MessageUser,
                    payload: json!({"content": content, "turn": turn}),
                    parent_id: None,
                })
                .unwrap();
        }

        let turn_two = recall.events_by_turn(&session, 2).unwrap();
        assert_eq!(turn_two.len(), 1);
        assert_eq!(turn_two[0].turn, Some(2));
    }
}
