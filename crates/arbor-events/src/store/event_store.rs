//! High-level transactional [`EventStore`] API.
//!
//! Composes the repository operations into atomic, session-centric methods.
//! Every write method runs inside a single `SQLite` transaction — callers
//! never observe partial state: a failed append leaves no event row, no FTS
//! row, and no counter change.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::errors::{EventStoreError, Result};
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::sqlite::migrations;
use crate::sqlite::repositories::blob::BlobRepo;
use crate::sqlite::repositories::branch::{BranchRepo, CreateBranchOptions};
use crate::sqlite::repositories::event::{EventRepo, ListEventsOptions};
use crate::sqlite::repositories::search::{SearchOptions, SearchRepo};
use crate::sqlite::repositories::session::{
    CounterDeltas, CreateSessionOptions, ListSessionsOptions, SessionRepo,
};
use crate::sqlite::repositories::workspace::WorkspaceRepo;
use crate::sqlite::row_types::{BlobRow, BranchRow, EventRow, SessionRow, WorkspaceRow};
use crate::types::state::{SearchResult, StoreStats};
use crate::types::{EventType, SessionEvent};

/// Result of creating a new session.
#[derive(Debug)]
pub struct CreateSessionResult {
    /// The created session (head already pointing at the root event).
    pub session: SessionRow,
    /// The root `session.start` event (sequence 0).
    pub root_event: EventRow,
}

/// Options for creating a session.
pub struct NewSessionOptions<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Provider identifier.
    pub provider: &'a str,
    /// Workspace path (workspace is created on demand).
    pub workspace_path: &'a str,
    /// Working directory; defaults to the workspace path.
    pub working_directory: Option<&'a str>,
    /// Parent session (for forks).
    pub parent_session_id: Option<&'a str>,
}

/// Options for appending an event.
pub struct AppendOptions<'a> {
    /// Session to append to.
    pub session_id: &'a str,
    /// Event type.
    pub event_type: EventType,
    /// Event payload (JSON).
    pub payload: Value,
    /// Explicit parent. If `None`, chains from the session head.
    pub parent_id: Option<&'a str>,
}

/// High-level event store wrapping a connection pool and all repositories.
pub struct EventStore {
    pool: ConnectionPool,
}

impl EventStore {
    /// Create a store over an existing pool. Call [`initialize`](Self::initialize)
    /// before first use.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open a file-backed store.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(connection::new_file(path, config)?))
    }

    /// Open an in-memory store (single connection, for tests and tooling).
    pub fn in_memory() -> Result<Self> {
        let config = ConnectionConfig {
            pool_size: 1,
            ..Default::default()
        };
        let store = Self::new(connection::new_in_memory(&config)?);
        store.initialize()?;
        Ok(store)
    }

    /// Apply pending schema migrations. Idempotent — safe to call repeatedly.
    ///
    /// Refuses to open a database recorded at a schema version newer than
    /// this binary supports (`SCHEMA_MISMATCH`).
    pub fn initialize(&self) -> Result<u32> {
        let conn = self.conn()?;
        migrations::run_migrations(&conn)
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside a single transaction.
    ///
    /// All writes performed through the given connection either commit
    /// together or roll back when `f` returns an error.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T>,
    {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a new session with a root `session.start` event at sequence 0.
    ///
    /// Atomic: workspace get-or-create, session insertion, root event
    /// insertion, head pointer update, and counter increments all happen in
    /// one transaction.
    pub fn create_session(&self, opts: &NewSessionOptions<'_>) -> Result<CreateSessionResult> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let ws = WorkspaceRepo::get_or_create(&tx, opts.workspace_path, None)?;
        let working_directory = opts.working_directory.unwrap_or(opts.workspace_path);

        let session = SessionRepo::create(
            &tx,
            &CreateSessionOptions {
                workspace_id: &ws.id,
                model: opts.model,
                provider: opts.provider,
                working_directory,
                parent_session_id: opts.parent_session_id,
            },
        )?;

        let event = SessionEvent {
            id: arbor_core::new_event_id(),
            session_id: session.id.clone(),
            parent_id: None,
            workspace_id: ws.id.clone(),
            timestamp: arbor_core::now_iso(),
            event_type: EventType::SessionStart,
            sequence: 0,
            payload: serde_json::json!({
                "workingDirectory": working_directory,
                "model": opts.model,
                "provider": opts.provider,
            }),
        };
        EventRepo::insert(&tx, &event)?;
        let _ = SearchRepo::index_event(&tx, &event)?;
        let _ = SessionRepo::update_head(&tx, &session.id, &event.id)?;
        let _ = SessionRepo::increment_counters(
            &tx,
            &session.id,
            &CounterDeltas {
                event_count: 1,
                ..Default::default()
            },
        )?;

        tx.commit()?;

        let updated = SessionRepo::get_by_id(&conn, &session.id)?
            .ok_or(EventStoreError::SessionNotFound(session.id))?;
        let root_event = EventRepo::get_by_id(&conn, &event.id)?
            .ok_or(EventStoreError::EventNotFound(event.id))?;

        debug!(session_id = %updated.id, workspace_id = %ws.id, "session created");
        Ok(CreateSessionResult {
            session: updated,
            root_event,
        })
    }

    /// Append an event to a session.
    ///
    /// Atomic: parent validation (same-session, acyclic), sequence allocation
    /// via a locking read, event insertion, FTS indexing, head update, and
    /// counter increments all happen in a single transaction.
    pub fn append(&self, opts: &AppendOptions<'_>) -> Result<EventRow> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let session = SessionRepo::get_by_id(&tx, opts.session_id)?
            .ok_or_else(|| EventStoreError::SessionNotFound(opts.session_id.to_string()))?;

        let event_id = arbor_core::new_event_id();
        let parent_id = match opts.parent_id {
            Some(pid) => Some(pid.to_string()),
            None => session.head_event_id.clone(),
        };
        if let Some(pid) = parent_id.as_deref() {
            validate_parent(&tx, opts.session_id, pid, &event_id)?;
        }

        let sequence = EventRepo::next_sequence(&tx, opts.session_id)?;

        let event = SessionEvent {
            id: event_id,
            session_id: opts.session_id.to_string(),
            parent_id,
            workspace_id: session.workspace_id.clone(),
            timestamp: arbor_core::now_iso(),
            event_type: opts.event_type,
            sequence,
            payload: opts.payload.clone(),
        };

        EventRepo::insert(&tx, &event)?;
        let _ = SearchRepo::index_event(&tx, &event)?;
        let _ = SessionRepo::update_head(&tx, opts.session_id, &event.id)?;

        let mut deltas = CounterDeltas {
            event_count: 1,
            ..Default::default()
        };
        if opts.event_type.is_message_type() {
            deltas.message_count = 1;
        }
        if let Some(tu) = opts.payload.get("tokenUsage") {
            deltas.input_tokens = tu.get("inputTokens").and_then(Value::as_i64).unwrap_or(0);
            deltas.output_tokens = tu.get("outputTokens").and_then(Value::as_i64).unwrap_or(0);
        }
        let _ = SessionRepo::increment_counters(&tx, opts.session_id, &deltas)?;

        tx.commit()?;

        EventRepo::get_by_id(&conn, &event.id)?.ok_or(EventStoreError::EventNotFound(event.id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event retrieval
    // ─────────────────────────────────────────────────────────────────────

    /// Get a single event by ID.
    pub fn get_event(&self, event_id: &str) -> Result<Option<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_by_id(&conn, event_id)
    }

    /// Batch-fetch events by IDs. Missing IDs are silently omitted.
    pub fn get_events_by_ids(
        &self,
        event_ids: &[&str],
    ) -> Result<std::collections::HashMap<String, EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_by_ids(&conn, event_ids)
    }

    /// Get all events for a session, ordered by sequence.
    pub fn get_events_by_session(
        &self,
        session_id: &str,
        opts: &ListEventsOptions,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_by_session(&conn, session_id, opts)
    }

    /// Get events of specific types within a session.
    pub fn get_events_by_type(
        &self,
        session_id: &str,
        types: &[EventType],
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        let type_strs: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        EventRepo::get_by_types(&conn, session_id, &type_strs, limit)
    }

    /// Get events by workspace and types (cross-session), newest first.
    pub fn get_workspace_events_by_type(
        &self,
        workspace_id: &str,
        types: &[EventType],
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        let type_strs: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        EventRepo::get_by_workspace_and_types(&conn, workspace_id, &type_strs, limit)
    }

    /// Get ancestor chain from root to the given event (inclusive).
    pub fn get_ancestors(&self, event_id: &str) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_ancestors(&conn, event_id)
    }

    /// Get direct children of an event.
    pub fn get_children(&self, event_id: &str) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::get_children(&conn, event_id)
    }

    /// Count events in a session.
    pub fn count_events(&self, session_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        EventRepo::count_by_session(&conn, session_id)
    }

    /// Next sequence number for a session (0 when empty).
    pub fn next_sequence(&self, session_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        EventRepo::next_sequence(&conn, session_id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session management
    // ─────────────────────────────────────────────────────────────────────

    /// Get session by ID.
    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::get_by_id(&conn, session_id)
    }

    /// List sessions with filtering.
    pub fn list_sessions(&self, opts: &ListSessionsOptions<'_>) -> Result<Vec<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::list(&conn, opts)
    }

    /// Move the session head to an existing event of the same session.
    pub fn update_session_head(&self, session_id: &str, head_event_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let event = EventRepo::get_by_id(&conn, head_event_id)?
            .ok_or_else(|| EventStoreError::EventNotFound(head_event_id.to_string()))?;
        if event.session_id != session_id {
            return Err(EventStoreError::InvalidOperation(format!(
                "event {head_event_id} belongs to session {}, not {session_id}",
                event.session_id
            )));
        }
        SessionRepo::update_head(&conn, session_id, head_event_id)
    }

    /// Mark a session as ended.
    pub fn end_session(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::mark_ended(&conn, session_id)
    }

    /// Reactivate an ended session.
    pub fn clear_session_ended(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::clear_ended(&conn, session_id)
    }

    /// Update the session's model.
    pub fn update_session_model(&self, session_id: &str, model: &str) -> Result<bool> {
        let conn = self.conn()?;
        SessionRepo::update_model(&conn, session_id, model)
    }

    /// Delete a session with its events, FTS rows, and branches.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let _ = SearchRepo::remove_by_session(&tx, session_id)?;
        let _ = BranchRepo::delete_by_session(&tx, session_id)?;
        let _ = EventRepo::delete_by_session(&tx, session_id)?;
        let deleted = SessionRepo::delete(&tx, session_id)?;
        tx.commit()?;
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Workspace management
    // ─────────────────────────────────────────────────────────────────────

    /// Get workspace by ID.
    pub fn get_workspace(&self, workspace_id: &str) -> Result<Option<WorkspaceRow>> {
        let conn = self.conn()?;
        WorkspaceRepo::get_by_id(&conn, workspace_id)
    }

    /// Get workspace by path.
    pub fn get_workspace_by_path(&self, path: &str) -> Result<Option<WorkspaceRow>> {
        let conn = self.conn()?;
        WorkspaceRepo::get_by_path(&conn, path)
    }

    /// Get or create workspace by path.
    pub fn get_or_create_workspace(&self, path: &str, name: Option<&str>) -> Result<WorkspaceRow> {
        let conn = self.conn()?;
        WorkspaceRepo::get_or_create(&conn, path, name)
    }

    /// List all workspaces.
    pub fn list_workspaces(&self) -> Result<Vec<WorkspaceRow>> {
        let conn = self.conn()?;
        WorkspaceRepo::list(&conn)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Blob storage
    // ─────────────────────────────────────────────────────────────────────

    /// Store blob content (SHA-256 deduplicated; duplicate stores bump the
    /// reference count and return the existing id).
    pub fn store_blob(&self, content: &[u8]) -> Result<String> {
        let conn = self.conn()?;
        BlobRepo::store(&conn, content)
    }

    /// Get blob content by ID.
    pub fn get_blob_content(&self, blob_id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        BlobRepo::get_content(&conn, blob_id)
    }

    /// Get blob metadata.
    pub fn get_blob(&self, blob_id: &str) -> Result<Option<BlobRow>> {
        let conn = self.conn()?;
        BlobRepo::get_by_id(&conn, blob_id)
    }

    /// Get a blob's reference count.
    pub fn get_blob_ref_count(&self, blob_id: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        BlobRepo::get_ref_count(&conn, blob_id)
    }

    /// Drop one reference to a blob. Returns the new count.
    pub fn release_blob(&self, blob_id: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        BlobRepo::decrement_ref_count(&conn, blob_id)
    }

    /// Delete all blobs whose reference count reached zero.
    pub fn sweep_unreferenced_blobs(&self) -> Result<usize> {
        let conn = self.conn()?;
        BlobRepo::delete_unreferenced(&conn)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Branch management
    // ─────────────────────────────────────────────────────────────────────

    /// Create a named branch. The head must be a descendant of the root
    /// within the same session (the root itself counts).
    pub fn create_branch(&self, opts: &CreateBranchOptions<'_>) -> Result<BranchRow> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        validate_descent(&tx, opts.session_id, opts.root_event_id, opts.head_event_id)?;
        let branch = BranchRepo::create(&tx, opts)?;
        tx.commit()?;
        Ok(branch)
    }

    /// Get a branch by ID.
    pub fn get_branch(&self, branch_id: &str) -> Result<Option<BranchRow>> {
        let conn = self.conn()?;
        BranchRepo::get_by_id(&conn, branch_id)
    }

    /// List branches for a session.
    pub fn list_branches(&self, session_id: &str) -> Result<Vec<BranchRow>> {
        let conn = self.conn()?;
        BranchRepo::get_by_session(&conn, session_id)
    }

    /// Move a branch head. The new head must still descend from the root.
    pub fn update_branch_head(&self, branch_id: &str, head_event_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let branch = BranchRepo::get_by_id(&tx, branch_id)?
            .ok_or_else(|| EventStoreError::InvalidOperation(format!("no branch {branch_id}")))?;
        validate_descent(&tx, &branch.session_id, &branch.root_event_id, head_event_id)?;
        let changed = BranchRepo::update_head(&tx, branch_id, head_event_id)?;
        tx.commit()?;
        Ok(changed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Search & stats
    // ─────────────────────────────────────────────────────────────────────

    /// Full-text search across events with optional filters.
    pub fn search_events(&self, query: &str, opts: &SearchOptions<'_>) -> Result<Vec<SearchResult>> {
        let conn = self.conn()?;
        SearchRepo::search(&conn, query, opts)
    }

    /// Aggregate totals.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        Ok(StoreStats {
            events: EventRepo::count(&conn)?,
            sessions: SessionRepo::count(&conn)?,
            workspaces: WorkspaceRepo::count(&conn)?,
            blobs: BlobRepo::count(&conn)?,
        })
    }
}

/// Validate that `parent_id` is a usable parent for a new event in
/// `session_id`: it must exist, belong to the same session, and its ancestor
/// chain must be acyclic and must not contain the new event's id.
fn validate_parent(
    conn: &rusqlite::Connection,
    session_id: &str,
    parent_id: &str,
    new_event_id: &str,
) -> Result<()> {
    let parent = EventRepo::get_by_id(conn, parent_id)?
        .ok_or_else(|| EventStoreError::InvalidParent(format!("parent {parent_id} not found")))?;
    if parent.session_id != session_id {
        return Err(EventStoreError::InvalidParent(format!(
            "parent {parent_id} belongs to session {}, not {session_id}",
            parent.session_id
        )));
    }

    let mut seen: HashSet<String> = HashSet::new();
    let _ = seen.insert(new_event_id.to_string());
    let mut cursor = Some(parent.id);
    while let Some(id) = cursor {
        if !seen.insert(id.clone()) {
            return Err(EventStoreError::InvalidParent(format!(
                "parent chain of {parent_id} closes a cycle at {id}"
            )));
        }
        cursor = EventRepo::get_by_id(conn, &id)?.and_then(|row| row.parent_id);
    }
    Ok(())
}

/// Validate that `head_event_id` descends from `root_event_id` within
/// `session_id` (the root itself qualifies).
fn validate_descent(
    conn: &rusqlite::Connection,
    session_id: &str,
    root_event_id: &str,
    head_event_id: &str,
) -> Result<()> {
    let ancestors = EventRepo::get_ancestors(conn, head_event_id)?;
    if ancestors.is_empty() {
        return Err(EventStoreError::EventNotFound(head_event_id.to_string()));
    }
    let in_session = ancestors.iter().all(|e| e.session_id == session_id);
    let descends = ancestors.iter().any(|e| e.id == root_event_id);
    if !in_session || !descends {
        return Err(EventStoreError::InvalidOperation(format!(
            "head {head_event_id} does not descend from root {root_event_id} in session {session_id}"
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn setup() -> EventStore {
        EventStore::in_memory().unwrap()
    }

    fn new_session(store: &EventStore, path: &str) -> CreateSessionResult {
        store
            .create_session(&NewSessionOptions {
                model: "model-a",
                provider: "anthropic",
                workspace_path: path,
                working_directory: None,
                parent_session_id: None,
            })
            .unwrap()
    }

    // ── Session creation ──────────────────────────────────────────────

    #[test]
    fn create_session_basic() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");

        assert!(cr.session.id.starts_with("sess_"));
        assert!(cr.root_event.id.starts_with("evt_"));
        assert_eq!(cr.root_event.sequence, 0);
        assert_eq!(cr.root_event.event_type, "session.start");
        assert!(cr.root_event.parent_id.is_none());
        assert_eq!(cr.session.head_event_id.as_deref(), Some(cr.root_event.id.as_str()));
        assert_eq!(cr.session.event_count, 1);
    }

    #[test]
    fn create_session_start_payload_shape() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        let payload = cr.root_event.payload_value().unwrap();
        assert_eq!(payload["workingDirectory"], "/tmp/project");
        assert_eq!(payload["model"], "model-a");
        assert_eq!(payload["provider"], "anthropic");
    }

    #[test]
    fn create_session_reuses_workspace() {
        let store = setup();
        let a = new_session(&store, "/tmp/project");
        let b = new_session(&store, "/tmp/project");
        assert_eq!(a.session.workspace_id, b.session.workspace_id);
        assert_ne!(a.session.id, b.session.id);
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = setup();
        assert_eq!(store.initialize().unwrap(), 0);
        assert_eq!(store.initialize().unwrap(), 0);
    }

    // ── Append ────────────────────────────────────────────────────────

    #[test]
    fn append_chains_from_head_and_sequences() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");

        let e1 = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "Hello", "turn": 1}),
                parent_id: None,
            })
            .unwrap();
        let e2 = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [{"type": "text", "text": "Hi"}],
                    "turn": 1,
                    "tokenUsage": {"inputTokens": 100, "outputTokens": 50},
                    "stopReason": "end_turn",
                    "model": "model-a"
                }),
                parent_id: None,
            })
            .unwrap();

        assert_eq!(e1.sequence, 1);
        assert_eq!(e2.sequence, 2);
        assert_eq!(e1.parent_id.as_deref(), Some(cr.root_event.id.as_str()));
        assert_eq!(e2.parent_id.as_deref(), Some(e1.id.as_str()));

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.head_event_id.as_deref(), Some(e2.id.as_str()));
    }

    #[test]
    fn append_increments_all_four_counters() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");

        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "Hello", "turn": 1}),
                parent_id: None,
            })
            .unwrap();
        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [{"type": "text", "text": "Hi"}],
                    "turn": 1,
                    "tokenUsage": {"inputTokens": 100, "outputTokens": 50, "cacheReadTokens": 10},
                    "stopReason": "end_turn",
                    "model": "model-a"
                }),
                parent_id: None,
            })
            .unwrap();

        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.event_count, 3);
        assert_eq!(session.message_count, 2);
        assert_eq!(session.input_tokens, 100);
        assert_eq!(session.output_tokens, 50);
    }

    #[test]
    fn sequences_are_gapless() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        for i in 0..10 {
            store
                .append(&AppendOptions {
                    session_id: &cr.session.id,
                    event_type: EventType::Log,
                    payload: json!({"message": format!("line {i}")}),
                    parent_id: None,
                })
                .unwrap();
        }

        let events = store
            .get_events_by_session(&cr.session.id, &ListEventsOptions::default())
            .unwrap();
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.sequence, i as i64);
        }
        assert_eq!(store.next_sequence(&cr.session.id).unwrap(), 11);
    }

    #[test]
    fn append_to_missing_session_fails() {
        let store = setup();
        let err = store
            .append(&AppendOptions {
                session_id: "sess_missing",
                event_type: EventType::Log,
                payload: json!({}),
                parent_id: None,
            })
            .unwrap_err();
        assert_matches!(err, EventStoreError::SessionNotFound(_));
    }

    #[test]
    fn append_with_missing_parent_is_invalid() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        let err = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::Log,
                payload: json!({}),
                parent_id: Some("evt_missing"),
            })
            .unwrap_err();
        assert_matches!(err, EventStoreError::InvalidParent(_));
    }

    #[test]
    fn append_with_cross_session_parent_is_invalid() {
        let store = setup();
        let a = new_session(&store, "/tmp/a");
        let b = new_session(&store, "/tmp/b");

        let err = store
            .append(&AppendOptions {
                session_id: &a.session.id,
                event_type: EventType::Log,
                payload: json!({}),
                parent_id: Some(&b.root_event.id),
            })
            .unwrap_err();
        assert_matches!(err, EventStoreError::InvalidParent(_));
        assert_eq!(err.code(), "INVALID_PARENT");
    }

    #[test]
    fn failed_append_leaves_no_partial_state() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        let before = store.count_events(&cr.session.id).unwrap();

        let _ = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "orphan", "turn": 1}),
                parent_id: Some("evt_missing"),
            })
            .unwrap_err();

        assert_eq!(store.count_events(&cr.session.id).unwrap(), before);
        let session = store.get_session(&cr.session.id).unwrap().unwrap();
        assert_eq!(session.event_count, 1);
        let hits = store
            .search_events("orphan", &SearchOptions::default())
            .unwrap();
        assert!(hits.is_empty());
    }

    // ── Ancestry (spec scenario: create → append → ancestor walk) ─────

    #[test]
    fn ancestor_walk_returns_root_to_self() {
        let store = setup();
        let cr = new_session(&store, "/test");

        let e2 = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "q", "turn": 1}),
                parent_id: None,
            })
            .unwrap();
        let e3 = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageAssistant,
                payload: json!({
                    "content": [{"type": "text", "text": "a"}],
                    "turn": 1,
                    "tokenUsage": {"inputTokens": 1, "outputTokens": 1},
                    "stopReason": "end_turn",
                    "model": "m"
                }),
                parent_id: None,
            })
            .unwrap();

        let ancestors = store.get_ancestors(&e3.id).unwrap();
        let ids: Vec<&str> = ancestors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![cr.root_event.id.as_str(), e2.id.as_str(), e3.id.as_str()]);
        assert_eq!(ancestors[0].sequence, 0);
        assert_eq!(ancestors[1].sequence, 1);
        assert_eq!(ancestors[2].sequence, 2);
    }

    #[test]
    fn children_of_branching_parent() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");

        let a = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::Log,
                payload: json!({"message": "a"}),
                parent_id: Some(&cr.root_event.id),
            })
            .unwrap();
        let b = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::Log,
                payload: json!({"message": "b"}),
                parent_id: Some(&cr.root_event.id),
            })
            .unwrap();

        let children = store.get_children(&cr.root_event.id).unwrap();
        let ids: Vec<&str> = children.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
    }

    // ── Transaction ───────────────────────────────────────────────────

    #[test]
    fn transaction_commits_on_ok() {
        let store = setup();
        let id = store
            .transaction(|conn| BlobRepo::store(conn, b"tx content"))
            .unwrap();
        assert!(store.get_blob(&id).unwrap().is_some());
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = setup();
        let result: Result<()> = store.transaction(|conn| {
            let _ = BlobRepo::store(conn, b"doomed")?;
            Err(EventStoreError::Internal("caller bailed".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.stats().unwrap().blobs, 0);
    }

    // ── Blobs (spec scenario: dedup) ──────────────────────────────────

    #[test]
    fn blob_dedup_scenario() {
        let store = setup();
        let id1 = store.store_blob(b"Duplicate content").unwrap();
        let id2 = store.store_blob(b"Duplicate content").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.get_blob_ref_count(&id1).unwrap(), Some(2));
    }

    // ── Branches ──────────────────────────────────────────────────────

    #[test]
    fn branch_head_must_descend_from_root() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        let tip = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::Log,
                payload: json!({"message": "tip"}),
                parent_id: None,
            })
            .unwrap();

        let branch = store
            .create_branch(&CreateBranchOptions {
                session_id: &cr.session.id,
                name: "main",
                root_event_id: &cr.root_event.id,
                head_event_id: &tip.id,
                is_default: true,
            })
            .unwrap();
        assert!(branch.id.starts_with("br_"));

        // Sibling chain rooted elsewhere cannot be a head for this root.
        let other = new_session(&store, "/tmp/other");
        let err = store
            .create_branch(&CreateBranchOptions {
                session_id: &cr.session.id,
                name: "bogus",
                root_event_id: &cr.root_event.id,
                head_event_id: &other.root_event.id,
                is_default: false,
            })
            .unwrap_err();
        assert_matches!(err, EventStoreError::InvalidOperation(_));
    }

    #[test]
    fn update_branch_head_revalidates() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        let tip = store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::Log,
                payload: json!({"message": "tip"}),
                parent_id: None,
            })
            .unwrap();
        let branch = store
            .create_branch(&CreateBranchOptions {
                session_id: &cr.session.id,
                name: "main",
                root_event_id: &cr.root_event.id,
                head_event_id: &cr.root_event.id,
                is_default: true,
            })
            .unwrap();

        assert!(store.update_branch_head(&branch.id, &tip.id).unwrap());
        let updated = store.get_branch(&branch.id).unwrap().unwrap();
        assert_eq!(updated.head_event_id, tip.id);
    }

    // ── Search (spec scenario: FTS filter by workspace) ───────────────

    #[test]
    fn search_filters_by_workspace_scenario() {
        let store = setup();
        let a = new_session(&store, "/tmp/w1");
        let b = new_session(&store, "/tmp/w2");

        for cr in [&a, &b] {
            store
                .append(&AppendOptions {
                    session_id: &cr.session.id,
                    event_type: EventType::MessageUser,
                    payload: json!({"content": "Database queries", "turn": 1}),
                    parent_id: None,
                })
                .unwrap();
        }

        let hits = store
            .search_events(
                "database",
                &SearchOptions {
                    workspace_id: Some(&a.session.workspace_id),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id, a.session.id);
    }

    // ── Stats / head ownership ────────────────────────────────────────

    #[test]
    fn stats_totals() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::Log,
                payload: json!({"message": "x"}),
                parent_id: None,
            })
            .unwrap();
        let _ = store.store_blob(b"abc").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.workspaces, 1);
        assert_eq!(stats.blobs, 1);
    }

    #[test]
    fn session_head_must_stay_in_session() {
        let store = setup();
        let a = new_session(&store, "/tmp/a");
        let b = new_session(&store, "/tmp/b");

        let err = store
            .update_session_head(&a.session.id, &b.root_event.id)
            .unwrap_err();
        assert_matches!(err, EventStoreError::InvalidOperation(_));
    }

    #[test]
    fn delete_session_cascades() {
        let store = setup();
        let cr = new_session(&store, "/tmp/project");
        store
            .append(&AppendOptions {
                session_id: &cr.session.id,
                event_type: EventType::MessageUser,
                payload: json!({"content": "bye", "turn": 1}),
                parent_id: None,
            })
            .unwrap();

        assert!(store.delete_session(&cr.session.id).unwrap());
        assert!(store.get_session(&cr.session.id).unwrap().is_none());
        assert_eq!(store.count_events(&cr.session.id).unwrap(), 0);
        assert!(store.search_events("bye", &SearchOptions::default()).unwrap().is_empty());
    }
}
