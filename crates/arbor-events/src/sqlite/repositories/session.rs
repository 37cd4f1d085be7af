//! Session repository — session lifecycle and aggregate counters.
//!
//! Sessions are pointers into the event log with denormalized counters
//! (event count, message count, token totals) for efficient list queries.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::SessionRow;

/// Options for creating a new session.
pub struct CreateSessionOptions<'a> {
    /// Workspace this session belongs to.
    pub workspace_id: &'a str,
    /// Model identifier.
    pub model: &'a str,
    /// Provider identifier.
    pub provider: &'a str,
    /// Working directory path.
    pub working_directory: &'a str,
    /// Parent session (for forks).
    pub parent_session_id: Option<&'a str>,
}

/// Options for listing sessions.
#[derive(Default)]
pub struct ListSessionsOptions<'a> {
    /// Filter by workspace.
    pub workspace_id: Option<&'a str>,
    /// Filter by ended state.
    pub ended: Option<bool>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Skip results.
    pub offset: Option<i64>,
}

/// Additive counter deltas applied in one UPDATE.
#[derive(Clone, Copy, Debug, Default)]
pub struct CounterDeltas {
    /// Events to add.
    pub event_count: i64,
    /// Messages to add.
    pub message_count: i64,
    /// Input tokens to add.
    pub input_tokens: i64,
    /// Output tokens to add.
    pub output_tokens: i64,
}

impl CounterDeltas {
    /// Whether every delta is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
            && self.message_count == 0
            && self.input_tokens == 0
            && self.output_tokens == 0
    }
}

/// Session repository — stateless, every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a new session.
    pub fn create(conn: &Connection, opts: &CreateSessionOptions<'_>) -> Result<SessionRow> {
        let id = arbor_core::new_session_id();
        let now = arbor_core::now_iso();

        let _ = conn.execute(
            "INSERT INTO sessions (id, workspace_id, model, provider, working_directory,
             parent_session_id, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                opts.workspace_id,
                opts.model,
                opts.provider,
                opts.working_directory,
                opts.parent_session_id,
                now,
                now,
            ],
        )?;

        Ok(SessionRow {
            id,
            workspace_id: opts.workspace_id.to_string(),
            head_event_id: None,
            model: opts.model.to_string(),
            provider: opts.provider.to_string(),
            working_directory: opts.working_directory.to_string(),
            parent_session_id: opts.parent_session_id.map(String::from),
            created_at: now.clone(),
            last_activity_at: now,
            ended_at: None,
            event_count: 0,
            message_count: 0,
            input_tokens: 0,
            output_tokens: 0,
        })
    }

    /// Get session by ID.
    pub fn get_by_id(conn: &Connection, session_id: &str) -> Result<Option<SessionRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1"),
                params![session_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List sessions with filtering, most recently active first.
    pub fn list(conn: &Connection, opts: &ListSessionsOptions<'_>) -> Result<Vec<SessionRow>> {
        use std::fmt::Write;
        let mut sql = format!("SELECT {COLUMNS} FROM sessions WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ws_id) = opts.workspace_id {
            let _ = write!(sql, " AND workspace_id = ?{}", param_values.len() + 1);
            param_values.push(Box::new(ws_id.to_string()));
        }
        if let Some(ended) = opts.ended {
            if ended {
                sql.push_str(" AND ended_at IS NOT NULL");
            } else {
                sql.push_str(" AND ended_at IS NULL");
            }
        }
        sql.push_str(" ORDER BY last_activity_at DESC");
        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        if let Some(offset) = opts.offset {
            let _ = write!(sql, " OFFSET {offset}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update head event ID and last activity.
    pub fn update_head(conn: &Connection, session_id: &str, head_event_id: &str) -> Result<bool> {
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE sessions SET head_event_id = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![head_event_id, now, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Mark session as ended.
    pub fn mark_ended(conn: &Connection, session_id: &str) -> Result<bool> {
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE sessions SET ended_at = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![now, now, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Clear ended status (reactivate a session for resume).
    pub fn clear_ended(conn: &Connection, session_id: &str) -> Result<bool> {
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE sessions SET ended_at = NULL, last_activity_at = ?1 WHERE id = ?2",
            params![now, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Update the session's model.
    pub fn update_model(conn: &Connection, session_id: &str, model: &str) -> Result<bool> {
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE sessions SET model = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![model, now, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Apply all four counter deltas in a single additive UPDATE.
    pub fn increment_counters(
        conn: &Connection,
        session_id: &str,
        deltas: &CounterDeltas,
    ) -> Result<bool> {
        if deltas.is_empty() {
            return Ok(false);
        }
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE sessions SET
               event_count   = event_count   + ?1,
               message_count = message_count + ?2,
               input_tokens  = input_tokens  + ?3,
               output_tokens = output_tokens + ?4,
               last_activity_at = ?5
             WHERE id = ?6",
            params![
                deltas.event_count,
                deltas.message_count,
                deltas.input_tokens,
                deltas.output_tokens,
                now,
                session_id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Check if session exists.
    pub fn exists(conn: &Connection, session_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete a session.
    pub fn delete(conn: &Connection, session_id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
        Ok(changed > 0)
    }

    /// Count total sessions.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
        Ok(SessionRow {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            head_event_id: row.get(2)?,
            model: row.get(3)?,
            provider: row.get(4)?,
            working_directory: row.get(5)?,
            parent_session_id: row.get(6)?,
            created_at: row.get(7)?,
            last_activity_at: row.get(8)?,
            ended_at: row.get(9)?,
            event_count: row.get(10)?,
            message_count: row.get(11)?,
            input_tokens: row.get(12)?,
            output_tokens: row.get(13)?,
        })
    }
}

const COLUMNS: &str = "id, workspace_id, head_event_id, model, provider, working_directory,
    parent_session_id, created_at, last_activity_at, ended_at,
    event_count, message_count, input_tokens, output_tokens";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use crate::sqlite::repositories::workspace::{CreateWorkspaceOptions, WorkspaceRepo};

    fn setup() -> (Connection, String) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        let ws = WorkspaceRepo::create(
            &conn,
            &CreateWorkspaceOptions { path: "/tmp/test", name: None },
        )
        .unwrap();
        (conn, ws.id)
    }

    fn make_session(conn: &Connection, ws_id: &str) -> SessionRow {
        SessionRepo::create(
            conn,
            &CreateSessionOptions {
                workspace_id: ws_id,
                model: "model-a",
                provider: "anthropic",
                working_directory: "/tmp/test",
                parent_session_id: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn create_session() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);

        assert!(sess.id.starts_with("sess_"));
        assert_eq!(sess.workspace_id, ws_id);
        assert_eq!(sess.provider, "anthropic");
        assert!(sess.head_event_id.is_none());
        assert!(!sess.ended());
        assert_eq!(sess.event_count, 0);
    }

    #[test]
    fn get_by_id() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);
        let found = SessionRepo::get_by_id(&conn, &sess.id).unwrap().unwrap();
        assert_eq!(found.id, sess.id);
        assert!(SessionRepo::get_by_id(&conn, "sess_missing").unwrap().is_none());
    }

    #[test]
    fn list_filters_by_ended() {
        let (conn, ws_id) = setup();
        let a = make_session(&conn, &ws_id);
        let _b = make_session(&conn, &ws_id);
        SessionRepo::mark_ended(&conn, &a.id).unwrap();

        let active = SessionRepo::list(
            &conn,
            &ListSessionsOptions { ended: Some(false), ..Default::default() },
        )
        .unwrap();
        assert_eq!(active.len(), 1);

        let ended = SessionRepo::list(
            &conn,
            &ListSessionsOptions { ended: Some(true), ..Default::default() },
        )
        .unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].id, a.id);
    }

    #[test]
    fn list_filters_by_workspace() {
        let (conn, ws_id) = setup();
        let other = WorkspaceRepo::create(
            &conn,
            &CreateWorkspaceOptions { path: "/tmp/other", name: None },
        )
        .unwrap();
        let _a = make_session(&conn, &ws_id);
        let b = make_session(&conn, &other.id);

        let rows = SessionRepo::list(
            &conn,
            &ListSessionsOptions { workspace_id: Some(&other.id), ..Default::default() },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, b.id);
    }

    #[test]
    fn mark_and_clear_ended() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);

        SessionRepo::mark_ended(&conn, &sess.id).unwrap();
        assert!(SessionRepo::get_by_id(&conn, &sess.id).unwrap().unwrap().ended());

        SessionRepo::clear_ended(&conn, &sess.id).unwrap();
        assert!(!SessionRepo::get_by_id(&conn, &sess.id).unwrap().unwrap().ended());
    }

    #[test]
    fn increment_counters_is_additive() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);

        SessionRepo::increment_counters(
            &conn,
            &sess.id,
            &CounterDeltas { event_count: 1, message_count: 1, input_tokens: 100, output_tokens: 50 },
        )
        .unwrap();
        SessionRepo::increment_counters(
            &conn,
            &sess.id,
            &CounterDeltas { event_count: 2, input_tokens: 10, ..Default::default() },
        )
        .unwrap();

        let row = SessionRepo::get_by_id(&conn, &sess.id).unwrap().unwrap();
        assert_eq!(row.event_count, 3);
        assert_eq!(row.message_count, 1);
        assert_eq!(row.input_tokens, 110);
        assert_eq!(row.output_tokens, 50);
    }

    #[test]
    fn increment_empty_deltas_is_noop() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);
        let changed =
            SessionRepo::increment_counters(&conn, &sess.id, &CounterDeltas::default()).unwrap();
        assert!(!changed);
    }

    #[test]
    fn update_model() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);
        SessionRepo::update_model(&conn, &sess.id, "model-b").unwrap();
        let row = SessionRepo::get_by_id(&conn, &sess.id).unwrap().unwrap();
        assert_eq!(row.model, "model-b");
    }

    #[test]
    fn delete_session() {
        let (conn, ws_id) = setup();
        let sess = make_session(&conn, &ws_id);
        assert!(SessionRepo::delete(&conn, &sess.id).unwrap());
        assert!(!SessionRepo::exists(&conn, &sess.id).unwrap());
    }
}
