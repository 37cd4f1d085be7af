//! Event repository — core event log operations.
//!
//! The event log is the heart of event sourcing. Events are immutable,
//! append-only, and form a tree structure via `parent_id` chains. This
//! repository provides low-level CRUD, tree traversal (ancestors/children via
//! recursive CTEs), and query operations. Parent validation and sequence
//! allocation policy live in the store facade, which calls in here inside a
//! single transaction.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;
use crate::types::SessionEvent;

/// Options for listing events.
#[derive(Default)]
pub struct ListEventsOptions {
    /// Maximum number of events to return.
    pub limit: Option<i64>,
    /// Number of events to skip.
    pub offset: Option<i64>,
}

const COLUMNS: &str =
    "id, session_id, parent_id, workspace_id, sequence, type, timestamp, payload, tool_name, turn";

/// Event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Insert a single event, extracting denormalized fields from the payload.
    pub fn insert(conn: &Connection, event: &SessionEvent) -> Result<()> {
        let tool_name = extract_str(&event.payload, "name")
            .or_else(|| extract_str(&event.payload, "toolName"));
        let turn = event.payload.get("turn").and_then(Value::as_i64);
        let payload_str = serde_json::to_string(&event.payload)?;

        let _ = conn.execute(
            "INSERT INTO events (id, session_id, parent_id, workspace_id, sequence, type,
             timestamp, payload, tool_name, turn)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.id,
                event.session_id,
                event.parent_id,
                event.workspace_id,
                event.sequence,
                event.event_type.as_str(),
                event.timestamp,
                payload_str,
                tool_name,
                turn,
            ],
        )?;
        Ok(())
    }

    /// Get a single event by ID.
    pub fn get_by_id(conn: &Connection, event_id: &str) -> Result<Option<EventRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM events WHERE id = ?1"),
                params![event_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Batch-fetch events by IDs. Missing IDs are silently omitted.
    pub fn get_by_ids(
        conn: &Connection,
        event_ids: &[&str],
    ) -> Result<std::collections::HashMap<String, EventRow>> {
        let mut result = std::collections::HashMap::new();
        if event_ids.is_empty() {
            return Ok(result);
        }

        let placeholders: Vec<String> = (1..=event_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {COLUMNS} FROM events WHERE id IN ({})",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::types::ToSql> = event_ids
            .iter()
            .map(|s| s as &dyn rusqlite::types::ToSql)
            .collect();
        let rows = stmt
            .query_map(params.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for row in rows {
            let _ = result.insert(row.id.clone(), row);
        }
        Ok(result)
    }

    /// Get events for a session, ordered by sequence.
    pub fn get_by_session(
        conn: &Connection,
        session_id: &str,
        opts: &ListEventsOptions,
    ) -> Result<Vec<EventRow>> {
        use std::fmt::Write;
        let mut sql =
            format!("SELECT {COLUMNS} FROM events WHERE session_id = ?1 ORDER BY sequence ASC");
        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        if let Some(offset) = opts.offset {
            let _ = write!(sql, " OFFSET {offset}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![session_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get events of specific types within a session, ordered by sequence.
    pub fn get_by_types(
        conn: &Connection,
        session_id: &str,
        types: &[&str],
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        use std::fmt::Write;
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (2..=types.len() + 1).map(|i| format!("?{i}")).collect();
        let mut sql = format!(
            "SELECT {COLUMNS} FROM events WHERE session_id = ?1 AND type IN ({}) ORDER BY sequence ASC",
            placeholders.join(", ")
        );
        if let Some(limit) = limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(session_id.to_string()));
        for t in types {
            params.push(Box::new((*t).to_string()));
        }
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(Box::as_ref).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get events by workspace and types (cross-session), newest first.
    pub fn get_by_workspace_and_types(
        conn: &Connection,
        workspace_id: &str,
        types: &[&str],
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        use std::fmt::Write;
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (2..=types.len() + 1).map(|i| format!("?{i}")).collect();
        let mut sql = format!(
            "SELECT {COLUMNS} FROM events WHERE workspace_id = ?1 AND type IN ({}) ORDER BY timestamp DESC",
            placeholders.join(", ")
        );
        if let Some(limit) = limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(workspace_id.to_string()));
        for t in types {
            params.push(Box::new((*t).to_string()));
        }
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(Box::as_ref).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Next sequence number for a session: `MAX(sequence) + 1`, or 0 when the
    /// session has no events yet. Runs a plain read; callers needing the
    /// locking guarantee invoke this inside a write transaction.
    pub fn next_sequence(conn: &Connection, session_id: &str) -> Result<i64> {
        let max: Option<i64> = conn
            .query_row(
                "SELECT MAX(sequence) FROM events WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(max.map_or(0, |m| m + 1))
    }

    /// Get ancestor chain from root to the given event (inclusive), using a
    /// recursive CTE following `parent_id` upward.
    pub fn get_ancestors(conn: &Connection, event_id: &str) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(
            "WITH RECURSIVE ancestors(id, session_id, parent_id, workspace_id, sequence, type,
                    timestamp, payload, tool_name, turn, lvl) AS (
               SELECT id, session_id, parent_id, workspace_id, sequence, type,
                      timestamp, payload, tool_name, turn, 0
               FROM events WHERE id = ?1
               UNION ALL
               SELECT e.id, e.session_id, e.parent_id, e.workspace_id, e.sequence, e.type,
                      e.timestamp, e.payload, e.tool_name, e.turn, a.lvl + 1
               FROM events e JOIN ancestors a ON e.id = a.parent_id
               WHERE a.lvl < 100000
             )
             SELECT id, session_id, parent_id, workspace_id, sequence, type,
                    timestamp, payload, tool_name, turn
             FROM ancestors ORDER BY lvl DESC",
        )?;
        let rows = stmt
            .query_map(params![event_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get direct children of an event.
    pub fn get_children(conn: &Connection, event_id: &str) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM events WHERE parent_id = ?1 ORDER BY sequence ASC"
        ))?;
        let rows = stmt
            .query_map(params![event_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count events in a session.
    pub fn count_by_session(conn: &Connection, session_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Total event count across all sessions.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Check if event exists.
    pub fn exists(conn: &Connection, event_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)",
            params![event_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete all events for a session. Returns count deleted.
    pub fn delete_by_session(conn: &Connection, session_id: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM events WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(changed)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
        Ok(EventRow {
            id: row.get(0)?,
            session_id: row.get(1)?,
            parent_id: row.get(2)?,
            workspace_id: row.get(3)?,
            sequence: row.get(4)?,
            event_type: row.get(5)?,
            timestamp: row.get(6)?,
            payload: row.get(7)?,
            tool_name: row.get(8)?,
            turn: row.get(9)?,
        })
    }
}

fn extract_str(val: &Value, key: &str) -> Option<String> {
    val.get(key)?.as_str().map(String::from)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
