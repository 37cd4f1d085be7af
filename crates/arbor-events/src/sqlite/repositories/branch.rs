//! Branch repository — CRUD for the `branches` table.
//!
//! Branches are named moving pointers into a session's event tree. Descent
//! validation (head must be reachable from root) happens in the store facade,
//! which has access to the event repository; this layer is plain CRUD.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::BranchRow;

/// Options for creating a new branch.
pub struct CreateBranchOptions<'a> {
    /// Session this branch belongs to.
    pub session_id: &'a str,
    /// Branch name (unique per session).
    pub name: &'a str,
    /// Root event ID for the branch.
    pub root_event_id: &'a str,
    /// Head event ID for the branch.
    pub head_event_id: &'a str,
    /// Whether this is the default branch.
    pub is_default: bool,
}

/// Branch repository — stateless, every method takes `&Connection`.
pub struct BranchRepo;

impl BranchRepo {
    /// Create a new branch.
    pub fn create(conn: &Connection, opts: &CreateBranchOptions<'_>) -> Result<BranchRow> {
        let id = arbor_core::new_branch_id();
        let now = arbor_core::now_iso();
        let _ = conn.execute(
            "INSERT INTO branches (id, session_id, name, root_event_id, head_event_id, is_default, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                opts.session_id,
                opts.name,
                opts.root_event_id,
                opts.head_event_id,
                opts.is_default,
                now,
                now
            ],
        )?;
        Ok(BranchRow {
            id,
            session_id: opts.session_id.to_string(),
            name: opts.name.to_string(),
            root_event_id: opts.root_event_id.to_string(),
            head_event_id: opts.head_event_id.to_string(),
            is_default: opts.is_default,
            created_at: now.clone(),
            last_activity_at: now,
        })
    }

    /// Get branch by ID.
    pub fn get_by_id(conn: &Connection, branch_id: &str) -> Result<Option<BranchRow>> {
        let row = conn
            .query_row(
                "SELECT id, session_id, name, root_event_id, head_event_id, is_default, created_at, last_activity_at
                 FROM branches WHERE id = ?1",
                params![branch_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get all branches for a session, ordered by creation time.
    pub fn get_by_session(conn: &Connection, session_id: &str) -> Result<Vec<BranchRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, name, root_event_id, head_event_id, is_default, created_at, last_activity_at
             FROM branches WHERE session_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update the head event ID and last activity.
    pub fn update_head(conn: &Connection, branch_id: &str, head_event_id: &str) -> Result<bool> {
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE branches SET head_event_id = ?1, last_activity_at = ?2 WHERE id = ?3",
            params![head_event_id, now, branch_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a branch. Returns `true` if deleted.
    pub fn delete(conn: &Connection, branch_id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM branches WHERE id = ?1", params![branch_id])?;
        Ok(changed > 0)
    }

    /// Delete all branches for a session. Returns count deleted.
    pub fn delete_by_session(conn: &Connection, session_id: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM branches WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(changed)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BranchRow> {
        Ok(BranchRow {
            id: row.get(0)?,
            session_id: row.get(1)?,
            name: row.get(2)?,
            root_event_id: row.get(3)?,
            head_event_id: row.get(4)?,
            is_default: row.get(5)?,
            created_at: row.get(6)?,
            last_activity_at: row.get(7)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
