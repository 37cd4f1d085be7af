//! Workspace repository — CRUD for the `workspaces` table.
//!
//! Workspaces represent project directories. Each session belongs to a
//! workspace, and workspace paths are unique: two sessions in the same
//! directory share one workspace.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::WorkspaceRow;

/// Options for creating a new workspace.
pub struct CreateWorkspaceOptions<'a> {
    /// Absolute filesystem path (must be unique).
    pub path: &'a str,
    /// Optional display name.
    pub name: Option<&'a str>,
}

/// Workspace repository — stateless, every method takes `&Connection`.
pub struct WorkspaceRepo;

impl WorkspaceRepo {
    /// Create a new workspace.
    pub fn create(conn: &Connection, opts: &CreateWorkspaceOptions<'_>) -> Result<WorkspaceRow> {
        let id = arbor_core::new_workspace_id();
        let now = arbor_core::now_iso();
        let _ = conn.execute(
            "INSERT INTO workspaces (id, path, name, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, opts.path, opts.name, now, now],
        )?;
        Ok(WorkspaceRow {
            id,
            path: opts.path.to_string(),
            name: opts.name.map(String::from),
            created_at: now.clone(),
            last_activity_at: now,
            session_count: Some(0),
        })
    }

    /// Get workspace by ID, with session count.
    pub fn get_by_id(conn: &Connection, workspace_id: &str) -> Result<Option<WorkspaceRow>> {
        let row = conn
            .query_row(
                "SELECT w.id, w.path, w.name, w.created_at, w.last_activity_at,
                        (SELECT COUNT(*) FROM sessions WHERE workspace_id = w.id) as session_count
                 FROM workspaces w WHERE w.id = ?1",
                params![workspace_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get workspace by filesystem path, with session count.
    pub fn get_by_path(conn: &Connection, path: &str) -> Result<Option<WorkspaceRow>> {
        let row = conn
            .query_row(
                "SELECT w.id, w.path, w.name, w.created_at, w.last_activity_at,
                        (SELECT COUNT(*) FROM sessions WHERE workspace_id = w.id) as session_count
                 FROM workspaces w WHERE w.path = ?1",
                params![path],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get existing workspace by path, or create a new one.
    pub fn get_or_create(conn: &Connection, path: &str, name: Option<&str>) -> Result<WorkspaceRow> {
        if let Some(ws) = Self::get_by_path(conn, path)? {
            return Ok(ws);
        }
        Self::create(conn, &CreateWorkspaceOptions { path, name })
    }

    /// List all workspaces ordered by last activity (most recent first).
    pub fn list(conn: &Connection) -> Result<Vec<WorkspaceRow>> {
        let mut stmt = conn.prepare(
            "SELECT w.id, w.path, w.name, w.created_at, w.last_activity_at,
                    (SELECT COUNT(*) FROM sessions WHERE workspace_id = w.id) as session_count
             FROM workspaces w ORDER BY w.last_activity_at DESC",
        )?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update last activity timestamp to now.
    pub fn update_last_activity(conn: &Connection, workspace_id: &str) -> Result<bool> {
        let now = arbor_core::now_iso();
        let changed = conn.execute(
            "UPDATE workspaces SET last_activity_at = ?1 WHERE id = ?2",
            params![now, workspace_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete workspace. Returns `true` if a row was deleted.
    pub fn delete(conn: &Connection, workspace_id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM workspaces WHERE id = ?1", params![workspace_id])?;
        Ok(changed > 0)
    }

    /// Count total workspaces.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM workspaces", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Check if workspace exists.
    pub fn exists(conn: &Connection, workspace_id: &str) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?1)",
            params![workspace_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkspaceRow> {
        Ok(WorkspaceRow {
            id: row.get(0)?,
            path: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            last_activity_at: row.get(4)?,
            session_count: row.get(5)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn create_workspace() {
        let conn = setup();
        let ws = WorkspaceRepo::create(
            &conn,
            &CreateWorkspaceOptions {
                path: "/tmp/project",
                name: Some("My Project"),
            },
        )
        .unwrap();

        assert!(ws.id.starts_with("ws_"));
        assert_eq!(ws.path, "/tmp/project");
        assert_eq!(ws.name.as_deref(), Some("My Project"));
        assert_eq!(ws.session_count, Some(0));
    }

    #[test]
    fn path_is_unique() {
        let conn = setup();
        WorkspaceRepo::create(&conn, &CreateWorkspaceOptions { path: "/tmp/p", name: None })
            .unwrap();
        let dup =
            WorkspaceRepo::create(&conn, &CreateWorkspaceOptions { path: "/tmp/p", name: None });
        assert!(dup.is_err());
    }

    #[test]
    fn get_by_path() {
        let conn = setup();
        let ws = WorkspaceRepo::create(&conn, &CreateWorkspaceOptions { path: "/tmp/p", name: None })
            .unwrap();
        let found = WorkspaceRepo::get_by_path(&conn, "/tmp/p").unwrap().unwrap();
        assert_eq!(found.id, ws.id);
        assert!(WorkspaceRepo::get_by_path(&conn, "/tmp/other").unwrap().is_none());
    }

    #[test]
    fn get_or_create_returns_same_id() {
        let conn = setup();
        let a = WorkspaceRepo::get_or_create(&conn, "/tmp/p", None).unwrap();
        let b = WorkspaceRepo::get_or_create(&conn, "/tmp/p", Some("ignored")).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(WorkspaceRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn list_ordered_by_activity() {
        let conn = setup();
        let a = WorkspaceRepo::create(&conn, &CreateWorkspaceOptions { path: "/tmp/a", name: None })
            .unwrap();
        let _b =
            WorkspaceRepo::create(&conn, &CreateWorkspaceOptions { path: "/tmp/b", name: None })
                .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        WorkspaceRepo::update_last_activity(&conn, &a.id).unwrap();

        let list = WorkspaceRepo::list(&conn).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a.id);
    }

    #[test]
    fn delete_workspace() {
        let conn = setup();
        let ws = WorkspaceRepo::create(&conn, &CreateWorkspaceOptions { path: "/tmp/p", name: None })
            .unwrap();
        assert!(WorkspaceRepo::delete(&conn, &ws.id).unwrap());
        assert!(!WorkspaceRepo::exists(&conn, &ws.id).unwrap());
    }
}
