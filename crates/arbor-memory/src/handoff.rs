//! Handoff store — finalized session summaries in their own database.
//!
//! Handoffs live in a separate embedded `SQLite` database from the event
//! store, with an FTS index over their narrative fields. Rows are written
//! whole at session end and only ever flipped to `closed` afterwards.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use arbor_events::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};

use crate::errors::Result;

/// One code change recorded in a handoff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChange {
    /// File touched.
    pub file: String,
    /// What changed.
    pub description: String,
}

/// Input for creating a handoff.
#[derive(Clone, Debug, Default)]
pub struct NewHandoff {
    /// Session the handoff summarizes.
    pub session_id: String,
    /// Narrative summary.
    pub summary: String,
    /// Code changes made during the session.
    pub code_changes: Vec<CodeChange>,
    /// Where things stand.
    pub current_state: String,
    /// Open blockers.
    pub blockers: Vec<String>,
    /// Suggested next steps.
    pub next_steps: Vec<String>,
    /// Patterns worth remembering.
    pub patterns: Vec<String>,
    /// Working directory of the session.
    pub working_directory: Option<String>,
}

/// A stored handoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRecord {
    /// Handoff id (`ho_…`).
    pub id: String,
    /// Session the handoff summarizes.
    pub session_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Narrative summary.
    pub summary: String,
    /// Code changes made during the session.
    pub code_changes: Vec<CodeChange>,
    /// Where things stand.
    pub current_state: String,
    /// Open blockers.
    pub blockers: Vec<String>,
    /// Suggested next steps.
    pub next_steps: Vec<String>,
    /// Patterns worth remembering.
    pub patterns: Vec<String>,
    /// Working directory of the session.
    pub working_directory: Option<String>,
    /// Whether the handoff has been consumed.
    pub closed: bool,
}

/// One handoff search hit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffSearchResult {
    /// Matching handoff.
    pub handoff: HandoffRecord,
    /// Highlighted snippet around the match.
    pub snippet: String,
}

/// Store for handoff rows, backed by its own database file.
pub struct HandoffStore {
    pool: ConnectionPool,
}

impl HandoffStore {
    /// Open a file-backed store.
    pub fn open(path: &str) -> Result<Self> {
        let store = Self {
            pool: new_file(path, &ConnectionConfig::default())?,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (single connection, for tests).
    pub fn in_memory() -> Result<Self> {
        let config = ConnectionConfig {
            pool_size: 1,
            ..Default::default()
        };
        let store = Self {
            pool: new_in_memory(&config)?,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create tables. Idempotent.
    fn initialize(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS handoffs (
               id                TEXT PRIMARY KEY,
               session_id        TEXT NOT NULL,
               created_at        TEXT NOT NULL,
               summary           TEXT NOT NULL,
               code_changes      TEXT NOT NULL,
               current_state     TEXT NOT NULL,
               blockers          TEXT NOT NULL,
               next_steps        TEXT NOT NULL,
               patterns          TEXT NOT NULL,
               working_directory TEXT,
               closed            INTEGER NOT NULL DEFAULT 0
             );
             CREATE INDEX IF NOT EXISTS idx_handoffs_created ON handoffs(created_at);
             CREATE INDEX IF NOT EXISTS idx_handoffs_session ON handoffs(session_id);
             CREATE VIRTUAL TABLE IF NOT EXISTS handoffs_fts USING fts5(
               id, summary, current_state, extras,
               tokenize = 'porter unicode61'
             );

             CREATE TABLE IF NOT EXISTS ledgers (
               workspace_id TEXT PRIMARY KEY,
               data         TEXT NOT NULL,
               updated_at   TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    /// Connection pool (shared with the ledger store).
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Create a handoff. The FTS row is written in the same transaction.
    pub fn create(&self, input: &NewHandoff) -> Result<HandoffRecord> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;

        let id = arbor_core::new_handoff_id();
        let now = arbor_core::now_iso();

        let _ = tx.execute(
            "INSERT INTO handoffs (id, session_id, created_at, summary, code_changes,
             current_state, blockers, next_steps, patterns, working_directory, closed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
            params![
                id,
                input.session_id,
                now,
                input.summary,
                serde_json::to_string(&input.code_changes)?,
                input.current_state,
                serde_json::to_string(&input.blockers)?,
                serde_json::to_string(&input.next_steps)?,
                serde_json::to_string(&input.patterns)?,
                input.working_directory,
            ],
        )?;

        // Searchable extras: blockers, next steps, patterns, file names.
        let mut extras: Vec<String> = Vec::new();
        extras.extend(input.blockers.iter().cloned());
        extras.extend(input.next_steps.iter().cloned());
        extras.extend(input.patterns.iter().cloned());
        extras.extend(input.code_changes.iter().map(|c| c.file.clone()));
        let _ = tx.execute(
            "INSERT INTO handoffs_fts (id, summary, current_state, extras) VALUES (?1, ?2, ?3, ?4)",
            params![id, input.summary, input.current_state, extras.join(" ")],
        )?;

        tx.commit()?;

        Ok(HandoffRecord {
            id,
            session_id: input.session_id.clone(),
            created_at: now,
            summary: input.summary.clone(),
            code_changes: input.code_changes.clone(),
            current_state: input.current_state.clone(),
            blockers: input.blockers.clone(),
            next_steps: input.next_steps.clone(),
            patterns: input.patterns.clone(),
            working_directory: input.working_directory.clone(),
            closed: false,
        })
    }

    /// Get a handoff by id.
    pub fn get(&self, id: &str) -> Result<Option<HandoffRecord>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM handoffs h WHERE h.id = ?1"),
                params![id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List the most recent handoffs, optionally scoped to a working
    /// directory, open ones only.
    pub fn list_recent(
        &self,
        working_directory: Option<&str>,
        limit: i64,
    ) -> Result<Vec<HandoffRecord>> {
        let conn = self.pool.get()?;
        let rows = if let Some(dir) = working_directory {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM handoffs h
                 WHERE h.closed = 0 AND h.working_directory = ?1
                 ORDER BY h.created_at DESC LIMIT ?2"
            ))?;
            stmt.query_map(params![dir, limit], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM handoffs h
                 WHERE h.closed = 0 ORDER BY h.created_at DESC LIMIT ?1"
            ))?;
            stmt.query_map(params![limit], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    /// Full-text search over handoff narratives.
    pub fn search(&self, query: &str, limit: i64) -> Result<Vec<HandoffSearchResult>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS},
                    snippet(handoffs_fts, 1, '<mark>', '</mark>', '...', 48) as snip
             FROM handoffs_fts
             JOIN handoffs h ON handoffs_fts.id = h.id
             WHERE handoffs_fts MATCH ?1
             ORDER BY bm25(handoffs_fts) LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![query, limit], |row| {
                let handoff = map_row(row)?;
                let snippet: String = row.get(11)?;
                Ok(HandoffSearchResult { handoff, snippet })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Mark a handoff consumed. Returns `true` when a row changed.
    pub fn close(&self, id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let changed = conn.execute("UPDATE handoffs SET closed = 1 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Total handoff count.
    pub fn count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM handoffs", [], |row| row.get(0))?;
        Ok(count)
    }
}

const COLUMNS: &str = "h.id, h.session_id, h.created_at, h.summary, h.code_changes,
    h.current_state, h.blockers, h.next_steps, h.patterns, h.working_directory, h.closed";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HandoffRecord> {
    let code_changes: String = row.get(4)?;
    let blockers: String = row.get(6)?;
    let next_steps: String = row.get(7)?;
    let patterns: String = row.get(8)?;
    Ok(HandoffRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        created_at: row.get(2)?,
        summary: row.get(3)?,
        code_changes: serde_json::from_str(&code_changes).unwrap_or_default(),
        current_state: row.get(5)?,
        blockers: serde_json::from_str(&blockers).unwrap_or_default(),
        next_steps: serde_json::from_str(&next_steps).unwrap_or_default(),
        patterns: serde_json::from_str(&patterns).unwrap_or_default(),
        working_directory: row.get(9)?,
        closed: row.get(10)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
