//! Search repository — FTS5 full-text search over events.
//!
//! The `events_fts` table is a secondary index maintained by explicit calls
//! from the store facade: [`SearchRepo::index_event`] runs inside the same
//! transaction as the event insert, so a crash can never leave an event
//! without its index row (or the reverse). Payload-to-text extraction is
//! type-specific.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::errors::Result;
use crate::types::state::SearchResult;
use crate::types::{EventType, SessionEvent};

/// Options for search queries.
#[derive(Default)]
pub struct SearchOptions<'a> {
    /// Filter by workspace.
    pub workspace_id: Option<&'a str>,
    /// Filter by session.
    pub session_id: Option<&'a str>,
    /// Filter by event types.
    pub types: Option<&'a [EventType]>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Skip results.
    pub offset: Option<i64>,
}

/// Search repository — stateless, every method takes `&Connection`.
pub struct SearchRepo;

impl SearchRepo {
    /// Index an event for search.
    ///
    /// Extracts searchable text from the payload per event type and writes
    /// the FTS row. Events with no searchable text are skipped. Call inside
    /// the same transaction as [`EventRepo::insert`](super::event::EventRepo::insert).
    pub fn index_event(conn: &Connection, event: &SessionEvent) -> Result<bool> {
        let content = extract_content(event.event_type, &event.payload);
        let tool_name = extract_tool_name(&event.payload);

        if content.is_empty() && tool_name.is_empty() {
            return Ok(false);
        }

        let _ = conn.execute(
            "INSERT INTO events_fts (id, session_id, type, content, tool_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.session_id,
                event.event_type.as_str(),
                content,
                tool_name
            ],
        )?;
        Ok(true)
    }

    /// Full-text search with BM25 ranking and optional filters.
    ///
    /// The `query` parameter uses FTS5 syntax (`"exact phrase"`,
    /// `hello OR world`, …). Results are ranked by relevance.
    pub fn search(
        conn: &Connection,
        query: &str,
        opts: &SearchOptions<'_>,
    ) -> Result<Vec<SearchResult>> {
        use std::fmt::Write;
        let mut sql = String::from(
            "SELECT
               events_fts.id,
               events_fts.session_id,
               events_fts.type,
               snippet(events_fts, 3, '<mark>', '</mark>', '...', 64) as snippet,
               bm25(events_fts) as score,
               e.timestamp
             FROM events_fts
             JOIN events e ON events_fts.id = e.id
             WHERE events_fts MATCH ?1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        param_values.push(Box::new(query.to_string()));

        if let Some(ws_id) = opts.workspace_id {
            let _ = write!(sql, " AND e.workspace_id = ?{}", param_values.len() + 1);
            param_values.push(Box::new(ws_id.to_string()));
        }
        if let Some(sess_id) = opts.session_id {
            let _ = write!(sql, " AND events_fts.session_id = ?{}", param_values.len() + 1);
            param_values.push(Box::new(sess_id.to_string()));
        }
        if let Some(types) = opts.types {
            if !types.is_empty() {
                let placeholders: Vec<String> = types
                    .iter()
                    .enumerate()
                    .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
                    .collect();
                let _ = write!(sql, " AND events_fts.type IN ({})", placeholders.join(", "));
                for t in types {
                    param_values.push(Box::new(t.to_string()));
                }
            }
        }

        sql.push_str(" ORDER BY score");

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
            .query_map(params_refs.as_slice(), Self::map_search_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Remove an event from the search index.
    pub fn remove(conn: &Connection, event_id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM events_fts WHERE id = ?1", params![event_id])?;
        Ok(changed > 0)
    }

    /// Remove all events for a session from the search index.
    pub fn remove_by_session(conn: &Connection, session_id: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM events_fts WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(changed)
    }

    /// Check if an event is indexed.
    pub fn is_indexed(conn: &Connection, event_id: &str) -> Result<bool> {
        let found: Option<String> = conn
            .query_row(
                "SELECT id FROM events_fts WHERE id = ?1",
                params![event_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchResult> {
        let event_type_str: String = row.get(2)?;
        let event_type = event_type_str.parse::<EventType>().unwrap_or(EventType::Log);
        Ok(SearchResult {
            event_id: row.get(0)?,
            session_id: row.get(1)?,
            event_type,
            snippet: row.get(3)?,
            score: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }
}

/// Extract searchable text from an event payload, per event type.
fn extract_content(event_type: EventType, payload: &Value) -> String {
    match event_type {
        EventType::MessageUser => string_field(payload, "content"),
        EventType::MessageAssistant => text_blocks(payload.get("content")),
        EventType::ToolCall => payload
            .get("arguments")
            .map(Value::to_string)
            .unwrap_or_default(),
        EventType::ToolResult => payload
            .get("result")
            .map(|r| match r {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default(),
        EventType::WorktreeAcquired | EventType::WorktreeReleased => {
            join_fields(payload, &["branch", "path"])
        }
        EventType::WorktreeCommit => join_fields(payload, &["message", "hash"]),
        EventType::WorktreeMerged => join_fields(payload, &["sourceBranch", "targetBranch"]),
        EventType::PlanModeEntered => string_field(payload, "skillName"),
        EventType::PlanModeExited => join_fields(payload, &["reason", "planPath"]),
        EventType::MemoryLedger => ledger_text(payload),
        EventType::Log => string_field(payload, "message"),
        EventType::TodosUpdated => payload
            .get("todos")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|t| t.get("content").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default(),
        EventType::SessionStart
        | EventType::SessionEnd
        | EventType::SessionFork
        | EventType::SessionRewind
        | EventType::ConfigModelSwitch => String::new(),
    }
}

fn string_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn join_fields(payload: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| payload.get(*k).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concatenate the text of `{type: "text"}` content blocks.
fn text_blocks(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Flatten a ledger-shaped payload into searchable text.
fn ledger_text(payload: &Value) -> String {
    let mut parts = Vec::new();
    for key in ["goal", "now", "content", "text"] {
        if let Some(s) = payload.get(key).and_then(Value::as_str) {
            parts.push(s.to_string());
        }
    }
    for key in ["done", "next", "constraints", "tags"] {
        if let Some(arr) = payload.get(key).and_then(Value::as_array) {
            parts.extend(arr.iter().filter_map(|v| v.as_str().map(String::from)));
        }
    }
    if let Some(arr) = payload.get("decisions").and_then(Value::as_array) {
        for item in arr {
            for key in ["choice", "reason"] {
                if let Some(s) = item.get(key).and_then(Value::as_str) {
                    parts.push(s.to_string());
                }
            }
        }
    }
    parts.join(" ")
}

fn extract_tool_name(payload: &Value) -> String {
    payload
        .get("name")
        .or_else(|| payload.get("toolName"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
