//! Read-model types returned by store queries.

use serde::{Deserialize, Serialize};

use super::event_type::EventType;

/// One full-text search hit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Matching event id.
    pub event_id: String,
    /// Session the event belongs to.
    pub session_id: String,
    /// Event type.
    pub event_type: EventType,
    /// Highlighted snippet around the match.
    pub snippet: String,
    /// BM25 relevance score (lower is better).
    pub score: f64,
    /// Event timestamp.
    pub timestamp: String,
}

/// Aggregate store totals.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Total events across all sessions.
    pub events: i64,
    /// Total sessions.
    pub sessions: i64,
    /// Total workspaces.
    pub workspaces: i64,
    /// Total blobs.
    pub blobs: i64,
}
