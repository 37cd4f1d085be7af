//! Event handlers: search, history, ancestors.

use async_trait::async_trait;
use serde_json::{Value, json};

use arbor_events::{EventType, ListEventsOptions, SearchOptions};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{optional_i64_param, optional_string_param, require_string_param};
use crate::registry::MethodHandler;

/// Full-text search over the event log with optional workspace, session,
/// and type filters.
pub struct SearchEventsHandler;

#[async_trait]
impl MethodHandler for SearchEventsHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let query = require_string_param(params.as_ref(), "query")?;
        let workspace_id = optional_string_param(params.as_ref(), "workspaceId");
        let session_id = optional_string_param(params.as_ref(), "sessionId");

        let types: Option<Vec<EventType>> = match params.as_ref().and_then(|p| p.get("types")) {
            Some(raw) => Some(
                serde_json::from_value(raw.clone())
                    .map_err(|e| RpcError::invalid_params(format!("invalid types filter: {e}")))?,
            ),
            None => None,
        };

        let opts = SearchOptions {
            workspace_id: workspace_id.as_deref(),
            session_id: session_id.as_deref(),
            types: types.as_deref(),
            limit: optional_i64_param(params.as_ref(), "limit").or(Some(20)),
            offset: optional_i64_param(params.as_ref(), "offset"),
        };
        let results = ctx.event_store.search_events(&query, &opts)?;
        Ok(json!({"results": results}))
    }
}

/// Session event history, in sequence order.
pub struct GetHistoryHandler;

#[async_trait]
impl MethodHandler for GetHistoryHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let opts = ListEventsOptions {
            limit: optional_i64_param(params.as_ref(), "limit"),
            offset: optional_i64_param(params.as_ref(), "offset"),
        };
        let events = ctx.event_store.get_events_by_session(&session_id, &opts)?;
        Ok(json!({"events": events}))
    }
}

/// Ancestor chain (root to self) for an event.
pub struct GetAncestorsHandler;

#[async_trait]
impl MethodHandler for GetAncestorsHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let event_id = require_string_param(params.as_ref(), "eventId")?;
        let ancestors = ctx.event_store.get_ancestors(&event_id)?;
        Ok(json!({"ancestors": ancestors}))
    }
}
