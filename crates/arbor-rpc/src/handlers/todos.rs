//! Todo handlers: list, update, restoreFromBacklog.

use async_trait::async_trait;
use serde_json::{Value, json};

use arbor_events::types::payloads::todo::TodoItem;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{require_param, require_string_param};
use crate::registry::MethodHandler;

/// Current todo list for a session.
pub struct ListTodosHandler;

#[async_trait]
impl MethodHandler for ListTodosHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let todos = ctx.require_todo_manager()?;
        let items = todos.list(&session_id)?;
        Ok(json!({"todos": items}))
    }
}

/// Replace a session's todo list.
pub struct UpdateTodosHandler;

#[async_trait]
impl MethodHandler for UpdateTodosHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let items: Vec<TodoItem> =
            serde_json::from_value(require_param(params.as_ref(), "todos")?.clone())
                .map_err(|e| RpcError::invalid_params(format!("invalid todos: {e}")))?;

        let todos = ctx.require_todo_manager()?;
        todos.update(&session_id, &items)?;
        Ok(json!({"count": items.len()}))
    }
}

/// Restore the newest todo snapshot from ended workspace siblings.
pub struct RestoreFromBacklogHandler;

#[async_trait]
impl MethodHandler for RestoreFromBacklogHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let todos = ctx.require_todo_manager()?;
        let restored = todos.restore_from_backlog(&session_id)?;
        Ok(json!({"restored": restored}))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
