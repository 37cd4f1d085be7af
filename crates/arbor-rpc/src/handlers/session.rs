//! Session handlers: create, get, list, delete, fork, rewind, resume, end.

use async_trait::async_trait;
use serde_json::{Value, json};

use arbor_runtime::SessionFilter;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{
    optional_i64_param, optional_string_param, require_param, require_string_param,
};
use crate::registry::MethodHandler;

/// Create a new session.
pub struct CreateSessionHandler;

#[async_trait]
impl MethodHandler for CreateSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let model = require_string_param(params.as_ref(), "model")?;
        let working_directory = require_string_param(params.as_ref(), "workingDirectory")?;
        let provider =
            optional_string_param(params.as_ref(), "provider").unwrap_or_else(|| "anthropic".into());

        let manager = ctx.require_session_manager()?;
        let session = manager.create(&model, &provider, &working_directory)?;
        Ok(serde_json::to_value(session).unwrap_or(Value::Null))
    }
}

/// Get a session with its reconstructed messages.
pub struct GetSessionHandler;

#[async_trait]
impl MethodHandler for GetSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let manager = ctx.require_session_manager()?;
        let view = manager.get(&session_id)?;
        Ok(json!({
            "session": view.session,
            "messages": view.messages,
        }))
    }
}

/// List sessions.
pub struct ListSessionsHandler;

#[async_trait]
impl MethodHandler for ListSessionsHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let manager = ctx.require_session_manager()?;
        let filter = SessionFilter {
            workspace_id: optional_string_param(params.as_ref(), "workspaceId"),
            ended: params
                .as_ref()
                .and_then(|p| p.get("ended"))
                .and_then(Value::as_bool),
            limit: optional_i64_param(params.as_ref(), "limit"),
        };
        let sessions = manager.list(&filter)?;
        Ok(json!({"sessions": sessions}))
    }
}

/// Delete a session and its events.
pub struct DeleteSessionHandler;

#[async_trait]
impl MethodHandler for DeleteSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let manager = ctx.require_session_manager()?;
        let deleted = manager.delete(&session_id)?;
        Ok(json!({"deleted": deleted}))
    }
}

/// Fork a session at a message index.
pub struct ForkSessionHandler;

#[async_trait]
impl MethodHandler for ForkSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let from_index = optional_i64_param(params.as_ref(), "fromMessageIndex");
        if from_index.is_some_and(|i| i < 0) {
            return Err(RpcError::invalid_params(
                "Parameter 'fromMessageIndex' must be non-negative",
            ));
        }

        let manager = ctx.require_session_manager()?;
        let result = manager.fork(&session_id, from_index.map(|i| i as usize))?;
        Ok(serde_json::to_value(result).unwrap_or(Value::Null))
    }
}

/// Rewind a session to a message index.
pub struct RewindSessionHandler;

#[async_trait]
impl MethodHandler for RewindSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let to_index = require_param(params.as_ref(), "toMessageIndex")?
            .as_i64()
            .ok_or_else(|| {
                RpcError::invalid_params("Parameter 'toMessageIndex' must be an integer")
            })?;
        if to_index < 0 {
            return Err(RpcError::invalid_params(
                "Parameter 'toMessageIndex' must be non-negative",
            ));
        }

        let manager = ctx.require_session_manager()?;
        let result = manager.rewind(&session_id, to_index as usize)?;
        Ok(serde_json::to_value(result).unwrap_or(Value::Null))
    }
}

/// Resume an ended session.
pub struct ResumeSessionHandler;

#[async_trait]
impl MethodHandler for ResumeSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let manager = ctx.require_session_manager()?;
        let view = manager.resume(&session_id)?;
        Ok(json!({
            "session": view.session,
            "messages": view.messages,
        }))
    }
}

/// End a session.
pub struct EndSessionHandler;

#[async_trait]
impl MethodHandler for EndSessionHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let reason =
            optional_string_param(params.as_ref(), "reason").unwrap_or_else(|| "completed".into());
        let manager = ctx.require_session_manager()?;
        manager.end(&session_id, &reason)?;
        Ok(json!({"ended": true}))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{make_session, make_test_context};

    #[tokio::test]
    async fn create_returns_session_row() {
        let ctx = make_test_context();
        let result = CreateSessionHandler
            .handle(
                Some(json!({"model": "model-a", "workingDirectory": "/tmp/project"})),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result["id"].as_str().unwrap().starts_with("sess_"));
        assert_eq!(result["provider"], "anthropic");
    }

    #[tokio::test]
    async fn get_unknown_session_maps_code() {
        let ctx = make_test_context();
        let err = GetSessionHandler
            .handle(Some(json!({"sessionId": "sess_missing"})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn get_returns_messages() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);
        let _ = ctx
            .session_manager
            .as_ref()
            .unwrap()
            .add_user_message(&session_id, "hello")
            .unwrap();

        let result = GetSessionHandler
            .handle(Some(json!({"sessionId": session_id})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_sessions() {
        let ctx = make_test_context();
        let _ = make_session(&ctx);
        let _ = make_session(&ctx);

        let result = ListSessionsHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(result["sessions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fork_rejects_negative_index() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);
        let err = ForkSessionHandler
            .handle(
                Some(json!({"sessionId": session_id, "fromMessageIndex": -1})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn fork_returns_child_info() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);
        let _ = ctx
            .session_manager
            .as_ref()
            .unwrap()
            .add_user_message(&session_id, "first")
            .unwrap();

        let result = ForkSessionHandler
            .handle(Some(json!({"sessionId": session_id})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["forkedFrom"], session_id);
        assert_eq!(result["messageCount"], 1);
    }

    #[tokio::test]
    async fn rewind_requires_integer_index() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);
        let err = RewindSessionHandler
            .handle(
                Some(json!({"sessionId": session_id, "toMessageIndex": "zero"})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn end_then_resume() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);

        let ended = EndSessionHandler
            .handle(Some(json!({"sessionId": session_id})), &ctx)
            .await
            .unwrap();
        assert_eq!(ended["ended"], true);

        let resumed = ResumeSessionHandler
            .handle(Some(json!({"sessionId": session_id})), &ctx)
            .await
            .unwrap();
        assert!(resumed["session"]["endedAt"].is_null());
    }

    #[tokio::test]
    async fn delete_session() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);
        let result = DeleteSessionHandler
            .handle(Some(json!({"sessionId": session_id})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["deleted"], true);
    }
}
