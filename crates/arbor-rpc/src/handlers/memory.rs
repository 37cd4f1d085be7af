//! Memory handlers: search, handoffs, ledger.

use async_trait::async_trait;
use serde_json::{Value, json};

use arbor_memory::{LedgerPatch, RecallFilters};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{optional_i64_param, optional_string_param, require_string_param};
use crate::registry::MethodHandler;

/// Full-text search over session events.
pub struct SearchMemoryHandler;

#[async_trait]
impl MethodHandler for SearchMemoryHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let query = require_string_param(params.as_ref(), "query")?;
        let recall = ctx.require_recall()?;

        let filters = RecallFilters {
            workspace_id: optional_string_param(params.as_ref(), "workspaceId"),
            session_id: optional_string_param(params.as_ref(), "sessionId"),
            types: None,
            limit: optional_i64_param(params.as_ref(), "limit").or(Some(20)),
        };
        let results = recall.search(&query, &filters)?;
        Ok(json!({"results": results}))
    }
}

/// Recent handoffs, optionally scoped to a working directory.
pub struct GetHandoffsHandler;

#[async_trait]
impl MethodHandler for GetHandoffsHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let handoffs = ctx.require_handoffs()?;
        let working_directory = optional_string_param(params.as_ref(), "workingDirectory");
        let limit = optional_i64_param(params.as_ref(), "limit").unwrap_or(10);
        let records = handoffs.list_recent(working_directory.as_deref(), limit)?;
        Ok(json!({"handoffs": records}))
    }
}

/// Read the workspace ledger.
pub struct GetLedgerHandler;

#[async_trait]
impl MethodHandler for GetLedgerHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let workspace_id = require_string_param(params.as_ref(), "workspaceId")?;
        let ledger = ctx.require_ledger()?;
        let document = ledger.load(&workspace_id)?;
        Ok(serde_json::to_value(document).unwrap_or(Value::Null))
    }
}

/// Partially update the workspace ledger.
pub struct UpdateLedgerHandler;

#[async_trait]
impl MethodHandler for UpdateLedgerHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let workspace_id = require_string_param(params.as_ref(), "workspaceId")?;
        let ledger = ctx.require_ledger()?;

        let patch: LedgerPatch = params
            .as_ref()
            .and_then(|p| p.get("patch"))
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RpcError::invalid_params(format!("invalid ledger patch: {e}")))?
            .unwrap_or_default();

        let document = ledger.update(&workspace_id, &patch)?;
        Ok(serde_json::to_value(document).unwrap_or(Value::Null))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{make_session, make_test_context};
    use arbor_memory::NewHandoff;

    #[tokio::test]
    async fn search_finds_messages() {
        let ctx = make_test_context();
        let session_id = make_session(&ctx);
        let _ = ctx
            .session_manager
            .as_ref()
            .unwrap()
            .add_user_message(&session_id, "investigate the flaky scheduler test")
            .unwrap();

        let result = SearchMemoryHandler
            .handle(Some(json!({"query": "scheduler"})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_handoffs_filters_by_directory() {
        let ctx = make_test_context();
        let handoffs = ctx.handoffs.as_ref().unwrap();
        let _ = handoffs
            .create(&NewHandoff {
                session_id: "sess_1".into(),
                summary: "here".into(),
                working_directory: Some("/tmp/project".into()),
                ..Default::default()
            })
            .unwrap();
        let _ = handoffs
            .create(&NewHandoff {
                session_id: "sess_2".into(),
                summary: "elsewhere".into(),
                working_directory: Some("/tmp/other".into()),
                ..Default::default()
            })
            .unwrap();

        let result = GetHandoffsHandler
            .handle(Some(json!({"workingDirectory": "/tmp/project"})), &ctx)
            .await
            .unwrap();
        let list = result["handoffs"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["summary"], "here");
    }

    #[tokio::test]
    async fn ledger_roundtrip_via_rpc() {
        let ctx = make_test_context();
        let updated = UpdateLedgerHandler
            .handle(
                Some(json!({
                    "workspaceId": "ws_1",
                    "patch": {"goal": "ship the dispatcher", "next": ["write docs"]}
                })),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(updated["goal"], "ship the dispatcher");

        let loaded = GetLedgerHandler
            .handle(Some(json!({"workspaceId": "ws_1"})), &ctx)
            .await
            .unwrap();
        assert_eq!(loaded["next"][0], "write docs");
    }

    #[tokio::test]
    async fn invalid_patch_is_rejected() {
        let ctx = make_test_context();
        let err = UpdateLedgerHandler
            .handle(
                Some(json!({"workspaceId": "ws_1", "patch": {"next": "not a list"}})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }
}
