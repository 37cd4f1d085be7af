//! Plan mode handlers: enter, exit, getState.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{optional_string_param, require_string_param};
use crate::registry::MethodHandler;

/// Enter plan mode.
pub struct EnterPlanHandler;

#[async_trait]
impl MethodHandler for EnterPlanHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let skill_name = require_string_param(params.as_ref(), "skillName")?;
        let blocked_tools: Vec<String> = params
            .as_ref()
            .and_then(|p| p.get("blockedTools"))
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RpcError::invalid_params(format!("invalid blockedTools: {e}")))?
            .unwrap_or_default();

        let plan = ctx.require_plan_manager()?;
        let state = plan.enter(&session_id, &skill_name, blocked_tools)?;
        Ok(serde_json::to_value(state).unwrap_or(Value::Null))
    }
}

/// Exit plan mode.
pub struct ExitPlanHandler;

#[async_trait]
impl MethodHandler for ExitPlanHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let reason = require_string_param(params.as_ref(), "reason")?;
        let plan_path = optional_string_param(params.as_ref(), "planPath");

        let plan = ctx.require_plan_manager()?;
        plan.exit(&session_id, &reason, plan_path.as_deref())?;
        Ok(json!({"exited": true}))
    }
}

/// Current plan mode state.
pub struct GetPlanStateHandler;

#[async_trait]
impl MethodHandler for GetPlanStateHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let plan = ctx.require_plan_manager()?;
        match plan.get_state(&session_id) {
            Some(state) => Ok(json!({
                "inPlanMode": true,
                "state": state,
            })),
            None => Ok(json!({"inPlanMode": false})),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
