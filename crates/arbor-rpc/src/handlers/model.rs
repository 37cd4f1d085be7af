//! Model handlers: list, switch.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::require_string_param;
use crate::registry::MethodHandler;

/// List models this server offers.
pub struct ListModelsHandler;

#[async_trait]
impl MethodHandler for ListModelsHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({"models": ctx.models}))
    }
}

/// Switch a session's model.
pub struct SwitchModelHandler;

#[async_trait]
impl MethodHandler for SwitchModelHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let model = require_string_param(params.as_ref(), "model")?;

        if !ctx.models.is_empty() && !ctx.models.contains(&model) {
            return Err(RpcError::invalid_params(format!("unknown model: {model}")));
        }

        let manager = ctx.require_session_manager()?;
        manager.switch_model(&session_id, &model)?;
        Ok(json!({"sessionId": session_id, "model": model}))
    }
}
